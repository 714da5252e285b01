use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

const SOURCE_URI_KEY: &str = "x-amz-bedrock-kb-source-uri";

/// Result of a completed retrieve-and-generate job.
///
/// The payload is kept exactly as the backend stored it. Numbers come back
/// as floats (`"HTTPStatusCode": 200.0`) once they have been through
/// DynamoDB, so the accessors below read the JSON leniently instead of
/// binding it to integer fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ChatResponse {
    raw: Map<String, Value>,
}

impl TryFrom<Value> for ChatResponse {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(raw) => Ok(Self { raw }),
            other => Err(CoreError::InvalidField {
                field: "result".to_string(),
                reason: format!("expected a JSON object, got {}", kind(&other)),
            }),
        }
    }
}

impl From<ChatResponse> for Value {
    fn from(response: ChatResponse) -> Self {
        Value::Object(response.raw)
    }
}

impl ChatResponse {
    /// The payload as received.
    pub fn as_value(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn into_value(self) -> Value {
        self.into()
    }

    /// The generated answer, or an empty string if the job produced none.
    pub fn text(&self) -> &str {
        self.raw
            .get("output")
            .and_then(|o| o.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.raw.get("sessionId").and_then(Value::as_str)
    }

    /// `ResponseMetadata.HTTPStatusCode`, accepting integer or float encodings.
    pub fn http_status_code(&self) -> Option<u16> {
        let code = self
            .raw
            .get("ResponseMetadata")
            .and_then(|m| m.get("HTTPStatusCode"))?;
        code.as_u64()
            .or_else(|| code.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|c| u16::try_from(c).ok())
    }

    pub fn citations(&self) -> impl Iterator<Item = Citation<'_>> {
        array(self.raw.get("citations")).map(Citation)
    }

    /// Source URIs of every retrieved reference, deduplicated in first-seen order.
    pub fn source_uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = Vec::new();
        for reference in self.citations().flat_map(|c| c.retrieved_references()) {
            let Some(uri) = reference.uri() else {
                continue;
            };
            if !uris.contains(&uri) {
                uris.push(uri);
            }
        }
        uris
    }
}

/// Borrowed view of one entry in `citations`.
#[derive(Debug, Clone, Copy)]
pub struct Citation<'a>(&'a Value);

impl<'a> Citation<'a> {
    /// `generatedResponsePart.textResponsePart.text`
    pub fn text(&self) -> Option<&'a str> {
        self.0
            .get("generatedResponsePart")
            .and_then(|p| p.get("textResponsePart"))
            .and_then(|p| p.get("text"))
            .and_then(Value::as_str)
    }

    pub fn retrieved_references(&self) -> impl Iterator<Item = RetrievedReference<'a>> + use<'a> {
        array(self.0.get("retrievedReferences")).map(RetrievedReference)
    }
}

/// Borrowed view of one entry in `retrievedReferences`.
#[derive(Debug, Clone, Copy)]
pub struct RetrievedReference<'a>(&'a Value);

impl<'a> RetrievedReference<'a> {
    pub fn content_text(&self) -> Option<&'a str> {
        self.0
            .get("content")
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
    }

    /// S3 location if present, else the source URI recorded in the metadata.
    pub fn uri(&self) -> Option<&'a str> {
        self.0
            .get("location")
            .and_then(|l| l.get("s3Location"))
            .and_then(|s3| s3.get("uri"))
            .and_then(Value::as_str)
            .or_else(|| {
                self.0
                    .get("metadata")
                    .and_then(|m| m.get(SOURCE_URI_KEY))
                    .and_then(Value::as_str)
            })
    }
}

fn array(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .into_iter()
        .flatten()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
