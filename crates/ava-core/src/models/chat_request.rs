use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Generation parameters forwarded to the retrieve-and-generate call.
///
/// The backend expects every numeric value as a string, so the fields
/// keep their wire representation. Use [`TextInferenceConfig::new`] to
/// build one from typed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInferenceConfig {
    pub max_tokens: String,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    pub temperature: String,
    pub top_p: String,
}

impl TextInferenceConfig {
    pub fn new(max_tokens: u32, temperature: f32, top_p: f32) -> Self {
        Self {
            max_tokens: max_tokens.to_string(),
            stop_sequences: Vec::new(),
            temperature: temperature.to_string(),
            top_p: top_p.to_string(),
        }
    }

    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    /// Check that every value parses and sits inside the range the model accepts.
    pub fn validate(&self) -> Result<(), CoreError> {
        let max_tokens: u32 = self
            .max_tokens
            .trim()
            .parse()
            .map_err(|_| invalid("maxTokens", format!("not an integer: {:?}", self.max_tokens)))?;
        if max_tokens == 0 {
            return Err(invalid("maxTokens", "must be greater than zero".to_string()));
        }
        unit_interval("temperature", &self.temperature)?;
        unit_interval("topP", &self.top_p)?;
        Ok(())
    }
}

impl Default for TextInferenceConfig {
    fn default() -> Self {
        Self::new(4096, 0.0, 0.9)
    }
}

fn unit_interval(field: &str, raw: &str) -> Result<f32, CoreError> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(field, format!("not a number: {raw:?}")))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, format!("{value} is outside [0, 1]")));
    }
    Ok(value)
}

fn invalid(field: &str, reason: String) -> CoreError {
    CoreError::InvalidField {
        field: field.to_string(),
        reason,
    }
}

/// Body of `POST /chatbot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub knowledge_base_id: String,
    pub model_arn: String,
    pub text_inference_config: TextInferenceConfig,
    /// Custom prompt template. When absent the backend applies its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_prompt_template: Option<String>,
}

impl ChatRequest {
    pub fn new(
        message: impl Into<String>,
        knowledge_base_id: impl Into<String>,
        model_arn: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            knowledge_base_id: knowledge_base_id.into(),
            model_arn: model_arn.into(),
            text_inference_config: TextInferenceConfig::default(),
            text_prompt_template: None,
        }
    }

    pub fn with_inference_config(mut self, config: TextInferenceConfig) -> Self {
        self.text_inference_config = config;
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.text_prompt_template = Some(template.into());
        self
    }

    /// Reject requests the backend would refuse, before they leave the process.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.message.trim().is_empty() {
            return Err(CoreError::MissingField("message".to_string()));
        }
        if self.knowledge_base_id.trim().is_empty() {
            return Err(CoreError::MissingField("knowledgeBaseId".to_string()));
        }
        if self.model_arn.trim().is_empty() {
            return Err(CoreError::MissingField("modelArn".to_string()));
        }
        self.text_inference_config.validate()
    }
}
