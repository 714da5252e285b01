use serde::{Deserialize, Serialize};

/// A model the backend allows chat requests to target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub model_arn: String,
    pub model_name: String,
}

/// A knowledge base visible to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseDescriptor {
    pub id: String,
    pub name: String,
}

/// Envelope returned by `GET /knowledge-bases`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseList {
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBaseDescriptor>,
}
