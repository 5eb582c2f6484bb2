use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Answer values keyed by property key.
pub type Answers = Map<String, Value>;

/// One failed field, reported in property order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub field_id: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Metadata recorded with every stored submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeta {
    pub anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
}

/// Sanitized answers ready to leave the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// `submission-<ts>-<seq>`, unique within the process.
    pub id: String,
    pub form_id: String,
    pub answers: Answers,
    pub meta: SubmissionMeta,
}
