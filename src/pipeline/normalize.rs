//! Reply normalisation: model reply text → [`DiplomaRecord`].
//!
//! Models often wrap JSON in a Markdown fence even when told not to. Only
//! the common shapes are handled: a ```` ```json ```` or bare ```` ``` ````
//! opener at the very start and a ```` ``` ```` closer at the very end.
//! Anything fancier (prose before the fence, several fences) is left alone
//! and fails JSON parsing.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Extracted diploma fields as returned by the model.
///
/// The parsed JSON is kept verbatim: missing keys are not filled with the
/// sentinel and extra keys are not dropped. The accessors are conveniences
/// for callers who want the four canonical fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiplomaRecord(Value);

impl DiplomaRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn student_name(&self) -> Option<&str> {
        self.field("studentName")
    }

    pub fn institution(&self) -> Option<&str> {
        self.field("institution")
    }

    pub fn degree(&self) -> Option<&str> {
        self.field("degree")
    }

    pub fn teacher_name(&self) -> Option<&str> {
        self.field("teacherName")
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` and a trailing ```` ``` ````.
pub fn strip_fences(reply: &str) -> &str {
    let mut s = reply.trim();
    if let Some(rest) = s.strip_prefix(JSON_FENCE) {
        s = rest;
    } else if let Some(rest) = s.strip_prefix(FENCE) {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix(FENCE) {
        s = rest;
    }
    s.trim()
}

/// Strip fences from a model reply and parse it as JSON.
pub fn normalize(reply: &str) -> Result<DiplomaRecord, ExtractError> {
    let cleaned = strip_fences(reply);
    let value: Value = serde_json::from_str(cleaned).map_err(ExtractError::MalformedReply)?;
    Ok(DiplomaRecord(value))
}
