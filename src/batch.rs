use serde::Serialize;

/// Per-element failure inside a batch mutation.
///
/// Batch endpoints apply each element under its own savepoint: a failed
/// element is rolled back and recorded here while the surrounding
/// transaction (and every other element) commits. Callers must inspect the
/// failure list, not just the HTTP status, to know the true outcome.
#[derive(Debug, Serialize)]
pub struct BatchFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub reason: String,
}

impl BatchFailure {
    pub fn by_id(id: i32, reason: impl ToString) -> Self {
        Self {
            id: Some(id),
            file_path: None,
            action: None,
            reason: reason.to_string(),
        }
    }

    pub fn by_path(file_path: &str, reason: impl ToString) -> Self {
        Self {
            id: None,
            file_path: Some(file_path.to_string()),
            action: None,
            reason: reason.to_string(),
        }
    }

    pub fn by_action(id: i32, action: &str, reason: impl ToString) -> Self {
        Self {
            id: Some(id),
            file_path: None,
            action: Some(action.to_string()),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_serialize_only_their_identifier() {
        let by_id = serde_json::to_value(BatchFailure::by_id(7, "boom")).unwrap();
        assert_eq!(by_id, serde_json::json!({ "id": 7, "reason": "boom" }));

        let by_path = serde_json::to_value(BatchFailure::by_path("a/b.jpg", "dup")).unwrap();
        assert_eq!(
            by_path,
            serde_json::json!({ "file_path": "a/b.jpg", "reason": "dup" })
        );

        let by_action = serde_json::to_value(BatchFailure::by_action(3, "in", "missing")).unwrap();
        assert_eq!(
            by_action,
            serde_json::json!({ "id": 3, "action": "in", "reason": "missing" })
        );
    }
}
