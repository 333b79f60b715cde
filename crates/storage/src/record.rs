use chrono::{DateTime, Utc};
use pathway_core::model::{ChallengeStatus, ProgressRecord};
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

/// Persisted status; `null` in JSON means unattempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredStatus {
    Correct,
    Incorrect,
}

/// Persisted JSON shape of a `ProgressRecord`.
///
/// This mirrors the domain record so the store and the remote wire format can
/// serialize it without leaking storage concerns into the domain layer.
/// `completedCount` is written for readers of the raw entry but ignored on
/// load; the domain derives it from the statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProgress {
    pub user_answers: Vec<Option<String>>,
    pub answer_status: Vec<Option<StoredStatus>>,
    #[serde(default)]
    pub completed_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl StoredProgress {
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        Self {
            user_answers: record.answers().iter().cloned().map(Some).collect(),
            answer_status: record
                .statuses()
                .iter()
                .map(|status| match status {
                    ChallengeStatus::Unattempted => None,
                    ChallengeStatus::Correct => Some(StoredStatus::Correct),
                    ChallengeStatus::Incorrect => Some(StoredStatus::Incorrect),
                })
                .collect(),
            completed_count: record.completed_count(),
            last_updated: record.last_updated(),
        }
    }

    /// Convert back into a domain record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if answers and statuses are misaligned.
    pub fn into_record(self) -> Result<ProgressRecord, StorageError> {
        let statuses: Vec<ChallengeStatus> = self
            .answer_status
            .into_iter()
            .map(|status| match status {
                None => ChallengeStatus::Unattempted,
                Some(StoredStatus::Correct) => ChallengeStatus::Correct,
                Some(StoredStatus::Incorrect) => ChallengeStatus::Incorrect,
            })
            .collect();
        let answers = self
            .user_answers
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        let record = ProgressRecord::from_persisted(answers, statuses, self.last_updated)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        if record.completed_count() != self.completed_count {
            tracing::debug!(
                stored = self.completed_count,
                derived = record.completed_count(),
                "ignoring stale completedCount"
            );
        }
        Ok(record)
    }
}

/// Serialize a record to its JSON document.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_progress(record: &ProgressRecord) -> Result<String, StorageError> {
    serde_json::to_string(&StoredProgress::from_record(record))
        .map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Parse a JSON document into a record.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for invalid JSON or an unexpected shape.
pub fn decode_progress(raw: &str) -> Result<ProgressRecord, StorageError> {
    serde_json::from_str::<StoredProgress>(raw)
        .map_err(|err| StorageError::Serialization(err.to_string()))?
        .into_record()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_core::time::fixed_now;

    #[test]
    fn encodes_expected_json_shape() {
        let mut record = ProgressRecord::new(3, fixed_now());
        record.submit(0, "a", "a", fixed_now()).unwrap();
        record.submit(1, "x", "b", fixed_now()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&encode_progress(&record).unwrap()).unwrap();
        assert_eq!(value["userAnswers"], serde_json::json!(["a", "x", ""]));
        assert_eq!(
            value["answerStatus"],
            serde_json::json!(["correct", "incorrect", null])
        );
        assert_eq!(value["completedCount"], 1);
        assert_eq!(value["lastUpdated"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn decodes_null_answers_and_ignores_stale_count() {
        let raw = r#"{
            "userAnswers": [null, "b"],
            "answerStatus": [null, "correct"],
            "completedCount": 2,
            "lastUpdated": "2023-11-14T22:13:20Z"
        }"#;
        let record = decode_progress(raw).unwrap();
        assert_eq!(record.answer(0), None);
        assert_eq!(record.completed_count(), 1);
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(decode_progress("{\"userAnswers\": 3}").is_err());
        assert!(decode_progress("not json").is_err());
        let misaligned = r#"{
            "userAnswers": ["a"],
            "answerStatus": [],
            "lastUpdated": "2023-11-14T22:13:20Z"
        }"#;
        assert!(decode_progress(misaligned).is_err());
    }
}
