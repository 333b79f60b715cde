use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::catalog::Level;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("challenge index {index} out of range for level with {len} challenges")]
    ChallengeOutOfRange { index: usize, len: usize },

    #[error("challenge is already solved")]
    AlreadyCorrect,

    #[error("challenge must be reset before another attempt")]
    ResetRequired,

    #[error("solved challenges cannot be reset")]
    CorrectIsTerminal,

    #[error("answers and statuses have different lengths ({answers} vs {statuses})")]
    MisalignedRecord { answers: usize, statuses: usize },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Per-challenge completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChallengeStatus {
    #[default]
    Unattempted,
    Correct,
    Incorrect,
}

impl ChallengeStatus {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, ChallengeStatus::Correct)
    }
}

/// Which statuses a reset may move back to `Unattempted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Only `Incorrect` challenges can be reset; `Correct` is terminal.
    #[default]
    IncorrectOnly,
    /// Retake mode: solved challenges can be reset as well.
    AllowCorrect,
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Completion state for one (track, level) pair.
///
/// `answers` and `statuses` are index-aligned with the level's challenges.
/// An empty answer string means "no answer recorded". The completed count
/// is always derived from `statuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    answers: Vec<String>,
    statuses: Vec<ChallengeStatus>,
    last_updated: DateTime<Utc>,
}

impl ProgressRecord {
    /// A fresh, all-unattempted record for a level with `challenge_count` challenges.
    #[must_use]
    pub fn new(challenge_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            answers: vec![String::new(); challenge_count],
            statuses: vec![ChallengeStatus::Unattempted; challenge_count],
            last_updated: now,
        }
    }

    #[must_use]
    pub fn for_level(level: &Level, now: DateTime<Utc>) -> Self {
        Self::new(level.total_challenges(), now)
    }

    /// Rebuild a record from persisted parts.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::MisalignedRecord` if the two sequences differ in length.
    pub fn from_persisted(
        answers: Vec<String>,
        statuses: Vec<ChallengeStatus>,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if answers.len() != statuses.len() {
            return Err(ProgressError::MisalignedRecord {
                answers: answers.len(),
                statuses: statuses.len(),
            });
        }
        Ok(Self {
            answers,
            statuses,
            last_updated,
        })
    }

    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub fn statuses(&self) -> &[ChallengeStatus] {
        &self.statuses
    }

    #[must_use]
    pub fn status(&self, index: usize) -> ChallengeStatus {
        self.statuses.get(index).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers
            .get(index)
            .map(String::as_str)
            .filter(|answer| !answer.is_empty())
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_correct()).count()
    }

    /// Completed challenges among the first `total` entries.
    ///
    /// Used when the catalog level is shorter than the stored record.
    #[must_use]
    pub fn completed_within(&self, total: usize) -> usize {
        self.statuses
            .iter()
            .take(total)
            .filter(|s| s.is_correct())
            .count()
    }

    /// Pad or truncate to `challenge_count` entries.
    #[must_use]
    pub fn aligned_to(mut self, challenge_count: usize) -> Self {
        self.answers.resize(challenge_count, String::new());
        self.statuses.resize(challenge_count, ChallengeStatus::Unattempted);
        self
    }

    /// Grade an answer for the challenge at `index`.
    ///
    /// Only an `Unattempted` challenge accepts a submission.
    ///
    /// # Errors
    ///
    /// - `EmptyAnswer` if the answer is blank after trimming.
    /// - `ChallengeOutOfRange` if `index` is past the end of the record.
    /// - `AlreadyCorrect` / `ResetRequired` if the challenge was already graded.
    pub fn submit(
        &mut self,
        index: usize,
        answer: &str,
        expected: &str,
        now: DateTime<Utc>,
    ) -> Result<ChallengeStatus, ProgressError> {
        if answer.trim().is_empty() {
            return Err(ProgressError::EmptyAnswer);
        }
        let current = self.checked_status(index)?;
        match current {
            ChallengeStatus::Correct => return Err(ProgressError::AlreadyCorrect),
            ChallengeStatus::Incorrect => return Err(ProgressError::ResetRequired),
            ChallengeStatus::Unattempted => {}
        }

        let status = if answer.trim() == expected.trim() {
            ChallengeStatus::Correct
        } else {
            ChallengeStatus::Incorrect
        };
        self.answers[index] = answer.to_owned();
        self.statuses[index] = status;
        self.last_updated = now;
        Ok(status)
    }

    /// Move the challenge at `index` back to `Unattempted` and clear its answer.
    ///
    /// Resetting an unattempted challenge changes nothing, including the timestamp.
    ///
    /// # Errors
    ///
    /// - `ChallengeOutOfRange` if `index` is past the end of the record.
    /// - `CorrectIsTerminal` for a solved challenge under `ResetPolicy::IncorrectOnly`.
    pub fn reset(
        &mut self,
        index: usize,
        policy: ResetPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        match self.checked_status(index)? {
            ChallengeStatus::Unattempted => return Ok(()),
            ChallengeStatus::Correct if policy == ResetPolicy::IncorrectOnly => {
                return Err(ProgressError::CorrectIsTerminal);
            }
            ChallengeStatus::Correct | ChallengeStatus::Incorrect => {}
        }
        self.answers[index].clear();
        self.statuses[index] = ChallengeStatus::Unattempted;
        self.last_updated = now;
        Ok(())
    }

    fn checked_status(&self, index: usize) -> Result<ChallengeStatus, ProgressError> {
        self.statuses
            .get(index)
            .copied()
            .ok_or(ProgressError::ChallengeOutOfRange {
                index,
                len: self.statuses.len(),
            })
    }
}
