//! Reconciliation policy between a local record and one pulled from the remote.
//!
//! Last write wins by `last_updated`. On a tie the remote record is taken,
//! since the remote is the service of record whenever it is reachable.

use crate::model::ProgressRecord;

/// What to do after comparing a local and a remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Neither side has a record.
    Nothing,
    /// Overwrite the local record with the remote one.
    TakeRemote,
    /// Keep local; it is strictly newer (or the remote has nothing) and
    /// should be pushed back.
    KeepLocal,
    /// Both sides are identical.
    InSync,
}

#[must_use]
pub fn resolve(local: Option<&ProgressRecord>, remote: Option<&ProgressRecord>) -> Resolution {
    match (local, remote) {
        (None, None) => Resolution::Nothing,
        (None, Some(_)) => Resolution::TakeRemote,
        (Some(_), None) => Resolution::KeepLocal,
        (Some(local), Some(remote)) if local == remote => Resolution::InSync,
        (Some(local), Some(remote)) => {
            if local.last_updated() > remote.last_updated() {
                Resolution::KeepLocal
            } else {
                Resolution::TakeRemote
            }
        }
    }
}
