use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for slugs and identifiers that are empty after trimming.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} cannot be empty")]
pub struct SlugError {
    kind: &'static str,
}

fn validated(kind: &'static str, raw: String) -> Result<String, SlugError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SlugError { kind });
    }
    if trimmed.len() == raw.len() {
        Ok(raw)
    } else {
        Ok(trimmed.to_owned())
    }
}

macro_rules! slug_type {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// # Errors
            ///
            /// Returns `SlugError` if the value is empty after trimming.
            pub fn new(value: impl Into<String>) -> Result<Self, SlugError> {
                validated($kind, value.into()).map(Self)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = SlugError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = SlugError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

slug_type!(
    /// Identifier of a Track, e.g. `java-dsa`.
    TrackSlug,
    "track slug"
);
slug_type!(
    /// Identifier of a Level, unique within its Track, e.g. `beginner`.
    LevelSlug,
    "level slug"
);
slug_type!(
    /// Identifier of a Challenge, unique within its Level.
    ChallengeId,
    "challenge id"
);

/// The (track, level) pair a `ProgressRecord` is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressKey {
    pub track: TrackSlug,
    pub level: LevelSlug,
}

impl ProgressKey {
    #[must_use]
    pub fn new(track: TrackSlug, level: LevelSlug) -> Self {
        Self { track, level }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.track, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_trimmed() {
        let slug = TrackSlug::new("  java-dsa ").unwrap();
        assert_eq!(slug.as_str(), "java-dsa");
    }

    #[test]
    fn empty_slug_is_rejected() {
        let err = LevelSlug::new("   ").unwrap_err();
        assert_eq!(err.to_string(), "level slug cannot be empty");
    }

    #[test]
    fn slug_deserialize_rejects_blank() {
        let result: Result<ChallengeId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn progress_key_display() {
        let key = ProgressKey::new(
            TrackSlug::new("css").unwrap(),
            LevelSlug::new("beginner").unwrap(),
        );
        assert_eq!(key.to_string(), "css/beginner");
    }
}
