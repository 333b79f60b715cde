use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChallengeId, LevelSlug, TrackSlug};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate track: {0}")]
    DuplicateTrack(TrackSlug),

    #[error("duplicate level {level} in track {track}")]
    DuplicateLevel { track: TrackSlug, level: LevelSlug },

    #[error("duplicate challenge {challenge} in {track}/{level}")]
    DuplicateChallenge {
        track: TrackSlug,
        level: LevelSlug,
        challenge: ChallengeId,
    },

    #[error("invalid catalog document: {0}")]
    Parse(String),
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// A single exercise with a known expected solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    id: ChallengeId,
    prompt: String,
    solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl Challenge {
    #[must_use]
    pub fn new(
        id: ChallengeId,
        prompt: impl Into<String>,
        solution: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            solution: solution.into(),
            hint,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ChallengeId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn solution(&self) -> &str {
        &self.solution
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Compares trimmed answer and trimmed solution byte for byte.
    #[must_use]
    pub fn accepts(&self, answer: &str) -> bool {
        answer.trim() == self.solution.trim()
    }
}

/// Learning material attached to a level. Not used for progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    slug: LevelSlug,
    #[serde(default)]
    title: String,
    #[serde(default)]
    challenges: Vec<Challenge>,
    #[serde(default)]
    resources: Vec<Resource>,
}

impl Level {
    #[must_use]
    pub fn new(
        slug: LevelSlug,
        title: impl Into<String>,
        challenges: Vec<Challenge>,
        resources: Vec<Resource>,
    ) -> Self {
        Self {
            slug,
            title: title.into(),
            challenges,
            resources,
        }
    }

    #[must_use]
    pub fn slug(&self) -> &LevelSlug {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    #[must_use]
    pub fn challenge(&self, index: usize) -> Option<&Challenge> {
        self.challenges.get(index)
    }

    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    #[must_use]
    pub fn total_challenges(&self) -> usize {
        self.challenges.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    slug: TrackSlug,
    #[serde(default)]
    title: String,
    #[serde(default)]
    levels: Vec<Level>,
}

impl Track {
    #[must_use]
    pub fn new(slug: TrackSlug, title: impl Into<String>, levels: Vec<Level>) -> Self {
        Self {
            slug,
            title: title.into(),
            levels,
        }
    }

    #[must_use]
    pub fn slug(&self) -> &TrackSlug {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[must_use]
    pub fn level(&self, slug: &LevelSlug) -> Option<&Level> {
        self.levels.iter().find(|level| level.slug() == slug)
    }

    #[must_use]
    pub fn total_challenges(&self) -> usize {
        self.levels.iter().map(Level::total_challenges).sum()
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Immutable, externally supplied definition of every track, level and challenge.
///
/// Construction validates uniqueness of track slugs, level slugs within a
/// track and challenge ids within a level. Order is preserved as given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    /// # Errors
    ///
    /// Returns `CatalogError` if any slug or challenge id is duplicated in its scope.
    pub fn new(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        let mut seen_tracks = HashSet::new();
        for track in &tracks {
            if !seen_tracks.insert(track.slug()) {
                return Err(CatalogError::DuplicateTrack(track.slug().clone()));
            }
            let mut seen_levels = HashSet::new();
            for level in track.levels() {
                if !seen_levels.insert(level.slug()) {
                    return Err(CatalogError::DuplicateLevel {
                        track: track.slug().clone(),
                        level: level.slug().clone(),
                    });
                }
                let mut seen_challenges = HashSet::new();
                for challenge in level.challenges() {
                    if !seen_challenges.insert(challenge.id()) {
                        return Err(CatalogError::DuplicateChallenge {
                            track: track.slug().clone(),
                            level: level.slug().clone(),
                            challenge: challenge.id().clone(),
                        });
                    }
                }
            }
        }
        Ok(Self { tracks })
    }

    /// Parse a catalog from a JSON array of tracks.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON and the validation
    /// errors of [`Catalog::new`] otherwise.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let tracks: Vec<Track> =
            serde_json::from_str(json).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::new(tracks)
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn track(&self, slug: &TrackSlug) -> Option<&Track> {
        self.tracks.iter().find(|track| track.slug() == slug)
    }

    #[must_use]
    pub fn level(&self, track: &TrackSlug, level: &LevelSlug) -> Option<&Level> {
        self.track(track).and_then(|t| t.level(level))
    }

    /// Every (track, level) pair in catalog order.
    pub fn level_keys(&self) -> impl Iterator<Item = (&TrackSlug, &Level)> {
        self.tracks
            .iter()
            .flat_map(|track| track.levels().iter().map(move |level| (track.slug(), level)))
    }

    #[must_use]
    pub fn total_challenges(&self) -> usize {
        self.tracks.iter().map(Track::total_challenges).sum()
    }
}
