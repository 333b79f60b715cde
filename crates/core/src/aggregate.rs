//! Completion percentages derived from a catalog and a progress snapshot.
//!
//! Everything here is pure: the same catalog and snapshot always produce the
//! same numbers. Track and overall values are weighted by challenge count,
//! so they are computed from summed tallies rather than from child
//! percentages.

use std::collections::HashMap;

use crate::model::{Catalog, Level, LevelSlug, ProgressKey, ProgressRecord, TrackSlug};

/// `round(100 * completed / total)`, rounding halves up; `0` when `total == 0`.
#[must_use]
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Read access to stored records, keyed by (track, level).
pub trait ProgressLookup {
    fn record(&self, track: &TrackSlug, level: &LevelSlug) -> Option<&ProgressRecord>;
}

/// Owned, point-in-time copy of every record the engine knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    records: HashMap<ProgressKey, ProgressRecord>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ProgressKey, record: ProgressRecord) {
        self.records.insert(key, record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(ProgressKey, ProgressRecord)> for ProgressSnapshot {
    fn from_iter<I: IntoIterator<Item = (ProgressKey, ProgressRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl ProgressLookup for ProgressSnapshot {
    fn record(&self, track: &TrackSlug, level: &LevelSlug) -> Option<&ProgressRecord> {
        self.records.get(&ProgressKey::new(track.clone(), level.clone()))
    }
}

/// Completed and total challenge counts for some scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub completed: usize,
    pub total: usize,
}

impl Tally {
    #[must_use]
    pub fn percentage(self) -> u8 {
        percentage(self.completed, self.total)
    }
}

impl std::ops::Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Tally) -> Tally {
        Tally {
            completed: self.completed + rhs.completed,
            total: self.total + rhs.total,
        }
    }
}

impl std::iter::Sum for Tally {
    fn sum<I: Iterator<Item = Tally>>(iter: I) -> Tally {
        iter.fold(Tally::default(), |acc, t| acc + t)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: LevelSlug,
    pub tally: Tally,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackProgress {
    pub track: TrackSlug,
    pub tally: Tally,
    pub percentage: u8,
    pub levels: Vec<LevelProgress>,
}

/// Full breakdown produced by one recompute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressReport {
    pub overall: u8,
    pub tally: Tally,
    pub tracks: Vec<TrackProgress>,
}

impl ProgressReport {
    #[must_use]
    pub fn track(&self, slug: &TrackSlug) -> Option<&TrackProgress> {
        self.tracks.iter().find(|t| &t.track == slug)
    }

    #[must_use]
    pub fn level(&self, track: &TrackSlug, level: &LevelSlug) -> Option<&LevelProgress> {
        self.track(track)
            .and_then(|t| t.levels.iter().find(|l| &l.level == level))
    }
}

/// Computes percentages for a catalog over some progress source.
pub struct Aggregator<'a, P: ProgressLookup + ?Sized> {
    catalog: &'a Catalog,
    progress: &'a P,
}

impl<'a, P: ProgressLookup + ?Sized> Aggregator<'a, P> {
    #[must_use]
    pub fn new(catalog: &'a Catalog, progress: &'a P) -> Self {
        Self { catalog, progress }
    }

    #[must_use]
    pub fn level_percentage(&self, track: &TrackSlug, level: &LevelSlug) -> u8 {
        self.catalog
            .level(track, level)
            .map_or(0, |l| self.level_tally(track, l).percentage())
    }

    #[must_use]
    pub fn track_percentage(&self, track: &TrackSlug) -> u8 {
        self.track_tally(track).percentage()
    }

    #[must_use]
    pub fn overall_percentage(&self) -> u8 {
        self.catalog
            .tracks()
            .iter()
            .map(|t| self.track_tally(t.slug()))
            .sum::<Tally>()
            .percentage()
    }

    #[must_use]
    pub fn level_tally(&self, track: &TrackSlug, level: &Level) -> Tally {
        let total = level.total_challenges();
        let completed = self
            .progress
            .record(track, level.slug())
            .map_or(0, |record| record.completed_within(total));
        Tally { completed, total }
    }

    #[must_use]
    pub fn track_tally(&self, track: &TrackSlug) -> Tally {
        self.catalog.track(track).map_or_else(Tally::default, |t| {
            t.levels().iter().map(|l| self.level_tally(track, l)).sum()
        })
    }

    /// Overall, per-track and per-level values in a single pass.
    #[must_use]
    pub fn report(&self) -> ProgressReport {
        let tracks: Vec<TrackProgress> = self
            .catalog
            .tracks()
            .iter()
            .map(|track| {
                let levels: Vec<LevelProgress> = track
                    .levels()
                    .iter()
                    .map(|level| {
                        let tally = self.level_tally(track.slug(), level);
                        LevelProgress {
                            level: level.slug().clone(),
                            tally,
                            percentage: tally.percentage(),
                        }
                    })
                    .collect();
                let tally: Tally = levels.iter().map(|l| l.tally).sum();
                TrackProgress {
                    track: track.slug().clone(),
                    tally,
                    percentage: tally.percentage(),
                    levels,
                }
            })
            .collect();
        let tally: Tally = tracks.iter().map(|t| t.tally).sum();
        ProgressReport {
            overall: tally.percentage(),
            tally,
            tracks,
        }
    }
}
