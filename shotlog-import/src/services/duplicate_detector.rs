//! Duplicate detection against persisted shots
//!
//! Two shots are the same real-world event when their fingerprints are
//! equal: time, shooting team, shooter, result, shot type, distance and
//! angle, compared exactly and case-sensitively. Only persisted shots are
//! compared against; repeated rows inside one file are not flagged.

use std::collections::{BTreeSet, HashMap};

use shotlog_common::db::{Shot, ShotRecord};

use crate::models::ShotCandidate;

/// Fields identifying one shot event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    time: String,
    shooting_team: String,
    shooter: String,
    result: String,
    shot_type: String,
    distance: u64,
    angle: u64,
}

/// Bit pattern of a float with `-0.0` folded into `0.0`
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl Fingerprint {
    pub fn of(record: &ShotRecord) -> Self {
        Self {
            time: record.time.clone(),
            shooting_team: record.shooting_team.clone(),
            shooter: record.shooter.clone(),
            result: record.result.to_string(),
            shot_type: record.shot_type.to_string(),
            distance: float_key(record.distance),
            angle: float_key(record.angle),
        }
    }
}

/// Existing shots of one game, indexed by (time, shooter)
pub struct DuplicateDetector {
    index: HashMap<(String, String), Vec<Fingerprint>>,
}

impl DuplicateDetector {
    pub fn new(existing: &[Shot]) -> Self {
        let mut index: HashMap<(String, String), Vec<Fingerprint>> = HashMap::new();
        for shot in existing {
            index
                .entry((shot.record.time.clone(), shot.record.shooter.clone()))
                .or_default()
                .push(Fingerprint::of(&shot.record));
        }
        Self { index }
    }

    pub fn is_duplicate(&self, record: &ShotRecord) -> bool {
        let key = (record.time.clone(), record.shooter.clone());
        match self.index.get(&key) {
            Some(bucket) => {
                let fingerprint = Fingerprint::of(record);
                bucket.iter().any(|f| *f == fingerprint)
            }
            None => false,
        }
    }

    /// Positions in `candidates` that match a persisted shot
    pub fn find_duplicates(&self, candidates: &[ShotCandidate]) -> BTreeSet<usize> {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| self.is_duplicate(&c.record))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Flag candidates matching any of `existing`
pub fn find_duplicates(candidates: &[ShotCandidate], existing: &[Shot]) -> BTreeSet<usize> {
    if existing.is_empty() {
        return BTreeSet::new();
    }
    DuplicateDetector::new(existing).find_duplicates(candidates)
}
