//! Import planning
//!
//! Describes what a commit would do so the caller can confirm before
//! anything is written.

use std::collections::BTreeSet;

use crate::models::{ImportPlan, ShotCandidate};

/// Plan a commit of `candidates` into the game `existing_game`, or into a
/// new game when `None`
pub fn build_plan(
    candidates: &[ShotCandidate],
    duplicates: &BTreeSet<usize>,
    existing_game: Option<i64>,
) -> ImportPlan {
    let total = candidates.len();
    let duplicate_count = duplicates.iter().filter(|&&i| i < total).count();

    ImportPlan {
        total,
        unique_count: total - duplicate_count,
        duplicate_count,
        target_is_new_game: existing_game.is_none(),
        target_game_id: existing_game,
    }
}
