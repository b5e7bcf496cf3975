//! XP and levels derived from the journal.
//!
//! Progression is recomputed from the full log on every snapshot and never
//! persisted on its own; there is no second copy to drift out of sync.
//! Failures earn partial credit so the bar still moves on bad days.

use crate::journal::Journal;
use crate::model::Outcome;

pub const XP_SUCCESS: u64 = 10;
pub const XP_FAILURE: u64 = 3;
pub const LEVEL_SIZE: u64 = 50;

/// Display titles per level, clamped at the end of the list.
pub const LEVEL_TITLES: [&str; 8] = [
    "Sprout", "Seedling", "Sapling", "Branch", "Bloom", "Grove", "Canopy", "Evergreen",
];

pub fn points_for(outcome: Outcome) -> u64 {
    match outcome {
        Outcome::Success => XP_SUCCESS,
        Outcome::Failure => XP_FAILURE,
    }
}

pub fn total_xp(journal: &Journal) -> u64 {
    journal
        .days()
        .flat_map(|(_, events)| events)
        .map(|e| points_for(e.outcome))
        .sum()
}

/// Zero-indexed level; display adds 1.
pub fn level_of(xp: u64) -> u64 {
    xp / LEVEL_SIZE
}

pub fn xp_into_level(xp: u64) -> u64 {
    xp % LEVEL_SIZE
}

pub fn level_title(level: u64) -> &'static str {
    let idx = (level as usize).min(LEVEL_TITLES.len() - 1);
    LEVEL_TITLES[idx]
}
