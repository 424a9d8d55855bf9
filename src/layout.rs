//! Feature layout
//!
//! Column order is the contract with the fitted scaler and classifier. Any
//! permutation silently produces wrong predictions, so the layout lives here
//! and nowhere else.
//!
//! Rules:
//! 1. Adding, removing or reordering a column bumps [`FEATURE_VERSION`].
//! 2. Changing a derived-feature formula bumps [`FEATURE_VERSION`].
//! 3. Artifacts exported against another layout are rejected at load time via
//!    [`layout_hash`].

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Base columns, in the order the scaler was fitted on
pub const BASE_FEATURES: [&str; BASE_FEATURE_COUNT] = [
    "Time_spent_Alone",              // 0
    "Social_event_attendance",       // 1
    "Going_outside",                 // 2
    "Friends_circle_size",           // 3
    "Post_frequency",                // 4
    "Stage_fear_Yes",                // 5
    "Drained_after_socializing_Yes", // 6
];

/// Derived columns appended after the base columns
pub const DERIVED_FEATURES: [&str; DERIVED_FEATURE_COUNT] = [
    "Social_Engagement",       // 7
    "Introversion_Tendency",   // 8
    "Social_Solitary_Balance", // 9
];

pub const BASE_FEATURE_COUNT: usize = 7;
pub const DERIVED_FEATURE_COUNT: usize = 3;
pub const ENGINEERED_FEATURE_COUNT: usize = BASE_FEATURE_COUNT + DERIVED_FEATURE_COUNT;

pub const TIME_ALONE: usize = 0;
pub const SOCIAL_EVENT_ATTENDANCE: usize = 1;
pub const GOING_OUTSIDE: usize = 2;
pub const FRIENDS_CIRCLE_SIZE: usize = 3;
pub const POST_FREQUENCY: usize = 4;
pub const STAGE_FEAR: usize = 5;
pub const DRAINED_AFTER_SOCIALIZING: usize = 6;

/// Name of the engineered column at `index`
pub fn feature_name(index: usize) -> Option<&'static str> {
    if index < BASE_FEATURE_COUNT {
        Some(BASE_FEATURES[index])
    } else {
        DERIVED_FEATURES.get(index - BASE_FEATURE_COUNT).copied()
    }
}

fn engineered_features() -> impl Iterator<Item = &'static str> {
    BASE_FEATURES.iter().chain(DERIVED_FEATURES.iter()).copied()
}

/// CRC32 over the layout version and every engineered column name in order
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in engineered_features() {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Layout summary for diagnostics and artifact export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_names: engineered_features().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        assert_eq!(ENGINEERED_FEATURE_COUNT, 10);
        assert_eq!(engineered_features().count(), ENGINEERED_FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_is_stable_and_non_zero() {
        assert_eq!(layout_hash(), layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_layout_hash_matches_exported_artifacts() {
        // Value stamped into models/*.json; changes only with a layout bump
        assert_eq!(layout_hash(), 0xf2eb_f0c2);
    }

    #[test]
    fn test_feature_names_by_index() {
        assert_eq!(feature_name(TIME_ALONE), Some("Time_spent_Alone"));
        assert_eq!(feature_name(DRAINED_AFTER_SOCIALIZING), Some("Drained_after_socializing_Yes"));
        assert_eq!(feature_name(9), Some("Social_Solitary_Balance"));
        assert_eq!(feature_name(FRIENDS_CIRCLE_SIZE), Some("Friends_circle_size"));
        assert_eq!(feature_name(7), Some("Social_Engagement"));
        assert_eq!(feature_name(10), None);
    }

    #[test]
    fn test_layout_info() {
        let info = LayoutInfo::current();
        assert_eq!(info.version, FEATURE_VERSION);
        assert_eq!(info.hash, layout_hash());
        assert_eq!(info.feature_names.len(), ENGINEERED_FEATURE_COUNT);
        assert_eq!(info.feature_names[8], "Introversion_Tendency");
    }
}
