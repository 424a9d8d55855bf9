//! Feature derivation
//!
//! Derives the three interaction scores the classifier was trained with:
//! - Social engagement: mean of the four outward-activity columns
//! - Introversion tendency: mean of alone time and the two aversion flags
//! - Social/solitary balance: engagement minus introversion tendency
//!
//! The inputs are the *normalized* columns. Training built these features after
//! scaling, so deriving them from raw values would silently shift every
//! prediction.

use crate::layout::{
    DRAINED_AFTER_SOCIALIZING, FRIENDS_CIRCLE_SIZE, GOING_OUTSIDE, POST_FREQUENCY,
    SOCIAL_EVENT_ATTENDANCE, STAGE_FEAR, TIME_ALONE,
};
use crate::types::{DerivedFeatures, NormalizedFeatureVector};

/// Feature deriver for computing interaction scores
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive interaction features from a normalized vector
    pub fn derive(normalized: &NormalizedFeatureVector) -> DerivedFeatures {
        DerivedFeatures::new(
            compute_social_engagement(normalized),
            compute_introversion_tendency(normalized),
        )
    }
}

fn compute_social_engagement(v: &NormalizedFeatureVector) -> f64 {
    (v.get(SOCIAL_EVENT_ATTENDANCE)
        + v.get(GOING_OUTSIDE)
        + v.get(FRIENDS_CIRCLE_SIZE)
        + v.get(POST_FREQUENCY))
        / 4.0
}

fn compute_introversion_tendency(v: &NormalizedFeatureVector) -> f64 {
    (v.get(TIME_ALONE) + v.get(STAGE_FEAR) + v.get(DRAINED_AFTER_SOCIALIZING)) / 3.0
}
