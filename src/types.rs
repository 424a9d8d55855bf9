//! Core types for the prediction pipeline
//!
//! This module defines the data that flows through each stage: raw inputs,
//! base/normalized/engineered feature vectors, derived scores, and the
//! interpreted prediction result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::layout::{
    BASE_FEATURE_COUNT, DERIVED_FEATURE_COUNT, DRAINED_AFTER_SOCIALIZING, ENGINEERED_FEATURE_COUNT,
    FRIENDS_CIRCLE_SIZE, GOING_OUTSIDE, POST_FREQUENCY, SOCIAL_EVENT_ATTENDANCE, STAGE_FEAR,
    TIME_ALONE,
};

/// |social_solitary_balance| below this marks the subject as ambivert-like
pub const AMBIVERT_BALANCE_THRESHOLD: f64 = 0.3;

/// Confidence below this marks the prediction as low-confidence
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Personality class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Personality {
    Extrovert,
    Introvert,
}

impl Personality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Personality::Extrovert => "Extrovert",
            Personality::Introvert => "Introvert",
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Personality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Extrovert" => Ok(Personality::Extrovert),
            "Introvert" => Ok(Personality::Introvert),
            other => Err(format!("unknown personality label: {other}")),
        }
    }
}

/// Seven self-reported behavioral measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawInputs {
    /// Hours spent alone per day, 0-11
    pub time_alone: f64,
    /// Social events attended per month, 0-10 (10 means 10+)
    pub social_event_attendance: u32,
    /// Outings per week, 0-7 (7 means daily)
    pub going_outside: u32,
    /// Close friends, 0-15 (15 means 15+)
    pub friends_circle_size: u32,
    /// Social media posts per week, 0-10 (10 means 10+)
    pub post_frequency: u32,
    /// Anxious when speaking publicly
    pub stage_fear: bool,
    /// Needs to recharge after socializing
    pub drained_after_socializing: bool,
}

/// Raw inputs in fitted column order, booleans mapped to 0/1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseFeatureVector([f64; BASE_FEATURE_COUNT]);

impl BaseFeatureVector {
    pub fn from_inputs(raw: &RawInputs) -> Self {
        let mut values = [0.0; BASE_FEATURE_COUNT];
        values[TIME_ALONE] = raw.time_alone;
        values[SOCIAL_EVENT_ATTENDANCE] = f64::from(raw.social_event_attendance);
        values[GOING_OUTSIDE] = f64::from(raw.going_outside);
        values[FRIENDS_CIRCLE_SIZE] = f64::from(raw.friends_circle_size);
        values[POST_FREQUENCY] = f64::from(raw.post_frequency);
        values[STAGE_FEAR] = flag(raw.stage_fear);
        values[DRAINED_AFTER_SOCIALIZING] = flag(raw.drained_after_socializing);
        Self(values)
    }

    pub fn values(&self) -> &[f64; BASE_FEATURE_COUNT] {
        &self.0
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Base features after the fitted affine transform. Same order as
/// [`BaseFeatureVector`]; only the normalizer produces these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedFeatureVector([f64; BASE_FEATURE_COUNT]);

impl NormalizedFeatureVector {
    pub(crate) fn new(values: [f64; BASE_FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; BASE_FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, index: usize) -> f64 {
        self.0[index]
    }
}

/// Interaction scores computed from the normalized vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedFeatures {
    social_engagement: f64,
    introversion_tendency: f64,
    social_solitary_balance: f64,
}

impl DerivedFeatures {
    pub(crate) fn new(social_engagement: f64, introversion_tendency: f64) -> Self {
        Self {
            social_engagement,
            introversion_tendency,
            social_solitary_balance: social_engagement - introversion_tendency,
        }
    }

    pub fn social_engagement(&self) -> f64 {
        self.social_engagement
    }

    pub fn introversion_tendency(&self) -> f64 {
        self.introversion_tendency
    }

    pub fn social_solitary_balance(&self) -> f64 {
        self.social_solitary_balance
    }

    pub fn values(&self) -> [f64; DERIVED_FEATURE_COUNT] {
        [
            self.social_engagement,
            self.introversion_tendency,
            self.social_solitary_balance,
        ]
    }
}

/// The classifier's 10-column input: normalized base features then derived
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineeredFeatureVector([f64; ENGINEERED_FEATURE_COUNT]);

impl EngineeredFeatureVector {
    pub fn assemble(normalized: &NormalizedFeatureVector, derived: &DerivedFeatures) -> Self {
        let mut values = [0.0; ENGINEERED_FEATURE_COUNT];
        values[..BASE_FEATURE_COUNT].copy_from_slice(normalized.values());
        values[BASE_FEATURE_COUNT..].copy_from_slice(&derived.values());
        Self(values)
    }

    pub fn values(&self) -> &[f64; ENGINEERED_FEATURE_COUNT] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_values(values: [f64; ENGINEERED_FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

/// Per-class probabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    #[serde(rename = "Extrovert")]
    pub extrovert: f64,
    #[serde(rename = "Introvert")]
    pub introvert: f64,
}

impl ClassProbabilities {
    pub fn of(&self, personality: Personality) -> f64 {
        match personality {
            Personality::Extrovert => self.extrovert,
            Personality::Introvert => self.introvert,
        }
    }

    pub fn max(&self) -> f64 {
        self.extrovert.max(self.introvert)
    }

    pub fn sum(&self) -> f64 {
        self.extrovert + self.introvert
    }
}

/// Interpreted outcome of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub personality: Personality,
    /// Highest class probability
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
    #[serde(flatten)]
    pub features: DerivedFeatures,
    pub is_ambivert_like: bool,
    pub is_low_confidence: bool,
}

impl PredictionResult {
    pub fn new(
        personality: Personality,
        probabilities: ClassProbabilities,
        features: DerivedFeatures,
    ) -> Self {
        let confidence = probabilities.max();
        Self {
            personality,
            confidence,
            probabilities,
            features,
            is_ambivert_like: is_ambivert_like(features.social_solitary_balance()),
            is_low_confidence: is_low_confidence(confidence),
        }
    }
}

pub fn is_ambivert_like(social_solitary_balance: f64) -> bool {
    social_solitary_balance.abs() < AMBIVERT_BALANCE_THRESHOLD
}

pub fn is_low_confidence(confidence: f64) -> bool {
    confidence < LOW_CONFIDENCE_THRESHOLD
}
