//! Human-readable interpretation of a prediction
//!
//! Turns a [`PredictionResult`] into the headline, breakdown and advisory
//! notes a display surface shows next to the raw numbers.

use serde::Serialize;
use std::fmt;

use crate::types::{Personality, PredictionResult};

const EXTROVERT_TENDENCIES: &[&str] = &[
    "Gain energy from social interaction",
    "Feel comfortable in groups",
    "Think out loud and process externally",
    "Seek stimulation from the outside world",
];

const INTROVERT_TENDENCIES: &[&str] = &[
    "Recharge through alone time",
    "Prefer deeper, smaller social circles",
    "Think before speaking",
    "Find fulfillment in internal reflection",
];

const AMBIVERT_NOTE: &str = "You show balanced traits between both personality types. \
You might be an ambivert: someone with both extroverted and introverted tendencies.";

const LOW_CONFIDENCE_NOTE: &str = "The confidence is moderate. You might want to retake \
the test or consider that you have a mix of both personality traits.";

/// Display-ready interpretation of one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub headline: String,
    /// Confidence as a whole percentage, e.g. "85%"
    pub confidence: String,
    /// Per-class probabilities with one decimal, e.g. ("Extrovert", "14.6%")
    pub breakdown: Vec<(Personality, String)>,
    pub tendencies: Vec<&'static str>,
    pub scores: Vec<(&'static str, String)>,
    pub notes: Vec<&'static str>,
}

impl Insights {
    pub fn from_result(result: &PredictionResult) -> Self {
        let tendencies = match result.personality {
            Personality::Extrovert => EXTROVERT_TENDENCIES,
            Personality::Introvert => INTROVERT_TENDENCIES,
        };

        let mut notes = Vec::new();
        if result.is_ambivert_like {
            notes.push(AMBIVERT_NOTE);
        }
        if result.is_low_confidence {
            notes.push(LOW_CONFIDENCE_NOTE);
        }

        let features = &result.features;
        Self {
            headline: format!("You are an {}!", result.personality),
            confidence: format!("{:.0}%", result.confidence * 100.0),
            breakdown: [Personality::Extrovert, Personality::Introvert]
                .into_iter()
                .map(|p| (p, format!("{:.1}%", result.probabilities.of(p) * 100.0)))
                .collect(),
            tendencies: tendencies.to_vec(),
            scores: vec![
                ("Social Engagement", format!("{:.2}", features.social_engagement())),
                ("Introversion Tendency", format!("{:.2}", features.introversion_tendency())),
                ("Social-Solitary Balance", format!("{:.2}", features.social_solitary_balance())),
            ],
            notes,
        }
    }
}

impl fmt::Display for Insights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.headline)?;
        writeln!(f, "Confidence: {}", self.confidence)?;
        writeln!(f)?;
        writeln!(f, "Personality breakdown:")?;
        for (personality, pct) in &self.breakdown {
            writeln!(f, "  {personality}: {pct}")?;
        }
        writeln!(f)?;
        writeln!(f, "You tend to:")?;
        for tendency in &self.tendencies {
            writeln!(f, "  - {tendency}")?;
        }
        writeln!(f)?;
        writeln!(f, "Behavioral scores:")?;
        for (name, value) in &self.scores {
            writeln!(f, "  {name}: {value}")?;
        }
        for note in &self.notes {
            writeln!(f)?;
            writeln!(f, "Note: {note}")?;
        }
        Ok(())
    }
}
