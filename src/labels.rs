//! Class index to label mapping
//!
//! The classifier emits class indices in whatever order training assigned
//! them. The mapping is read from the label encoder artifact rather than
//! assumed, so a retrained model with swapped indices still reports the
//! right label.

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactKind, ArtifactLoadError, InferenceError};
use crate::types::{ClassProbabilities, Personality};

/// Supported label encoder artifact format
pub const LABEL_ENCODER_FORMAT_VERSION: u32 = 1;

/// Label encoder artifact as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoderArtifact {
    pub format_version: u32,
    /// Label for each class index
    pub classes: Vec<String>,
}

/// Fitted index → label mapping over the two personality classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: [Personality; 2],
}

impl Default for LabelEncoder {
    fn default() -> Self {
        Self {
            classes: [Personality::Extrovert, Personality::Introvert],
        }
    }
}

impl LabelEncoder {
    pub fn new(classes: [Personality; 2]) -> Result<Self, ArtifactLoadError> {
        if classes[0] == classes[1] {
            return Err(ArtifactLoadError::shape(
                ArtifactKind::LabelEncoder,
                format!("both classes map to {}", classes[0]),
            ));
        }
        Ok(Self { classes })
    }

    pub fn from_artifact(artifact: LabelEncoderArtifact) -> Result<Self, ArtifactLoadError> {
        if artifact.format_version != LABEL_ENCODER_FORMAT_VERSION {
            return Err(ArtifactLoadError::UnsupportedVersion {
                artifact: ArtifactKind::LabelEncoder,
                expected: LABEL_ENCODER_FORMAT_VERSION,
                found: artifact.format_version,
            });
        }

        if artifact.classes.len() != 2 {
            return Err(ArtifactLoadError::shape(
                ArtifactKind::LabelEncoder,
                format!("expected 2 classes, found {}", artifact.classes.len()),
            ));
        }

        let mut classes = [Personality::Extrovert; 2];
        for (slot, label) in classes.iter_mut().zip(&artifact.classes) {
            *slot = label
                .parse()
                .map_err(|reason: String| ArtifactLoadError::shape(ArtifactKind::LabelEncoder, reason))?;
        }
        Self::new(classes)
    }

    /// Label for a class index
    pub fn inverse_transform(&self, index: usize) -> Result<Personality, InferenceError> {
        self.classes.get(index).copied().ok_or_else(|| {
            InferenceError::new("decode_label", format!("class index {index} has no label"))
        })
    }

    /// Key a positional probability pair by label
    pub fn probabilities(&self, proba: [f64; 2]) -> ClassProbabilities {
        let mut probabilities = ClassProbabilities {
            extrovert: 0.0,
            introvert: 0.0,
        };
        for (label, p) in self.classes.iter().zip(proba) {
            match label {
                Personality::Extrovert => probabilities.extrovert = p,
                Personality::Introvert => probabilities.introvert = p,
            }
        }
        probabilities
    }

    pub fn classes(&self) -> &[Personality; 2] {
        &self.classes
    }
}
