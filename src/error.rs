//! Error types for the personality predictor
//!
//! Artifact failures are process-level and stop serving. Input and inference
//! failures are per-request and are returned to the caller as [`PredictError`].

use std::path::PathBuf;
use thiserror::Error;

/// Which of the three stored artifacts an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    LabelEncoder,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::LabelEncoder => "label_encoder",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while loading the artifact set. Fatal to serving.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("Missing {artifact} artifact at {}", path.display())]
    Missing { artifact: ArtifactKind, path: PathBuf },

    #[error("Failed to read {artifact} artifact: {source}")]
    Io {
        artifact: ArtifactKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt {artifact} artifact: {source}")]
    Corrupt {
        artifact: ArtifactKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Incompatible {artifact} artifact: {reason}")]
    Shape {
        artifact: ArtifactKind,
        reason: String,
    },

    #[error("Unsupported {artifact} format version {found} (expected {expected})")]
    UnsupportedVersion {
        artifact: ArtifactKind,
        expected: u32,
        found: u32,
    },

    #[error("Feature layout mismatch in {artifact}: expected hash {expected:08x}, found {found:08x}")]
    LayoutMismatch {
        artifact: ArtifactKind,
        expected: u32,
        found: u32,
    },
}

impl ArtifactLoadError {
    pub(crate) fn shape(artifact: ArtifactKind, reason: impl Into<String>) -> Self {
        ArtifactLoadError::Shape {
            artifact,
            reason: reason.into(),
        }
    }
}

/// A raw input was absent or outside its declared domain
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Malformed input field `{field}`: {reason}")]
pub struct MalformedInputError {
    pub field: &'static str,
    pub reason: String,
}

impl MalformedInputError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// The normalizer or classifier failed on well-formed input
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Inference failed during {stage}: {reason}")]
pub struct InferenceError {
    pub stage: &'static str,
    pub reason: String,
}

impl InferenceError {
    pub fn new(stage: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Per-request failure returned by the prediction pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    MalformedInput(#[from] MalformedInputError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Stable machine-readable code for outbound error records
    pub fn code(&self) -> &'static str {
        match self {
            PredictError::MalformedInput(_) => "MALFORMED_INPUT",
            PredictError::Inference(_) => "INFERENCE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input_names_field() {
        let err = MalformedInputError::new("going_outside", "8 is outside [0, 7]");
        assert_eq!(
            err.to_string(),
            "Malformed input field `going_outside`: 8 is outside [0, 7]"
        );
    }

    #[test]
    fn test_predict_error_codes() {
        let malformed: PredictError = MalformedInputError::new("time_alone", "NaN").into();
        let inference: PredictError = InferenceError::new("classify", "bad width").into();

        assert_eq!(malformed.code(), "MALFORMED_INPUT");
        assert_eq!(inference.code(), "INFERENCE_ERROR");
        assert_eq!(
            inference.to_string(),
            "Inference failed during classify: bad width"
        );
    }

    #[test]
    fn test_layout_mismatch_formats_hex() {
        let err = ArtifactLoadError::LayoutMismatch {
            artifact: ArtifactKind::Classifier,
            expected: 0xdeadbeef,
            found: 0x1,
        };
        assert!(err.to_string().contains("deadbeef"));
        assert!(err.to_string().contains("00000001"));
    }
}
