//! Base feature normalization
//!
//! Applies the standard-scaling transform fitted at training time:
//! `(x - mean) / scale` per column. The statistics come from the scaler
//! artifact and never change for the lifetime of a loaded artifact set.

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactKind, ArtifactLoadError, InferenceError};
use crate::layout::{layout_hash, BASE_FEATURES, BASE_FEATURE_COUNT};
use crate::types::{BaseFeatureVector, NormalizedFeatureVector};

/// Supported scaler artifact format
pub const SCALER_FORMAT_VERSION: u32 = 1;

/// Scaler artifact as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub format_version: u32,
    /// Column names the scaler was fitted on, when exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_layout_hash: Option<u32>,
}

/// Fitted affine transform over the seven base columns
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    mean: [f64; BASE_FEATURE_COUNT],
    scale: [f64; BASE_FEATURE_COUNT],
}

impl Normalizer {
    /// Build a normalizer from explicit statistics
    pub fn new(
        mean: [f64; BASE_FEATURE_COUNT],
        scale: [f64; BASE_FEATURE_COUNT],
    ) -> Result<Self, ArtifactLoadError> {
        for (i, (m, s)) in mean.iter().zip(scale.iter()).enumerate() {
            if !m.is_finite() {
                return Err(ArtifactLoadError::shape(
                    ArtifactKind::Scaler,
                    format!("mean for {} is not finite", BASE_FEATURES[i]),
                ));
            }
            if !s.is_finite() || *s == 0.0 {
                return Err(ArtifactLoadError::shape(
                    ArtifactKind::Scaler,
                    format!("scale for {} must be finite and non-zero, got {s}", BASE_FEATURES[i]),
                ));
            }
        }
        Ok(Self { mean, scale })
    }

    /// Validate a stored artifact and build the normalizer from it
    pub fn from_artifact(artifact: ScalerArtifact) -> Result<Self, ArtifactLoadError> {
        if artifact.format_version != SCALER_FORMAT_VERSION {
            return Err(ArtifactLoadError::UnsupportedVersion {
                artifact: ArtifactKind::Scaler,
                expected: SCALER_FORMAT_VERSION,
                found: artifact.format_version,
            });
        }

        if let Some(found) = artifact.feature_layout_hash {
            let expected = layout_hash();
            if found != expected {
                return Err(ArtifactLoadError::LayoutMismatch {
                    artifact: ArtifactKind::Scaler,
                    expected,
                    found,
                });
            }
        }

        if let Some(names) = &artifact.feature_names {
            if names.iter().map(String::as_str).ne(BASE_FEATURES.iter().copied()) {
                return Err(ArtifactLoadError::shape(
                    ArtifactKind::Scaler,
                    format!("fitted columns {names:?} do not match {BASE_FEATURES:?}"),
                ));
            }
        }

        let mean = fixed_width(artifact.mean, "mean")?;
        let scale = fixed_width(artifact.scale, "scale")?;
        Self::new(mean, scale)
    }

    /// Apply the fitted transform to one row
    pub fn normalize(&self, base: &BaseFeatureVector) -> Result<NormalizedFeatureVector, InferenceError> {
        let mut values = [0.0; BASE_FEATURE_COUNT];
        for (i, x) in base.values().iter().enumerate() {
            let z = (x - self.mean[i]) / self.scale[i];
            if !z.is_finite() {
                return Err(InferenceError::new(
                    "normalize",
                    format!("{} produced a non-finite value", BASE_FEATURES[i]),
                ));
            }
            values[i] = z;
        }
        Ok(NormalizedFeatureVector::new(values))
    }

    pub fn mean(&self) -> &[f64; BASE_FEATURE_COUNT] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; BASE_FEATURE_COUNT] {
        &self.scale
    }
}

fn fixed_width(values: Vec<f64>, name: &str) -> Result<[f64; BASE_FEATURE_COUNT], ArtifactLoadError> {
    let len = values.len();
    values.try_into().map_err(|_| {
        ArtifactLoadError::shape(
            ArtifactKind::Scaler,
            format!("{name} has {len} columns, expected {BASE_FEATURE_COUNT}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawInputs;

    fn sample_artifact() -> ScalerArtifact {
        ScalerArtifact {
            format_version: 1,
            feature_names: Some(BASE_FEATURES.iter().map(|s| s.to_string()).collect()),
            mean: vec![4.5, 4.0, 3.0, 6.3, 3.6, 0.5, 0.5],
            scale: vec![3.5, 2.9, 2.25, 4.3, 2.9, 0.5, 0.5],
            feature_layout_hash: Some(layout_hash()),
        }
    }

    #[test]
    fn test_normalize_applies_mean_and_scale() {
        let normalizer = Normalizer::from_artifact(sample_artifact()).unwrap();
        let base = BaseFeatureVector::from_inputs(&RawInputs {
            time_alone: 8.0,
            social_event_attendance: 4,
            going_outside: 1,
            friends_circle_size: 2,
            post_frequency: 0,
            stage_fear: true,
            drained_after_socializing: false,
        });

        let normalized = normalizer.normalize(&base).unwrap();
        let values = normalized.values();

        assert!((values[0] - 1.0).abs() < 1e-12);
        assert_eq!(values[1], 0.0);
        assert!((values[2] - (-2.0 / 2.25)).abs() < 1e-12);
        assert!((values[3] - (-1.0)).abs() < 1e-12);
        assert!((values[4] - (-3.6 / 2.9)).abs() < 1e-12);
        assert_eq!(values[5], 1.0);
        assert_eq!(values[6], -1.0);
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let mut artifact = sample_artifact();
        artifact.mean.pop();

        let err = Normalizer::from_artifact(artifact).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Shape { .. }));
        assert!(err.to_string().contains("mean has 6 columns"));
    }

    #[test]
    fn test_zero_scale_is_rejected() {
        let mut artifact = sample_artifact();
        artifact.scale[3] = 0.0;

        let err = Normalizer::from_artifact(artifact).unwrap_err();
        assert!(err.to_string().contains("Friends_circle_size"));
    }

    #[test]
    fn test_permuted_feature_names_are_rejected() {
        let mut artifact = sample_artifact();
        if let Some(names) = artifact.feature_names.as_mut() {
            names.swap(1, 2);
        }

        let err = Normalizer::from_artifact(artifact).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Shape { .. }));
    }

    #[test]
    fn test_layout_hash_mismatch_is_rejected() {
        let mut artifact = sample_artifact();
        artifact.feature_layout_hash = Some(layout_hash().wrapping_add(1));

        let err = Normalizer::from_artifact(artifact).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::LayoutMismatch { .. }));
    }

    #[test]
    fn test_unknown_format_version_is_rejected() {
        let mut artifact = sample_artifact();
        artifact.format_version = 2;

        let err = Normalizer::from_artifact(artifact).unwrap_err();
        assert!(matches!(
            err,
            ArtifactLoadError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn test_optional_metadata_may_be_absent() {
        let json = r#"{
            "format_version": 1,
            "mean": [0, 0, 0, 0, 0, 0, 0],
            "scale": [1, 1, 1, 1, 1, 1, 1]
        }"#;
        let artifact: ScalerArtifact = serde_json::from_str(json).unwrap();
        assert!(Normalizer::from_artifact(artifact).is_ok());
    }
}
