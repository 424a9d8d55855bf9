//! Model artifact store
//!
//! Loads the three fitted artifacts (classifier, scaler, label encoder) from a
//! directory and validates them against each other and against the compiled
//! feature layout. A loaded [`ArtifactSet`] is immutable.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::classifier::{Classifier, ClassifierArtifact};
use crate::error::{ArtifactKind, ArtifactLoadError};
use crate::labels::{LabelEncoder, LabelEncoderArtifact};
use crate::normalizer::{Normalizer, ScalerArtifact};

/// Environment variable overriding the artifact directory
pub const MODELS_DIR_ENV: &str = "PERSONALITY_MODELS_DIR";

/// Artifact directory used when nothing else is configured
pub const DEFAULT_MODELS_DIR: &str = "models";

pub const CLASSIFIER_FILE: &str = "personality_model.json";
pub const SCALER_FILE: &str = "personality_scaler.json";
pub const LABEL_ENCODER_FILE: &str = "personality_label_encoder.json";

/// Locations of the three artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub scaler: PathBuf,
    pub label_encoder: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            classifier: dir.join(CLASSIFIER_FILE),
            scaler: dir.join(SCALER_FILE),
            label_encoder: dir.join(LABEL_ENCODER_FILE),
        }
    }

    /// `$PERSONALITY_MODELS_DIR` if set, otherwise `models/`
    pub fn from_env() -> Self {
        match std::env::var_os(MODELS_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::in_dir(PathBuf::from(dir)),
            _ => Self::in_dir(DEFAULT_MODELS_DIR),
        }
    }

    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Classifier => &self.classifier,
            ArtifactKind::Scaler => &self.scaler,
            ArtifactKind::LabelEncoder => &self.label_encoder,
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir(DEFAULT_MODELS_DIR)
    }
}

/// Fitted scaler, classifier and label mapping loaded together
pub struct ArtifactSet {
    normalizer: Normalizer,
    classifier: Box<dyn Classifier>,
    labels: LabelEncoder,
    source: Option<PathBuf>,
    loaded_at: DateTime<Utc>,
}

impl fmt::Debug for ArtifactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactSet")
            .field("normalizer", &self.normalizer)
            .field("classifier", &self.classifier.kind())
            .field("labels", &self.labels)
            .field("source", &self.source)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl ArtifactSet {
    /// Assemble an artifact set from already-built parts
    pub fn new(normalizer: Normalizer, classifier: Box<dyn Classifier>, labels: LabelEncoder) -> Self {
        Self {
            normalizer,
            classifier,
            labels,
            source: None,
            loaded_at: Utc::now(),
        }
    }

    /// Load all three artifacts from the standard file names in `dir`
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        let dir = dir.as_ref();
        let mut set = Self::load(&ArtifactPaths::in_dir(dir))?;
        set.source = Some(dir.to_path_buf());
        Ok(set)
    }

    /// Load all three artifacts. Any failure aborts the whole load.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactLoadError> {
        let classifier: ClassifierArtifact = read_artifact(paths, ArtifactKind::Classifier)?;
        let scaler: ScalerArtifact = read_artifact(paths, ArtifactKind::Scaler)?;
        let labels: LabelEncoderArtifact = read_artifact(paths, ArtifactKind::LabelEncoder)?;

        let set = Self::from_artifacts(classifier, scaler, labels)?;
        log::info!(
            "Loaded {} classifier with labels {:?} from {}",
            set.classifier.kind(),
            set.labels.classes(),
            paths.classifier.display()
        );
        Ok(set)
    }

    /// Validate parsed artifacts and build the set
    pub fn from_artifacts(
        classifier: ClassifierArtifact,
        scaler: ScalerArtifact,
        labels: LabelEncoderArtifact,
    ) -> Result<Self, ArtifactLoadError> {
        Ok(Self::new(
            Normalizer::from_artifact(scaler)?,
            classifier.into_classifier()?,
            LabelEncoder::from_artifact(labels)?,
        ))
    }

    /// Parse all three artifacts from JSON strings
    pub fn from_json(
        classifier_json: &str,
        scaler_json: &str,
        labels_json: &str,
    ) -> Result<Self, ArtifactLoadError> {
        Self::from_artifacts(
            parse_artifact(ArtifactKind::Classifier, classifier_json)?,
            parse_artifact(ArtifactKind::Scaler, scaler_json)?,
            parse_artifact(ArtifactKind::LabelEncoder, labels_json)?,
        )
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// Directory the set was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

fn read_artifact<T: DeserializeOwned>(
    paths: &ArtifactPaths,
    artifact: ArtifactKind,
) -> Result<T, ArtifactLoadError> {
    let path = paths.path(artifact);
    let json = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ArtifactLoadError::Missing {
                artifact,
                path: path.to_path_buf(),
            }
        } else {
            ArtifactLoadError::Io { artifact, source }
        }
    })?;
    parse_artifact(artifact, &json)
}

fn parse_artifact<T: DeserializeOwned>(artifact: ArtifactKind, json: &str) -> Result<T, ArtifactLoadError> {
    serde_json::from_str(json).map_err(|source| ArtifactLoadError::Corrupt { artifact, source })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// The reference artifact set shipped under `models/`
    pub(crate) fn reference_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_MODELS_DIR)
    }

    /// Fresh scratch directory holding a copy of the reference artifacts
    pub(crate) fn scratch_copy() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "personality-artifacts-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        for file in [CLASSIFIER_FILE, SCALER_FILE, LABEL_ENCODER_FILE] {
            fs::copy(reference_dir().join(file), dir.join(file)).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_reference_artifacts() {
        let set = ArtifactSet::load_dir(reference_dir()).unwrap();

        assert_eq!(set.classifier().kind(), "random_forest");
        assert_eq!(set.labels(), &LabelEncoder::default());
        assert_eq!(set.source(), Some(reference_dir().as_path()));
        assert_eq!(set.normalizer().mean()[0], 4.505816);
    }

    #[test]
    fn test_missing_artifact_is_reported_by_name() {
        let dir = scratch_copy();
        fs::remove_file(dir.join(SCALER_FILE)).unwrap();

        let err = ArtifactSet::load_dir(&dir).unwrap_err();
        match err {
            ArtifactLoadError::Missing { artifact, path } => {
                assert_eq!(artifact, ArtifactKind::Scaler);
                assert_eq!(path, dir.join(SCALER_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = scratch_copy();
        fs::write(dir.join(LABEL_ENCODER_FILE), "{ not json").unwrap();

        let err = ArtifactSet::load_dir(&dir).unwrap_err();
        assert!(matches!(
            err,
            ArtifactLoadError::Corrupt {
                artifact: ArtifactKind::LabelEncoder,
                ..
            }
        ));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_shape_incompatible_artifact() {
        let dir = scratch_copy();
        fs::write(
            dir.join(SCALER_FILE),
            r#"{"format_version": 1, "mean": [0, 0, 0], "scale": [1, 1, 1]}"#,
        )
        .unwrap();

        let err = ArtifactSet::load_dir(&dir).unwrap_err();
        assert!(matches!(
            err,
            ArtifactLoadError::Shape {
                artifact: ArtifactKind::Scaler,
                ..
            }
        ));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_paths_in_dir() {
        let paths = ArtifactPaths::in_dir("/srv/models");
        assert_eq!(paths.classifier, Path::new("/srv/models/personality_model.json"));
        assert_eq!(
            paths.path(ArtifactKind::LabelEncoder),
            Path::new("/srv/models/personality_label_encoder.json")
        );
        assert_eq!(ArtifactPaths::default(), ArtifactPaths::in_dir("models"));
    }

    #[test]
    fn test_from_json_strings() {
        let classifier = fs::read_to_string(reference_dir().join(CLASSIFIER_FILE)).unwrap();
        let scaler = fs::read_to_string(reference_dir().join(SCALER_FILE)).unwrap();
        let labels = r#"{"format_version": 1, "classes": ["Introvert", "Extrovert"]}"#;

        let set = ArtifactSet::from_json(&classifier, &scaler, labels).unwrap();
        assert_eq!(set.source(), None);
        assert_eq!(
            set.labels().classes(),
            &[crate::types::Personality::Introvert, crate::types::Personality::Extrovert]
        );
    }
}
