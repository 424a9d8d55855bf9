//! Pipeline orchestration
//!
//! This module provides the public prediction API. It runs one request through
//! every stage against a loaded artifact set.

use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::artifacts::{ArtifactPaths, ArtifactSet};
use crate::classifier::classify;
use crate::error::{ArtifactLoadError, MalformedInputError, PredictError};
use crate::features::FeatureDeriver;
use crate::types::{
    BaseFeatureVector, DerivedFeatures, EngineeredFeatureVector, PredictionResult, RawInputs,
};

/// Predict one request against an artifact set.
///
/// Pipeline stages:
/// 1. Validate raw inputs and assemble the base vector
/// 2. Normalizer - apply the fitted affine transform
/// 3. FeatureDeriver - compute interaction scores
/// 4. Assemble the 10-column engineered vector
/// 5. Classifier - class probabilities, decoded through the label encoder
/// 6. Interpret - confidence and advisory flags
pub fn predict_with(artifacts: &ArtifactSet, raw: &RawInputs) -> Result<PredictionResult, PredictError> {
    let (engineered, derived) = engineer_with(artifacts, raw)?;

    let classification = classify(artifacts.classifier(), &engineered)?;
    let personality = artifacts.labels().inverse_transform(classification.class_index)?;
    let probabilities = artifacts.labels().probabilities(classification.probabilities);

    let result = PredictionResult::new(personality, probabilities, derived);
    log::debug!(
        "Predicted {} (confidence {:.3}, balance {:.3})",
        result.personality,
        result.confidence,
        derived.social_solitary_balance()
    );
    Ok(result)
}

/// Run stages 1-4 and return the classifier input
pub fn engineer_with(
    artifacts: &ArtifactSet,
    raw: &RawInputs,
) -> Result<(EngineeredFeatureVector, DerivedFeatures), PredictError> {
    raw.validate().map_err(reject)?;

    let base = BaseFeatureVector::from_inputs(raw);
    let normalized = artifacts.normalizer().normalize(&base)?;
    let derived = FeatureDeriver::derive(&normalized);
    Ok((EngineeredFeatureVector::assemble(&normalized, &derived), derived))
}

fn reject(e: MalformedInputError) -> MalformedInputError {
    log::warn!("Rejected prediction request: {e}");
    e
}

/// Prediction service bound to one immutable artifact set.
///
/// Cheap to clone; clones share the artifacts.
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    artifacts: Arc<ArtifactSet>,
}

impl PredictionPipeline {
    pub fn new(artifacts: Arc<ArtifactSet>) -> Self {
        Self { artifacts }
    }

    /// Load artifacts from `dir` and build a pipeline over them
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        Ok(Self::new(Arc::new(ArtifactSet::load_dir(dir)?)))
    }

    /// Load artifacts from explicit paths
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactLoadError> {
        Ok(Self::new(Arc::new(ArtifactSet::load(paths)?)))
    }

    pub fn artifacts(&self) -> &Arc<ArtifactSet> {
        &self.artifacts
    }

    /// Classify one set of raw inputs
    pub fn predict(&self, raw: &RawInputs) -> Result<PredictionResult, PredictError> {
        predict_with(&self.artifacts, raw)
    }

    /// Decode a JSON request and classify it
    pub fn predict_json(&self, json: &str) -> Result<PredictionResult, PredictError> {
        let raw = RawInputs::from_json(json).map_err(reject)?;
        self.predict(&raw)
    }

    /// Same as [`PredictionPipeline::predict_json`] for an already-parsed value
    pub fn predict_value(&self, request: Value) -> Result<PredictionResult, PredictError> {
        let raw = RawInputs::from_value(request).map_err(reject)?;
        self.predict(&raw)
    }

    /// Classifier input for `raw`, for diagnostics
    pub fn engineer(
        &self,
        raw: &RawInputs,
    ) -> Result<(EngineeredFeatureVector, DerivedFeatures), PredictError> {
        engineer_with(&self.artifacts, raw)
    }
}

/// Pipeline handle whose artifact set can be replaced while serving.
///
/// Each prediction takes a snapshot of the current pipeline; a reload swaps
/// the reference only after the new set has fully loaded, so in-flight
/// predictions finish on the set they started with.
#[derive(Debug)]
pub struct SharedPredictor {
    current: RwLock<Arc<PredictionPipeline>>,
}

impl SharedPredictor {
    pub fn new(pipeline: PredictionPipeline) -> Self {
        Self {
            current: RwLock::new(Arc::new(pipeline)),
        }
    }

    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        Ok(Self::new(PredictionPipeline::load_dir(dir)?))
    }

    /// Pipeline currently serving requests
    pub fn snapshot(&self) -> Arc<PredictionPipeline> {
        Arc::clone(&self.current.read())
    }

    pub fn predict(&self, raw: &RawInputs) -> Result<PredictionResult, PredictError> {
        self.snapshot().predict(raw)
    }

    pub fn predict_json(&self, json: &str) -> Result<PredictionResult, PredictError> {
        self.snapshot().predict_json(json)
    }

    /// Replace the serving pipeline, returning the previous one
    pub fn swap(&self, pipeline: PredictionPipeline) -> Arc<PredictionPipeline> {
        let next = Arc::new(pipeline);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Load a new artifact set from `dir` and swap it in. On failure the
    /// serving set is left untouched.
    pub fn reload(&self, dir: impl AsRef<Path>) -> Result<(), ArtifactLoadError> {
        let dir = dir.as_ref();
        let pipeline = PredictionPipeline::load_dir(dir).map_err(|e| {
            log::error!("Artifact reload from {} failed: {e}", dir.display());
            e
        })?;
        self.swap(pipeline);
        log::info!("Swapped in artifacts from {}", dir.display());
        Ok(())
    }
}
