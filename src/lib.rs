//! Personality Predictor - Extrovert/Introvert classification from a short
//! behavioral questionnaire
//!
//! Seven answers pass through a deterministic pipeline: input validation →
//! standard scaling → feature derivation → classification → label decoding →
//! interpretation flags. The fitted scaler, classifier and label encoder are
//! loaded once as an [`ArtifactSet`] and shared read-only across predictions.
//!
//! ## Modules
//!
//! - **Pipeline**: [`PredictionPipeline`] for one artifact set,
//!   [`SharedPredictor`] when artifacts must be reloaded while serving
//! - **Artifacts**: JSON artifact loading and cross-validation against the
//!   compiled [`layout`]
//! - **Insights**: human-readable interpretation of a result

pub mod artifacts;
pub mod classifier;
pub mod error;
pub mod features;
pub mod input;
pub mod insights;
pub mod labels;
pub mod layout;
pub mod normalizer;
pub mod pipeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use artifacts::{ArtifactPaths, ArtifactSet};
pub use error::{ArtifactLoadError, InferenceError, MalformedInputError, PredictError};
pub use insights::Insights;
pub use pipeline::{predict_with, PredictionPipeline, SharedPredictor};
pub use types::{ClassProbabilities, DerivedFeatures, Personality, PredictionResult, RawInputs};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by diagnostics
pub const PRODUCER_NAME: &str = "personality-predictor";
