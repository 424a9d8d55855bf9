//! Classifier evaluation
//!
//! Evaluates the fitted model exported into the classifier artifact. Two
//! model families are supported:
//! - Random forest: trees exported as parallel node arrays, probabilities
//!   averaged over trees
//! - Logistic regression: one linear decision function through a sigmoid
//!
//! Both consume the 10-column engineered vector and produce a probability per
//! class index. Index → label mapping lives in [`crate::labels`].

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactKind, ArtifactLoadError, InferenceError};
use crate::layout::{feature_name, layout_hash, ENGINEERED_FEATURE_COUNT};
use crate::types::EngineeredFeatureVector;

/// Supported classifier artifact format
pub const CLASSIFIER_FORMAT_VERSION: u32 = 1;

/// Maximum deviation of the probability sum from 1.0
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

const N_CLASSES: usize = 2;
const LEAF: i64 = -1;

/// Probabilistic classifier over the engineered feature vector
pub trait Classifier: Send + Sync {
    /// Model family name, for diagnostics
    fn kind(&self) -> &'static str;

    /// Probability per class index
    fn predict_proba(&self, features: &EngineeredFeatureVector) -> Result<[f64; N_CLASSES], InferenceError>;
}

/// Predicted class index plus the distribution it was taken from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub class_index: usize,
    pub probabilities: [f64; N_CLASSES],
}

/// Run the classifier and check its output is a proper distribution.
///
/// The predicted index is the arg-max, ties going to the lowest index.
pub fn classify(
    classifier: &dyn Classifier,
    features: &EngineeredFeatureVector,
) -> Result<Classification, InferenceError> {
    let probabilities = classifier.predict_proba(features)?;

    if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(InferenceError::new(
            "classify",
            format!("{} returned invalid probabilities {probabilities:?}", classifier.kind()),
        ));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(InferenceError::new(
            "classify",
            format!("{} probabilities sum to {sum}", classifier.kind()),
        ));
    }

    let class_index = if probabilities[1] > probabilities[0] { 1 } else { 0 };
    Ok(Classification {
        class_index,
        probabilities,
    })
}

// ============================================================================
// Artifact format
// ============================================================================

/// Classifier artifact as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_layout_hash: Option<u32>,
    pub model: ModelParams,
}

/// Exported model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParams {
    RandomForest {
        n_features: usize,
        n_classes: usize,
        trees: Vec<TreeParams>,
    },
    LogisticRegression {
        n_features: usize,
        coefficients: Vec<f64>,
        intercept: f64,
    },
}

/// One decision tree as parallel node arrays. A node is a leaf when its
/// `children_left` entry is -1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions)
    pub value: Vec<Vec<f64>>,
}

impl ClassifierArtifact {
    /// Validate and build the evaluable classifier
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, ArtifactLoadError> {
        if self.format_version != CLASSIFIER_FORMAT_VERSION {
            return Err(ArtifactLoadError::UnsupportedVersion {
                artifact: ArtifactKind::Classifier,
                expected: CLASSIFIER_FORMAT_VERSION,
                found: self.format_version,
            });
        }

        if let Some(found) = self.feature_layout_hash {
            let expected = layout_hash();
            if found != expected {
                return Err(ArtifactLoadError::LayoutMismatch {
                    artifact: ArtifactKind::Classifier,
                    expected,
                    found,
                });
            }
        }

        match self.model {
            ModelParams::RandomForest {
                n_features,
                n_classes,
                trees,
            } => {
                check_width(n_features)?;
                if n_classes != N_CLASSES {
                    return Err(shape_error(format!(
                        "expected {N_CLASSES} classes, found {n_classes}"
                    )));
                }
                Ok(Box::new(RandomForest::new(trees)?))
            }
            ModelParams::LogisticRegression {
                n_features,
                coefficients,
                intercept,
            } => {
                check_width(n_features)?;
                Ok(Box::new(LogisticRegression::new(coefficients, intercept)?))
            }
        }
    }
}

fn check_width(n_features: usize) -> Result<(), ArtifactLoadError> {
    if n_features != ENGINEERED_FEATURE_COUNT {
        return Err(shape_error(format!(
            "model expects {n_features} features, pipeline produces {ENGINEERED_FEATURE_COUNT}"
        )));
    }
    Ok(())
}

fn shape_error(reason: String) -> ArtifactLoadError {
    ArtifactLoadError::shape(ArtifactKind::Classifier, reason)
}

// ============================================================================
// Random forest
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: [f64; N_CLASSES],
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_params(index: usize, params: TreeParams) -> Result<Self, ArtifactLoadError> {
        let n = params.children_left.len();
        if n == 0 {
            return Err(shape_error(format!("tree {index} has no nodes")));
        }
        if params.children_right.len() != n
            || params.feature.len() != n
            || params.threshold.len() != n
            || params.value.len() != n
        {
            return Err(shape_error(format!("tree {index} has ragged node arrays")));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (params.children_left[i], params.children_right[i]);
            let node = if left == LEAF {
                if right != LEAF {
                    return Err(shape_error(format!(
                        "tree {index} node {i} has only one child"
                    )));
                }
                Node::Leaf {
                    proba: leaf_distribution(index, i, &params.value[i])?,
                }
            } else {
                // Children always follow their parent, which rules out cycles
                let child = |c: i64| -> Result<usize, ArtifactLoadError> {
                    usize::try_from(c)
                        .ok()
                        .filter(|&c| c > i && c < n)
                        .ok_or_else(|| {
                            shape_error(format!("tree {index} node {i} has invalid child {c}"))
                        })
                };
                let feature = usize::try_from(params.feature[i])
                    .ok()
                    .filter(|&f| f < ENGINEERED_FEATURE_COUNT)
                    .ok_or_else(|| {
                        shape_error(format!(
                            "tree {index} node {i} splits on unknown feature {}",
                            params.feature[i]
                        ))
                    })?;
                let threshold = params.threshold[i];
                if !threshold.is_finite() {
                    return Err(shape_error(format!(
                        "tree {index} node {i} has non-finite threshold"
                    )));
                }
                Node::Split {
                    feature,
                    threshold,
                    left: child(left)?,
                    right: child(right)?,
                }
            };
            nodes.push(node);
        }

        Ok(Self { nodes })
    }

    fn leaf(&self, x: &[f64; ENGINEERED_FEATURE_COUNT]) -> &[f64; N_CLASSES] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // The fitted estimator compares single-precision inputs
                    let value = f64::from(x[*feature] as f32);
                    i = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn leaf_distribution(
    tree: usize,
    node: usize,
    weights: &[f64],
) -> Result<[f64; N_CLASSES], ArtifactLoadError> {
    if weights.len() != N_CLASSES {
        return Err(shape_error(format!(
            "tree {tree} leaf {node} has {} class weights, expected {N_CLASSES}",
            weights.len()
        )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(shape_error(format!(
            "tree {tree} leaf {node} has invalid class weights"
        )));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(shape_error(format!("tree {tree} leaf {node} is empty")));
    }
    Ok([weights[0] / total, weights[1] / total])
}

/// Averaged ensemble of decision trees
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(trees: Vec<TreeParams>) -> Result<Self, ArtifactLoadError> {
        if trees.is_empty() {
            return Err(shape_error("forest has no trees".to_string()));
        }
        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(i, params)| Tree::from_params(i, params))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn predict_proba(&self, features: &EngineeredFeatureVector) -> Result<[f64; N_CLASSES], InferenceError> {
        let x = features.values();
        let mut totals = [0.0; N_CLASSES];
        for tree in &self.trees {
            let proba = tree.leaf(x);
            totals[0] += proba[0];
            totals[1] += proba[1];
        }
        let n = self.trees.len() as f64;
        Ok([totals[0] / n, totals[1] / n])
    }
}

// ============================================================================
// Logistic regression
// ============================================================================

/// Binary logistic model; the decision function scores class index 1
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    coefficients: [f64; ENGINEERED_FEATURE_COUNT],
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, ArtifactLoadError> {
        let len = coefficients.len();
        let coefficients: [f64; ENGINEERED_FEATURE_COUNT] = coefficients.try_into().map_err(|_| {
            shape_error(format!(
                "{len} coefficients, expected {ENGINEERED_FEATURE_COUNT}"
            ))
        })?;
        if let Some(i) = coefficients.iter().position(|c| !c.is_finite()) {
            return Err(shape_error(format!(
                "coefficient for {} is not finite",
                feature_name(i).unwrap_or("?")
            )));
        }
        if !intercept.is_finite() {
            return Err(shape_error("intercept is not finite".to_string()));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    fn decision_function(&self, x: &[f64; ENGINEERED_FEATURE_COUNT]) -> f64 {
        self.coefficients
            .iter()
            .zip(x.iter())
            .fold(self.intercept, |acc, (w, v)| acc + w * v)
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn predict_proba(&self, features: &EngineeredFeatureVector) -> Result<[f64; N_CLASSES], InferenceError> {
        let z = self.decision_function(features.values());
        if !z.is_finite() {
            return Err(InferenceError::new(
                "classify",
                "decision function is not finite",
            ));
        }
        let p1 = sigmoid(z);
        Ok([1.0 - p1, p1])
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
