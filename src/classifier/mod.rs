//! Classifier Module: pose classification behind a single-flight gate
//!
//! # Components
//! - `gate.rs`: ClassificationGate, collapses every failure to `Inconclusive`
//! - `model.rs`: Candle two-layer perceptron loaded from bincode weights

pub mod gate;
pub mod model;

#[cfg(test)]
pub(crate) mod testing;

pub use gate::{ClassificationGate, ClassificationOutcome};
pub use model::CandleClassifier;

use std::future::Future;

/// One ranked classifier answer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    /// Pose index in the catalog
    pub label: usize,
    /// Probability (0.0-1.0)
    pub confidence: f32,
}

/// Why a classifier call produced nothing usable
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("expected {expected} features, got {got}")]
    InputSize { expected: usize, got: usize },

    #[error("inference failed: {0}")]
    Inference(String),
}

impl From<candle_core::Error> for ClassifierError {
    fn from(e: candle_core::Error) -> Self {
        ClassifierError::Inference(e.to_string())
    }
}

/// External pose classifier; returns predictions ranked best first
pub trait PoseClassifier {
    fn classify(
        &mut self,
        features: &[f32],
    ) -> impl Future<Output = Result<Vec<Prediction>, ClassifierError>> + Send;
}
