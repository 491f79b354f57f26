//! Classification gate: one classifier call per tick, failures collapse to `Inconclusive`
//!
//! Empty feature vectors never reach the classifier. Errors, empty or
//! malformed results and (optional) timeouts all become `Inconclusive`, so the
//! session state machine only ever sees a closed input domain.
//! `classify` takes `&mut self`, so a gate can never have two calls in flight.

use super::{PoseClassifier, Prediction};
use crate::pose::FeatureVector;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of one gated classification
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClassificationOutcome {
    /// Best-ranked label with its confidence
    Decided { label: usize, confidence: f32 },
    /// No person, bad detection, classifier failure or malformed answer
    Inconclusive,
}

impl ClassificationOutcome {
    pub fn decided(label: usize, confidence: f32) -> Self {
        ClassificationOutcome::Decided { label, confidence }
    }

    pub fn is_inconclusive(&self) -> bool {
        matches!(self, ClassificationOutcome::Inconclusive)
    }
}

/// Wraps a classifier handle
pub struct ClassificationGate<C> {
    classifier: C,
    timeout: Option<Duration>,
}

impl<C: PoseClassifier> ClassificationGate<C> {
    pub fn new(classifier: C) -> Self {
        ClassificationGate {
            classifier,
            timeout: None,
        }
    }

    /// Treat calls that run longer than `limit` as inconclusive
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    #[cfg(test)]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Classify one feature vector
    pub async fn classify(&mut self, features: &FeatureVector) -> ClassificationOutcome {
        if features.is_empty() {
            debug!("Empty feature vector, skipping classifier");
            return ClassificationOutcome::Inconclusive;
        }

        let call = self.classifier.classify(features.as_slice());
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Classifier timed out after {:?}", limit);
                    return ClassificationOutcome::Inconclusive;
                }
            },
            None => call.await,
        };

        match result {
            Ok(predictions) => Self::best(&predictions),
            Err(e) => {
                warn!("Classification error: {}", e);
                ClassificationOutcome::Inconclusive
            }
        }
    }

    fn best(predictions: &[Prediction]) -> ClassificationOutcome {
        match predictions.first() {
            Some(p) if p.confidence.is_finite() && (0.0..=1.0).contains(&p.confidence) => {
                ClassificationOutcome::decided(p.label, p.confidence)
            }
            Some(p) => {
                warn!("Malformed classifier confidence: {}", p.confidence);
                ClassificationOutcome::Inconclusive
            }
            None => {
                debug!("Classifier returned no predictions");
                ClassificationOutcome::Inconclusive
            }
        }
    }
}
