//! Scripted classifier for tests

use super::{ClassifierError, PoseClassifier, Prediction};
use std::collections::VecDeque;
use std::time::Duration;

/// Replays queued answers in order; answers with no predictions once drained
pub struct ScriptedClassifier {
    responses: VecDeque<Result<Vec<Prediction>, ClassifierError>>,
    delay: Option<Duration>,
    calls: usize,
}

impl ScriptedClassifier {
    pub fn new(responses: Vec<Result<Vec<Prediction>, ClassifierError>>) -> Self {
        ScriptedClassifier {
            responses: responses.into(),
            delay: None,
            calls: 0,
        }
    }

    /// `count` identical single-prediction answers
    pub fn repeating(label: usize, confidence: f32, count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|_| Ok(vec![Prediction { label, confidence }]))
                .collect(),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl PoseClassifier for ScriptedClassifier {
    async fn classify(&mut self, _features: &[f32]) -> Result<Vec<Prediction>, ClassifierError> {
        self.calls += 1;
        let response = self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}
