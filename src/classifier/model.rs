//! Candle pose classifier
//!
//! Two-layer perceptron over normalized keypoint features:
//! input (34) → hidden (ReLU) → classes (softmax).
//! Weights are stored as bincode `(ModelConfig, Vec<f32>)` with the flat
//! layout `w1 (hidden × input) | b1 | w2 (classes × hidden) | b2`.

use super::{ClassifierError, PoseClassifier, Prediction};
use crate::error::{Result, TrainerError};
use candle_core::{Device, Tensor, D};
use candle_nn::{Linear, Module};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Network dimensions
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_classes: usize,
}

impl ModelConfig {
    /// Number of flat weights this layout expects
    pub fn parameter_count(&self) -> usize {
        self.hidden_size * self.input_size
            + self.hidden_size
            + self.num_classes * self.hidden_size
            + self.num_classes
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            input_size: 34,
            hidden_size: 64,
            num_classes: 6,
        }
    }
}

struct Layers {
    hidden: Linear,
    output: Linear,
}

/// Pose classifier backed by Candle tensors
pub struct CandleClassifier {
    config: ModelConfig,
    device: Device,
    layers: Option<Layers>,
}

impl CandleClassifier {
    /// Classifier without weights; every request reports `Unavailable`
    pub fn unloaded(config: ModelConfig) -> Self {
        CandleClassifier {
            config,
            device: Device::Cpu,
            layers: None,
        }
    }

    /// Build from a flat weight vector
    pub fn from_weights(config: ModelConfig, weights: &[f32]) -> Result<Self> {
        let expected = config.parameter_count();
        if weights.len() != expected {
            return Err(TrainerError::Model(format!(
                "expected {} weights for {:?}, got {}",
                expected,
                config,
                weights.len()
            )));
        }

        let device = Device::Cpu;
        let (i, h, c) = (config.input_size, config.hidden_size, config.num_classes);

        let (w1, rest) = weights.split_at(h * i);
        let (b1, rest) = rest.split_at(h);
        let (w2, b2) = rest.split_at(c * h);

        let w1 = Tensor::from_slice(w1, (h, i), &device)?;
        let b1 = Tensor::from_slice(b1, h, &device)?;
        let w2 = Tensor::from_slice(w2, (c, h), &device)?;
        let b2 = Tensor::from_slice(b2, c, &device)?;

        Ok(CandleClassifier {
            config,
            device,
            layers: Some(Layers {
                hidden: Linear::new(w1, Some(b1)),
                output: Linear::new(w2, Some(b2)),
            }),
        })
    }

    /// Load weights from a bincode file; a missing file yields an unloaded classifier
    pub fn load(weights_path: impl AsRef<Path>) -> Result<Self> {
        let path = weights_path.as_ref();
        if !path.exists() {
            warn!("Model weights not found at {}, classifier unavailable", path.display());
            return Ok(Self::unloaded(ModelConfig::default()));
        }

        let bytes = fs::read(path)?;
        let (config, weights): (ModelConfig, Vec<f32>) = bincode::deserialize(&bytes)?;
        info!(
            "Loaded pose classifier from {} ({} inputs, {} hidden, {} classes)",
            path.display(),
            config.input_size,
            config.hidden_size,
            config.num_classes
        );
        Self::from_weights(config, &weights)
    }

    /// Write weights in the format `load` reads
    #[cfg(test)]
    pub fn save_weights(
        config: &ModelConfig,
        weights: &[f32],
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let bytes = bincode::serialize(&(config, weights))?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.layers.is_some()
    }

    /// Forward pass; returns class probabilities ranked best first
    pub fn predict(&self, features: &[f32]) -> std::result::Result<Vec<Prediction>, ClassifierError> {
        let layers = self
            .layers
            .as_ref()
            .ok_or_else(|| ClassifierError::Unavailable("no weights loaded".to_string()))?;

        if features.len() != self.config.input_size {
            return Err(ClassifierError::InputSize {
                expected: self.config.input_size,
                got: features.len(),
            });
        }

        let input = Tensor::from_slice(features, (1, features.len()), &self.device)?;
        let hidden = layers.hidden.forward(&input)?.relu()?;
        let logits = layers.output.forward(&hidden)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;

        let mut ranked: Vec<Prediction> = probs
            .into_iter()
            .enumerate()
            .map(|(label, confidence)| Prediction { label, confidence })
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(ranked)
    }
}

impl PoseClassifier for CandleClassifier {
    async fn classify(
        &mut self,
        features: &[f32],
    ) -> std::result::Result<Vec<Prediction>, ClassifierError> {
        self.predict(features)
    }
}
