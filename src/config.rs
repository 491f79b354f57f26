//! Configuration: session thresholds, schedule cadence and file locations
//!
//! Loaded from TOML; every section and field falls back to its default.

use crate::error::{Result, TrainerError};
use crate::pose::{joint_key, CANONICAL_JOINTS, LEFT_HIP, MIN_REFERENCE_CONFIDENCE, RIGHT_HIP};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the countdown display is driven
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountdownMode {
    /// `round_seconds - hold_progress`, updated on correct ticks
    Tick,
    /// Decremented by a separate one-second timer
    WallClock,
}

impl std::str::FromStr for CountdownMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tick" => Ok(CountdownMode::Tick),
            "wall-clock" | "wallclock" => Ok(CountdownMode::WallClock),
            other => Err(format!("unknown countdown mode: {}", other)),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub normalizer: NormalizerConfig,
    pub schedule: ScheduleConfig,
    pub model: ModelPaths,
    pub catalog: CatalogPaths,
    pub replay: ReplayConfig,
}

/// Session state machine thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Consecutive correct ticks needed to advance
    pub hold_threshold: u32,
    /// Consecutive confidently-wrong ticks that reset the round
    pub error_threshold: u32,
    /// Minimum confidence for a label to count
    pub acceptance_confidence: f32,
    /// Countdown start value
    pub round_seconds: u32,
    pub countdown: CountdownMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            hold_threshold: 30,
            error_threshold: 4,
            acceptance_confidence: 0.75,
            round_seconds: 30,
            countdown: CountdownMode::Tick,
        }
    }
}

/// Feature normalizer joints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub min_reference_confidence: f32,
    pub reference_joints: [String; 2],
    /// Canonical joint order; defines feature slots
    pub joints: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        NormalizerConfig {
            min_reference_confidence: MIN_REFERENCE_CONFIDENCE,
            reference_joints: [LEFT_HIP.to_string(), RIGHT_HIP.to_string()],
            joints: CANONICAL_JOINTS.iter().map(|j| j.to_string()).collect(),
        }
    }
}

/// Scheduler cadence (milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Wait after a decided tick
    pub classify_interval_ms: u64,
    /// Wait after an inconclusive tick
    pub retry_interval_ms: u64,
    /// Wait after advancing to the next pose
    pub advance_pause_ms: u64,
    /// Wall-clock countdown period
    pub clock_interval_ms: u64,
    /// Classifier call limit; none means wait indefinitely
    pub classifier_timeout_ms: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            classify_interval_ms: 700,
            retry_interval_ms: 500,
            advance_pause_ms: 1500,
            clock_interval_ms: 1000,
            classifier_timeout_ms: None,
        }
    }
}

impl ScheduleConfig {
    pub fn classify_interval(&self) -> Duration {
        Duration::from_millis(self.classify_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn advance_pause(&self) -> Duration {
        Duration::from_millis(self.advance_pause_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }

    pub fn classifier_timeout(&self) -> Option<Duration> {
        self.classifier_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub path: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        ModelPaths {
            path: PathBuf::from("models/pose_classifier.bin"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPaths {
    /// JSON pose list; built-in yoga sequence when absent
    pub path: Option<PathBuf>,
}

/// Pose stream replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub frame_interval_ms: u64,
    /// Uniform coordinate noise added to each replayed frame
    pub jitter: f32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            frame_interval_ms: 33,
            jitter: 0.0,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load if the file exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            Some(p) => Err(TrainerError::Config(format!(
                "config file not found: {}",
                p.display()
            ))),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.session;
        if s.hold_threshold == 0 || s.error_threshold == 0 {
            return Err(TrainerError::Config(
                "hold_threshold and error_threshold must be at least 1".to_string(),
            ));
        }
        if !(s.acceptance_confidence > 0.0 && s.acceptance_confidence <= 1.0) {
            return Err(TrainerError::Config(format!(
                "acceptance_confidence must be in (0, 1], got {}",
                s.acceptance_confidence
            )));
        }

        let n = &self.normalizer;
        if !(0.0..=1.0).contains(&n.min_reference_confidence) {
            return Err(TrainerError::Config(format!(
                "min_reference_confidence must be in [0, 1], got {}",
                n.min_reference_confidence
            )));
        }
        let keys: Vec<String> = n.joints.iter().map(|j| joint_key(j)).collect();
        for reference in &n.reference_joints {
            if !keys.contains(&joint_key(reference)) {
                return Err(TrainerError::Config(format!(
                    "reference joint {} is not in the joint list",
                    reference
                )));
            }
        }

        let c = &self.schedule;
        if c.classify_interval_ms == 0
            || c.retry_interval_ms == 0
            || c.clock_interval_ms == 0
            || c.classifier_timeout_ms == Some(0)
        {
            return Err(TrainerError::Config(
                "schedule intervals must be non-zero".to_string(),
            ));
        }
        if self.replay.frame_interval_ms == 0 {
            return Err(TrainerError::Config(
                "replay frame_interval_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The joint list must produce exactly the classifier's input width
    pub fn check_feature_width(&self, input_size: usize) -> Result<()> {
        let width = 2 * self.normalizer.joints.len();
        if width != input_size {
            return Err(TrainerError::Config(format!(
                "{} joints give {} features but the classifier expects {}",
                self.normalizer.joints.len(),
                width,
                input_size
            )));
        }
        Ok(())
    }
}
