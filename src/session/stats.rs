//! Per-run session statistics and pose confusion tracking
//!
//! Tracks:
//! - Tick counts by feedback kind
//! - Poses completed and round resets
//! - Which wrong poses get detected for each target (confusions)
//!
//! Kept in memory for the end-of-session summary only.

use super::feedback::{FeedbackKind, FeedbackSignal};
use crate::classifier::ClassificationOutcome;
use rustc_hash::FxHashMap;
use std::time::Instant;

/// Minimum occurrences before a confusion is reported
const CONFUSION_THRESHOLD: u32 = 3;

/// Counts target → detected-wrong-pose pairs
#[derive(Clone, Debug, Default)]
pub struct PoseConfusions {
    pairs: FxHashMap<usize, FxHashMap<usize, u32>>,
}

impl PoseConfusions {
    pub fn record(&mut self, target: usize, detected: usize) {
        if target == detected {
            return;
        }
        *self
            .pairs
            .entry(target)
            .or_default()
            .entry(detected)
            .or_insert(0) += 1;
    }

    pub fn count(&self, target: usize, detected: usize) -> u32 {
        self.pairs
            .get(&target)
            .and_then(|m| m.get(&detected))
            .copied()
            .unwrap_or(0)
    }

    /// Pairs seen at least `CONFUSION_THRESHOLD` times, most frequent first
    pub fn persistent(&self) -> Vec<((usize, usize), u32)> {
        let mut pairs: Vec<((usize, usize), u32)> = self
            .pairs
            .iter()
            .flat_map(|(&target, detected)| {
                detected
                    .iter()
                    .filter(|(_, &count)| count >= CONFUSION_THRESHOLD)
                    .map(move |(&d, &count)| ((target, d), count))
            })
            .collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        pairs
    }
}

/// Running totals for one session
#[derive(Clone, Debug)]
pub struct SessionStats {
    pub ticks: u32,
    pub inconclusive: u32,
    pub low_confidence: u32,
    pub correct: u32,
    pub wrong: u32,
    pub resets: u32,
    pub poses_completed: u32,
    pub confusions: PoseConfusions,
    started: Instant,
}

impl SessionStats {
    pub fn new() -> Self {
        SessionStats {
            ticks: 0,
            inconclusive: 0,
            low_confidence: 0,
            correct: 0,
            wrong: 0,
            resets: 0,
            poses_completed: 0,
            confusions: PoseConfusions::default(),
            started: Instant::now(),
        }
    }

    /// Record one transition for the given target
    pub fn record(&mut self, target: usize, outcome: ClassificationOutcome, feedback: &FeedbackSignal) {
        self.ticks += 1;
        match feedback.kind {
            FeedbackKind::LowConfidence if outcome.is_inconclusive() => self.inconclusive += 1,
            FeedbackKind::LowConfidence => self.low_confidence += 1,
            FeedbackKind::Holding => self.correct += 1,
            FeedbackKind::Advanced | FeedbackKind::Finished => {
                self.correct += 1;
                self.poses_completed += 1;
            }
            FeedbackKind::WrongPose | FeedbackKind::ErrorReset => {
                self.wrong += 1;
                if feedback.kind == FeedbackKind::ErrorReset {
                    self.resets += 1;
                }
                if let ClassificationOutcome::Decided { label, .. } = outcome {
                    self.confusions.record(target, label);
                }
            }
            FeedbackKind::Ready => {}
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Share of decided ticks that matched the target
    pub fn accuracy(&self) -> f32 {
        let decided = self.correct + self.wrong;
        if decided == 0 {
            0.0
        } else {
            self.correct as f32 / decided as f32
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
