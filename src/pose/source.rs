//! Pose sources: the single-slot latest detection and a replay publisher
//!
//! Features:
//! - `LatestPose`: last-write-wins cell shared between producer and scheduler
//! - `ReplayFeed`: JSON-lines recording of estimator output
//! - Publisher task that plays a feed into the slot at frame rate

use super::keypoint::KeypointSet;
use crate::error::{Result, TrainerError};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Pull-based pose source; never blocks, always returns the most recent detection
pub trait PoseSource {
    fn poll(&self) -> Option<KeypointSet>;
}

/// Single-slot cell holding the latest detection (or `None` for no person)
#[derive(Clone, Default)]
pub struct LatestPose {
    slot: Arc<Mutex<Option<KeypointSet>>>,
}

impl LatestPose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot; stale values are simply replaced
    pub fn publish(&self, pose: Option<KeypointSet>) {
        *self.slot.lock() = pose;
    }
}

impl PoseSource for LatestPose {
    fn poll(&self) -> Option<KeypointSet> {
        self.slot.lock().clone()
    }
}

/// One recorded line: a bare keypoint array, a `{ "keypoints": [...] }` object, or null
#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Set(KeypointSet),
    Bare(Vec<super::keypoint::Keypoint>),
    Absent(Option<()>),
}

/// Recorded sequence of estimator frames
#[derive(Clone, Debug)]
pub struct ReplayFeed {
    frames: Vec<Option<KeypointSet>>,
}

impl ReplayFeed {
    pub fn new(frames: Vec<Option<KeypointSet>>) -> Result<Self> {
        if frames.is_empty() {
            return Err(TrainerError::Replay("replay contains no frames".to_string()));
        }
        Ok(ReplayFeed { frames })
    }

    /// Parse JSON-lines text; malformed lines are skipped
    pub fn parse(content: &str) -> Result<Self> {
        let mut frames = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ReplayLine>(line) {
                Ok(ReplayLine::Set(set)) => frames.push(Some(set)),
                Ok(ReplayLine::Bare(keypoints)) => frames.push(Some(KeypointSet::new(keypoints))),
                Ok(ReplayLine::Absent(_)) => frames.push(None),
                Err(e) => warn!("Skipping replay line {}: {}", line_no + 1, e),
            }
        }
        Self::new(frames)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&KeypointSet> {
        self.frames[index % self.frames.len()].as_ref()
    }
}

/// Add uniform noise in `[-amount, amount]` to every coordinate
pub fn jitter_frame<R: Rng>(pose: &KeypointSet, amount: f32, rng: &mut R) -> KeypointSet {
    if amount <= 0.0 {
        return pose.clone();
    }
    let mut jittered = pose.clone();
    for kp in jittered.keypoints.iter_mut() {
        kp.x += rng.gen_range(-amount..=amount);
        kp.y += rng.gen_range(-amount..=amount);
    }
    jittered
}

/// Play a feed into the slot forever, looping; abort the handle to stop
pub fn spawn_replay(
    feed: ReplayFeed,
    slot: LatestPose,
    frame_interval: Duration,
    jitter: f32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut ticker = tokio::time::interval(frame_interval);
        let mut index = 0usize;
        debug!("Replay started: {} frames", feed.len());
        loop {
            ticker.tick().await;
            let frame = feed.frame(index).map(|p| jitter_frame(p, jitter, &mut rng));
            slot.publish(frame);
            index = index.wrapping_add(1);
        }
    })
}
