//! Keypoint data produced by the pose estimator
//!
//! Handles:
//! - Named joints with per-joint confidence
//! - The canonical 17-joint order the classifier was trained on
//! - Joint name normalization (`leftHip`, `left_hip`, `left-hip`)

use serde::{Deserialize, Serialize};

/// Canonical joint order (PoseNet, 17 joints → 34 features)
pub const CANONICAL_JOINTS: [&str; 17] = [
    "nose",
    "left-eye",
    "right-eye",
    "left-ear",
    "right-ear",
    "left-shoulder",
    "right-shoulder",
    "left-elbow",
    "right-elbow",
    "left-wrist",
    "right-wrist",
    "left-hip",
    "right-hip",
    "left-knee",
    "right-knee",
    "left-ankle",
    "right-ankle",
];

pub const LEFT_HIP: &str = "left-hip";
pub const RIGHT_HIP: &str = "right-hip";

/// A single named joint position
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Joint name as reported by the estimator
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Detection confidence (0.0-1.0)
    #[serde(alias = "score")]
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, x: f32, y: f32, confidence: f32) -> Self {
        Keypoint {
            name: name.into(),
            x,
            y,
            confidence,
        }
    }
}

/// All keypoints of one detected person in one frame
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeypointSet {
    pub keypoints: Vec<Keypoint>,
}

impl KeypointSet {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        KeypointSet { keypoints }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Shift every joint by a constant offset
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        KeypointSet {
            keypoints: self
                .keypoints
                .iter()
                .map(|kp| Keypoint::new(kp.name.clone(), kp.x + dx, kp.y + dy, kp.confidence))
                .collect(),
        }
    }
}

/// Normalize a joint name to kebab-case so estimator naming styles compare equal
pub fn joint_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 2);
    for c in name.trim().chars() {
        if c == '_' || c == ' ' || c == '-' {
            if !key.is_empty() && !key.ends_with('-') {
                key.push('-');
            }
        } else if c.is_uppercase() {
            if !key.is_empty() && !key.ends_with('-') {
                key.push('-');
            }
            key.extend(c.to_lowercase());
        } else {
            key.push(c);
        }
    }
    key
}
