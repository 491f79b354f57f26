//! Feature normalization: keypoints → translation-invariant feature vector
//!
//! Every joint is expressed relative to the hip midpoint, two floats per
//! joint, in canonical joint order. Output is either empty (undetectable) or
//! exactly `2 * joints` long.

use super::keypoint::{joint_key, Keypoint, KeypointSet, CANONICAL_JOINTS, LEFT_HIP, RIGHT_HIP};
use rustc_hash::FxHashMap;

/// Minimum confidence for a hip joint to anchor the reference point
pub const MIN_REFERENCE_CONFIDENCE: f32 = 0.2;

/// Normalized classifier input; never partially populated
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn empty() -> Self {
        FeatureVector(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Converts a keypoint set into a fixed-length feature vector
#[derive(Clone, Debug)]
pub struct FeatureNormalizer {
    /// Canonical joint order (kebab-case keys)
    joints: Vec<String>,
    /// Joints whose midpoint is the reference point
    reference: (String, String),
    min_reference_confidence: f32,
}

impl FeatureNormalizer {
    pub fn new(joints: &[String], reference: (&str, &str), min_reference_confidence: f32) -> Self {
        FeatureNormalizer {
            joints: joints.iter().map(|j| joint_key(j)).collect(),
            reference: (joint_key(reference.0), joint_key(reference.1)),
            min_reference_confidence,
        }
    }

    /// Number of features produced for a detectable pose
    pub fn feature_len(&self) -> usize {
        self.joints.len() * 2
    }

    /// Normalize a keypoint set; returns the empty vector when the pose can't be anchored
    pub fn normalize(&self, pose: Option<&KeypointSet>) -> FeatureVector {
        let pose = match pose {
            Some(p) if !p.is_empty() => p,
            _ => return FeatureVector::empty(),
        };

        // First occurrence wins for duplicated names
        let mut by_name: FxHashMap<String, &Keypoint> = FxHashMap::default();
        for kp in &pose.keypoints {
            by_name.entry(joint_key(&kp.name)).or_insert(kp);
        }

        let anchor = |name: &str| {
            by_name
                .get(name)
                .filter(|kp| kp.confidence >= self.min_reference_confidence)
                .copied()
        };
        let (left, right) = match (anchor(&self.reference.0), anchor(&self.reference.1)) {
            (Some(l), Some(r)) => (l, r),
            _ => return FeatureVector::empty(),
        };

        let ref_x = (left.x + right.x) / 2.0;
        let ref_y = (left.y + right.y) / 2.0;

        let mut features = Vec::with_capacity(self.feature_len());
        for joint in &self.joints {
            match by_name.get(joint) {
                Some(kp) => {
                    features.push(kp.x - ref_x);
                    features.push(kp.y - ref_y);
                }
                // A slot can't be filled honestly; treat the pose as undetectable
                None => return FeatureVector::empty(),
            }
        }

        FeatureVector(features)
    }
}

impl Default for FeatureNormalizer {
    fn default() -> Self {
        let joints: Vec<String> = CANONICAL_JOINTS.iter().map(|j| j.to_string()).collect();
        FeatureNormalizer::new(&joints, (LEFT_HIP, RIGHT_HIP), MIN_REFERENCE_CONFIDENCE)
    }
}
