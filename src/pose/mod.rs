//! Pose Module: keypoints, feature normalization, pose catalog and sources
//!
//! # Components
//! - `keypoint.rs`: Keypoint / KeypointSet and canonical joint order
//! - `normalizer.rs`: Hip-relative feature vectors
//! - `catalog.rs`: Ordered target pose sequence
//! - `source.rs`: Latest-pose slot and replay publisher

pub mod catalog;
pub mod keypoint;
pub mod normalizer;
pub mod source;

pub use catalog::PoseCatalog;
pub use keypoint::{joint_key, CANONICAL_JOINTS, LEFT_HIP, RIGHT_HIP};
pub use normalizer::{FeatureNormalizer, FeatureVector, MIN_REFERENCE_CONFIDENCE};
pub use source::{spawn_replay, LatestPose, PoseSource, ReplayFeed};
