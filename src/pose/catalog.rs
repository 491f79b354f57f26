//! Pose catalog: the ordered, immutable sequence of target poses
//!
//! Loaded once before the session starts. Classifier labels index into it.

use crate::error::{Result, TrainerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Display name used for labels outside the catalog
pub const UNKNOWN_POSE: &str = "Unknown pose";

/// One target pose
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseDefinition {
    /// Position in the sequence (also the classifier label)
    #[serde(skip)]
    pub index: usize,
    /// Human-readable pose name
    #[serde(alias = "display_name")]
    pub name: String,
    /// Reference image location shown next to the video
    #[serde(default)]
    pub reference_image: String,
}

/// Ordered pose sequence
#[derive(Clone, Debug)]
pub struct PoseCatalog {
    poses: Vec<PoseDefinition>,
}

impl PoseCatalog {
    /// Build a catalog from (name, reference image) pairs; order defines labels
    pub fn new<N, R>(entries: impl IntoIterator<Item = (N, R)>) -> Result<Self>
    where
        N: Into<String>,
        R: Into<String>,
    {
        let poses: Vec<PoseDefinition> = entries
            .into_iter()
            .enumerate()
            .map(|(index, (name, reference_image))| PoseDefinition {
                index,
                name: name.into(),
                reference_image: reference_image.into(),
            })
            .collect();

        if poses.is_empty() {
            return Err(TrainerError::Catalog("catalog has no poses".to_string()));
        }

        Ok(PoseCatalog { poses })
    }

    /// Load a catalog from a JSON array of `{ "name", "reference_image" }`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let entries: Vec<PoseDefinition> = serde_json::from_str(&content)?;

        if entries.iter().any(|p| p.name.trim().is_empty()) {
            return Err(TrainerError::Catalog(format!(
                "pose with empty name in {}",
                path.display()
            )));
        }

        Self::new(entries.into_iter().map(|p| (p.name, p.reference_image)))
    }

    /// Default six-pose yoga sequence
    pub fn yoga_sequence() -> Self {
        PoseCatalog {
            poses: [
                ("TADASANA (Mountain Pose)", "images/tadasana.png"),
                ("VIRABHADRASANA I (Warrior I)", "images/warrior-1.png"),
                ("VIRABHADRASANA II (Warrior II)", "images/warrior-2.png"),
                ("VRIKSHASANA (Tree Pose)", "images/tree.png"),
                ("TRIKONASANA (Triangle Pose)", "images/triangle.png"),
                ("ADHO MUKHA SVANASANA (Downward Dog)", "images/downward-dog.png"),
            ]
            .into_iter()
            .enumerate()
            .map(|(index, (name, image))| PoseDefinition {
                index,
                name: name.to_string(),
                reference_image: image.to_string(),
            })
            .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn get(&self, index: usize) -> Option<&PoseDefinition> {
        self.poses.get(index)
    }

    /// Name for a classifier label, or `UNKNOWN_POSE` when out of range
    pub fn display_name(&self, label: usize) -> &str {
        self.poses
            .get(label)
            .map(|p| p.name.as_str())
            .unwrap_or(UNKNOWN_POSE)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoseDefinition> {
        self.poses.iter()
    }
}
