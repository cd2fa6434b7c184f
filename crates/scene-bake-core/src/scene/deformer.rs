//! Skin, blend-shape and pose data attached to meshes and scenes

use super::NodeId;
use super::curve::AnimCurve;
use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

fn identity() -> DMat4 {
    DMat4::IDENTITY
}

/// Skinning representation selected for a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinningType {
    /// Treated as linear
    Rigid,
    /// Weighted 4x4 matrix blend
    #[default]
    Linear,
    /// Weighted unit dual quaternion blend
    DualQuaternion,
    /// Per-vertex mix of dual quaternion and linear results
    Blend,
}

/// How cluster weights combine for one mesh
///
/// Every cluster of a mesh shares the mode of the mesh's first skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// Divide by the accumulated weight
    #[default]
    Normalize,
    /// Fill the missing weight with the undeformed position
    TotalOne,
    /// Layer cluster deformations on top of each other
    Additive,
}

/// A bone binding: one link node and the control points it drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub link: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associate_model: Option<NodeId>,
    /// Global transform of the mesh at bind time
    #[serde(default = "identity")]
    pub transform: DMat4,
    /// Global transform of the link at bind time
    #[serde(default = "identity")]
    pub transform_link: DMat4,
    /// Global transform of the associate model at bind time
    #[serde(default = "identity")]
    pub transform_associate_model: DMat4,
    pub indices: Vec<usize>,
    pub weights: Vec<f64>,
}

impl Cluster {
    /// A cluster bound to `link` with identity bind transforms
    pub fn new(link: NodeId, indices: Vec<usize>, weights: Vec<f64>) -> Self {
        Self {
            link: Some(link),
            associate_model: None,
            transform: DMat4::IDENTITY,
            transform_link: DMat4::IDENTITY,
            transform_associate_model: DMat4::IDENTITY,
            indices,
            weights,
        }
    }

    /// `(control point, weight)` pairs
    pub fn influences(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.weights.iter().copied())
    }
}

/// A skin deformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skin {
    #[serde(default)]
    pub skinning_type: SkinningType,
    #[serde(default)]
    pub link_mode: LinkMode,
    pub clusters: Vec<Cluster>,
    /// Per control point dual quaternion share used by [`SkinningType::Blend`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blend_weights: Vec<f64>,
}

/// A target shape: a full alternate set of control points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    pub control_points: Vec<DVec3>,
}

/// One blend-shape channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShapeChannel {
    pub name: String,
    /// Influence in percent; no curve means no contribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<AnimCurve<f64>>,
    pub targets: Vec<Shape>,
    /// Ascending full-weight thresholds, one per target
    pub full_weights: Vec<f64>,
}

/// A blend-shape deformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub channels: Vec<BlendShapeChannel>,
}

/// A stored node matrix inside a pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEntry {
    pub node: NodeId,
    pub matrix: DMat4,
    /// Matrix is relative to the node's parent
    #[serde(default)]
    pub local: bool,
}

/// A bind or rest pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub name: String,
    #[serde(default)]
    pub bind_pose: bool,
    pub entries: Vec<PoseEntry>,
}

impl Pose {
    /// Entry index for a node
    pub fn find(&self, node: NodeId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.node == node)
    }

    pub fn is_bind_pose(&self) -> bool {
        self.bind_pose
    }

    pub fn is_local_matrix(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|entry| entry.local)
    }

    pub fn matrix(&self, index: usize) -> Option<DMat4> {
        self.entries.get(index).map(|entry| entry.matrix)
    }
}
