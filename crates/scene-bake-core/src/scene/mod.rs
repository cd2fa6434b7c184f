//! Scene-graph provider interface and the data it hands to the baker
//!
//! The baker never parses asset bytes. It walks whatever implements
//! [`SceneGraph`]: node hierarchy, geometry, materials, poses and animated
//! transforms. [`SceneDocument`] is the in-memory provider loaded from JSON.

pub mod curve;
pub mod deformer;
pub mod document;
pub mod geometry;
pub mod material;

pub use curve::{AnimCurve, AnimatedVec3, Interpolation, Keyframe, Lerp};
pub use deformer::{
    BlendShape, BlendShapeChannel, Cluster, LinkMode, Pose, PoseEntry, Shape, Skin, SkinningType,
};
pub use document::{NodeRecord, SceneDocument};
pub use geometry::{LayerElement, MappingMode, MaterialElement, Mesh, ReferenceMode};
pub use material::{MaterialProperty, PropertyValue, SurfaceMaterial};

use crate::error::Result;
use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node within one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Identity of a material within one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A navigable, read-only scene graph
///
/// Lookups with an id the provider does not know return empty slices,
/// identity transforms or `None`; they never panic.
pub trait SceneGraph: Sync {
    /// The node traversal starts from
    fn root(&self) -> NodeId;

    /// Whether `node` names a node of this scene
    fn contains_node(&self, node: NodeId) -> bool;

    /// Child nodes in traversal order
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Parent node, `None` for the root
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Display name of a node
    fn node_name(&self, node: NodeId) -> &str;

    /// Geometry attached to a node
    ///
    /// Returns [`BakeError::InvalidMesh`](crate::BakeError::InvalidMesh) when
    /// the node declares geometry that cannot be resolved.
    fn node_geometry(&self, node: NodeId) -> Result<Option<&Mesh>>;

    /// Materials attached to a node
    fn materials(&self, node: NodeId) -> &[MaterialId];

    /// Material lookup by id
    fn material(&self, id: MaterialId) -> Option<&SurfaceMaterial>;

    /// Global transform from the node's animated local transform chain
    fn evaluate_global_transform(&self, node: NodeId, time: f64) -> DMat4;

    /// Geometric pivot translation
    fn geometric_translation(&self, node: NodeId) -> DVec3;

    /// Geometric pivot rotation, Euler degrees in XYZ order
    fn geometric_rotation(&self, node: NodeId) -> DVec3;

    /// Geometric pivot scaling
    fn geometric_scaling(&self, node: NodeId) -> DVec3;

    /// Bind and rest poses stored in the scene
    fn poses(&self) -> &[Pose];
}
