//! In-memory scene provider loaded from a JSON document
//!
//! ```json
//! {
//!   "root": 0,
//!   "nodes": [
//!     { "name": "Root", "children": [1] },
//!     { "name": "Body", "mesh": 0, "materials": [0],
//!       "translation": { "value": [0, 1, 0] } }
//!   ],
//!   "meshes": [ { "name": "BodyShape", "control_points": [...], "polygons": [...] } ],
//!   "materials": [ { "name": "Skin", "properties": { ... } } ]
//! }
//! ```

use super::curve::AnimatedVec3;
use super::deformer::Pose;
use super::geometry::Mesh;
use super::material::SurfaceMaterial;
use super::{MaterialId, NodeId, SceneGraph};
use crate::error::{BakeError, Result};
use crate::math::from_trs_degrees;
use glam::{DMat4, DVec3};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

fn zero_vec3() -> AnimatedVec3 {
    AnimatedVec3::constant(DVec3::ZERO)
}

fn one_vec3() -> AnimatedVec3 {
    AnimatedVec3::constant(DVec3::ONE)
}

fn one() -> DVec3 {
    DVec3::ONE
}

/// A node of the document hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Index into [`SceneDocument::meshes`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(default)]
    pub materials: Vec<MaterialId>,
    #[serde(default = "zero_vec3")]
    pub translation: AnimatedVec3,
    /// Euler degrees, XYZ order
    #[serde(default = "zero_vec3")]
    pub rotation: AnimatedVec3,
    #[serde(default = "one_vec3")]
    pub scaling: AnimatedVec3,
    #[serde(default)]
    pub geometric_translation: DVec3,
    #[serde(default)]
    pub geometric_rotation: DVec3,
    #[serde(default = "one")]
    pub geometric_scaling: DVec3,
}

impl NodeRecord {
    /// An untransformed node with no children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            mesh: None,
            materials: Vec::new(),
            translation: zero_vec3(),
            rotation: zero_vec3(),
            scaling: one_vec3(),
            geometric_translation: DVec3::ZERO,
            geometric_rotation: DVec3::ZERO,
            geometric_scaling: DVec3::ONE,
        }
    }

    /// Local `T * R * S` at `time`
    pub fn local_transform(&self, time: f64) -> DMat4 {
        from_trs_degrees(
            self.translation.evaluate(time),
            self.rotation.evaluate(time),
            self.scaling.evaluate(time),
        )
    }
}

/// A complete scene held in memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub root: NodeId,
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub materials: Vec<SurfaceMaterial>,
    #[serde(default)]
    pub poses: Vec<Pose>,
    /// Rebuilt from `children` by [`SceneDocument::validate`]
    #[serde(skip)]
    parents: Vec<Option<NodeId>>,
}

impl SceneDocument {
    /// Assemble and validate a document
    pub fn new(
        root: NodeId,
        nodes: Vec<NodeRecord>,
        meshes: Vec<Mesh>,
        materials: Vec<SurfaceMaterial>,
        poses: Vec<Pose>,
    ) -> Result<Self> {
        let mut document = Self {
            root,
            nodes,
            meshes,
            materials,
            poses,
            parents: Vec::new(),
        };
        document.validate()?;
        Ok(document)
    }

    /// Parse and validate a document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut document: Self = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Parse and validate a document from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut document: Self = serde_json::from_reader(reader)?;
        document.validate()?;
        Ok(document)
    }

    /// Parse and validate a document from a file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Check every cross reference, rebuild the parent table and
    /// fan-triangulate mesh polygons with more than three corners
    ///
    /// Mesh indices are deliberately not checked here: a node whose mesh
    /// cannot be resolved is reported by [`SceneGraph::node_geometry`] and
    /// skipped during baking.
    pub fn validate(&mut self) -> Result<()> {
        let count = self.nodes.len();
        if count == 0 {
            return Err(BakeError::InvalidScene("scene has no nodes".to_string()));
        }
        if self.root.0 >= count {
            return Err(BakeError::InvalidScene(format!(
                "root {} out of range ({count} nodes)",
                self.root
            )));
        }

        let mut parents = vec![None; count];
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if child.0 >= count {
                    return Err(BakeError::InvalidScene(format!(
                        "node '{}' lists missing child {child}",
                        node.name
                    )));
                }
                if child == self.root {
                    return Err(BakeError::InvalidScene(format!(
                        "root node is listed as a child of '{}'",
                        node.name
                    )));
                }
                if parents[child.0].replace(NodeId(index)).is_some() {
                    return Err(BakeError::InvalidScene(format!(
                        "node '{}' is reachable more than once",
                        self.nodes[child.0].name
                    )));
                }
            }

            if let Some(material) = node.materials.iter().find(|m| m.0 >= self.materials.len()) {
                return Err(BakeError::InvalidScene(format!(
                    "node '{}' references missing material {material}",
                    node.name
                )));
            }
        }

        // With unique parents, a parent chain longer than the node count loops
        for start in 0..count {
            let mut current = parents[start];
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if steps > count {
                    return Err(BakeError::InvalidScene(format!(
                        "node '{}' is part of a cycle",
                        self.nodes[start].name
                    )));
                }
                current = parents[parent.0];
            }
        }

        for pose in &self.poses {
            if let Some(entry) = pose.entries.iter().find(|entry| entry.node.0 >= count) {
                return Err(BakeError::InvalidScene(format!(
                    "pose '{}' references missing node {}",
                    pose.name, entry.node
                )));
            }
        }

        for mesh in &mut self.meshes {
            let split = mesh.triangulate();
            if split > 0 {
                debug!("Triangulated {split} polygons of mesh '{}'", mesh.name);
            }
        }

        debug!(
            "Validated scene: {} nodes, {} meshes, {} materials, {} poses",
            count,
            self.meshes.len(),
            self.materials.len(),
            self.poses.len()
        );

        self.parents = parents;
        Ok(())
    }

    pub fn node(&self, node: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(node.0)
    }

    /// Find a node by name
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }
}

impl SceneGraph for SceneDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains_node(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(node.0).copied().flatten()
    }

    fn node_name(&self, node: NodeId) -> &str {
        self.node(node).map_or("", |n| n.name.as_str())
    }

    fn node_geometry(&self, node: NodeId) -> Result<Option<&Mesh>> {
        let Some(record) = self.node(node) else {
            return Ok(None);
        };
        match record.mesh {
            None => Ok(None),
            Some(index) => self.meshes.get(index).map(Some).ok_or_else(|| {
                BakeError::InvalidMesh {
                    node: record.name.clone(),
                    reason: format!(
                        "mesh index {index} out of range ({} meshes)",
                        self.meshes.len()
                    ),
                }
            }),
        }
    }

    fn materials(&self, node: NodeId) -> &[MaterialId] {
        self.node(node).map_or(&[], |n| n.materials.as_slice())
    }

    fn material(&self, id: MaterialId) -> Option<&SurfaceMaterial> {
        self.materials.get(id.0)
    }

    fn evaluate_global_transform(&self, node: NodeId, time: f64) -> DMat4 {
        let mut global = DMat4::IDENTITY;
        let mut current = Some(node);
        let mut depth = 0;

        // Bounded walk so an unvalidated document cannot loop forever
        while let Some(id) = current {
            let Some(record) = self.node(id) else {
                break;
            };
            global = record.local_transform(time) * global;
            current = self.parent(id);
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
        }

        global
    }

    fn geometric_translation(&self, node: NodeId) -> DVec3 {
        self.node(node)
            .map_or(DVec3::ZERO, |n| n.geometric_translation)
    }

    fn geometric_rotation(&self, node: NodeId) -> DVec3 {
        self.node(node).map_or(DVec3::ZERO, |n| n.geometric_rotation)
    }

    fn geometric_scaling(&self, node: NodeId) -> DVec3 {
        self.node(node).map_or(DVec3::ONE, |n| n.geometric_scaling)
    }

    fn poses(&self) -> &[Pose] {
        &self.poses
    }
}
