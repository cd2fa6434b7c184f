//! Mesh geometry as exposed by a scene provider

use super::deformer::{BlendShape, Skin};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// How a layer element's values map onto the mesh surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    /// The channel carries no data
    #[default]
    None,
    /// One value per control point
    ByControlPoint,
    /// One value per polygon corner, in polygon order
    ByPolygonVertex,
    /// One value per polygon
    ByPolygon,
    /// One value per edge
    ByEdge,
    /// A single value for the whole surface
    AllSame,
}

/// How values are addressed inside a layer element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// The n-th mapped element is `direct[n]`
    #[default]
    Direct,
    /// The n-th mapped element is `direct[index[n]]`
    IndexToDirect,
}

/// A per-surface attribute channel such as normals or UVs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerElement<T> {
    pub mapping: MappingMode,
    #[serde(default)]
    pub reference: ReferenceMode,
    pub direct: Vec<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<usize>,
}

impl<T: Copy> LayerElement<T> {
    /// Channel with values addressed directly
    pub fn direct(mapping: MappingMode, direct: Vec<T>) -> Self {
        Self {
            mapping,
            reference: ReferenceMode::Direct,
            direct,
            index: Vec::new(),
        }
    }

    /// Channel with values addressed through an index array
    pub fn indexed(mapping: MappingMode, direct: Vec<T>, index: Vec<usize>) -> Self {
        Self {
            mapping,
            reference: ReferenceMode::IndexToDirect,
            direct,
            index,
        }
    }

    /// Resolve the value of the n-th mapped element
    ///
    /// Returns `None` if `n` or the index it resolves through is out of range.
    pub fn value_at(&self, n: usize) -> Option<T> {
        let slot = match self.reference {
            ReferenceMode::Direct => n,
            ReferenceMode::IndexToDirect => *self.index.get(n)?,
        };
        self.direct.get(slot).copied()
    }

    /// Rebuild the channel so its n-th mapped element is the old `slots[n]`-th
    ///
    /// Stops at the first slot the old channel could not address, so a short
    /// channel stays short and is still reported when packed.
    fn remap(&mut self, slots: &[usize]) {
        match self.reference {
            ReferenceMode::Direct => {
                self.direct = slots
                    .iter()
                    .map_while(|&slot| self.direct.get(slot).copied())
                    .collect();
            }
            ReferenceMode::IndexToDirect => {
                self.index = slots
                    .iter()
                    .map_while(|&slot| self.index.get(slot).copied())
                    .collect();
            }
        }
    }

    fn follow_triangulation(&mut self, corner_slots: &[usize], polygon_slots: &[usize]) {
        match self.mapping {
            MappingMode::ByPolygonVertex => self.remap(corner_slots),
            MappingMode::ByPolygon => self.remap(polygon_slots),
            _ => {}
        }
    }
}

/// Per-polygon material assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialElement {
    pub mapping: MappingMode,
    pub indices: Vec<usize>,
}

impl MaterialElement {
    /// Per-polygon indices, if they can partition a mesh of `polygon_count` polygons
    pub fn polygon_indices(&self, polygon_count: usize) -> Option<&[usize]> {
        (self.mapping == MappingMode::ByPolygon && self.indices.len() == polygon_count)
            .then_some(self.indices.as_slice())
    }
}

/// Mesh geometry attached to a node
///
/// The packer only accepts triangles. [`Mesh::triangulate`] splits larger
/// polygons, and [`SceneDocument`](super::SceneDocument) runs it on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub control_points: Vec<DVec3>,
    pub polygons: Vec<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<LayerElement<DVec3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<LayerElement<DVec2>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<MaterialElement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skins: Vec<Skin>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blend_shapes: Vec<BlendShape>,
}

impl Mesh {
    /// A bare triangle mesh with no channels and no deformers
    pub fn new(
        name: impl Into<String>,
        control_points: Vec<DVec3>,
        polygons: Vec<Vec<usize>>,
    ) -> Self {
        Self {
            name: name.into(),
            control_points,
            polygons,
            normals: None,
            uvs: None,
            materials: None,
            skins: Vec::new(),
            blend_shapes: Vec::new(),
        }
    }

    pub fn control_point_count(&self) -> usize {
        self.control_points.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Whether any skin carries at least one cluster
    pub fn has_skin(&self) -> bool {
        self.skins.iter().any(|skin| !skin.clusters.is_empty())
    }

    pub fn has_blend_shapes(&self) -> bool {
        !self.blend_shapes.is_empty()
    }

    /// Whether baking must run a deformation pass
    pub fn has_deformation(&self) -> bool {
        self.has_skin() || self.has_blend_shapes()
    }

    /// Fan-triangulate every polygon with more than three corners
    ///
    /// Corner `k` of an n-gon becomes triangles `(0, k, k + 1)`. Per-corner
    /// and per-polygon channels and per-polygon material indices are
    /// rewritten to follow the new triangles. Polygons with fewer than three
    /// corners are left for the packer to reject. Returns the number of
    /// polygons that were split.
    pub fn triangulate(&mut self) -> usize {
        if self.polygons.iter().all(|polygon| polygon.len() <= 3) {
            return 0;
        }

        let old_count = self.polygon_count();
        let mut polygons = Vec::with_capacity(old_count);
        let mut corner_slots = Vec::new();
        let mut polygon_slots = Vec::with_capacity(old_count);
        let mut split = 0;
        let mut offset = 0;

        for (index, polygon) in self.polygons.iter().enumerate() {
            if polygon.len() > 3 {
                split += 1;
                for k in 1..polygon.len() - 1 {
                    polygons.push(vec![polygon[0], polygon[k], polygon[k + 1]]);
                    corner_slots.extend([offset, offset + k, offset + k + 1]);
                    polygon_slots.push(index);
                }
            } else {
                polygons.push(polygon.clone());
                corner_slots.extend(offset..offset + polygon.len());
                polygon_slots.push(index);
            }
            offset += polygon.len();
        }

        if let Some(normals) = &mut self.normals {
            normals.follow_triangulation(&corner_slots, &polygon_slots);
        }
        if let Some(uvs) = &mut self.uvs {
            uvs.follow_triangulation(&corner_slots, &polygon_slots);
        }
        if let Some(materials) = &mut self.materials
            && let Some(indices) = materials.polygon_indices(old_count)
        {
            let indices = polygon_slots.iter().map(|&polygon| indices[polygon]).collect();
            materials.indices = indices;
        }

        self.polygons = polygons;
        split
    }
}
