//! Vertex packing: mesh topology into flat, renderer-ready buffers
//!
//! The packer splits a mesh into one [`SubMesh`] per material index and
//! chooses between two layouts:
//!
//! - [`VertexLayout::ByControlPoint`]: one vertex per control point, indices
//!   reference control points directly. Used when every normal and UV
//!   channel present is mapped per control point.
//! - [`VertexLayout::ByPolygonVertex`]: every triangle corner gets a fresh,
//!   unshared vertex so normals and UVs can differ per corner.
//!
//! Positions are written with a `w = 1` component. Only positions are ever
//! rewritten after packing (see [`BakedMesh::update_positions`]); normals,
//! UVs and indices stay as packed from the undeformed mesh.

use crate::error::{BakeError, Result};
use crate::scene::{LayerElement, MappingMode, Mesh};
use glam::{DVec2, DVec3};
use log::{trace, warn};
use serde::Serialize;

/// Corners per polygon
pub const TRIANGLE_VERTEX_COUNT: usize = 3;
/// Floats per position (x, y, z, w)
pub const VERTEX_STRIDE: usize = 4;
/// Floats per normal
pub const NORMAL_STRIDE: usize = 3;
/// Floats per UV
pub const UV_STRIDE: usize = 2;
/// Upper bound on per-polygon material indices, and so on submeshes per mesh
pub const MAX_SUBMESHES: usize = 1 << 16;

/// A contiguous index range sharing one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SubMesh {
    /// Offset into the index buffer
    pub index_offset: usize,
    pub triangle_count: usize,
}

/// Vertex addressing chosen for a baked mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexLayout {
    ByControlPoint,
    ByPolygonVertex,
}

/// Flat buffers for one mesh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BakedMesh {
    pub name: String,
    /// Positions, stride [`VERTEX_STRIDE`]
    #[serde(rename = "vertices")]
    pub positions: Vec<f32>,
    /// Normals, stride [`NORMAL_STRIDE`]; empty when the mesh has none
    pub normals: Vec<f32>,
    /// UVs, stride [`UV_STRIDE`]; empty when the mesh has none
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
    #[serde(skip)]
    pub layout: VertexLayout,
}

impl BakedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / TRIANGLE_VERTEX_COUNT
    }

    /// Rewrite the position stream from deformed control points
    ///
    /// `deformed` is aligned with the mesh's control points and is laid out
    /// exactly as [`pack`] laid out the original positions.
    pub fn update_positions(&mut self, mesh: &Mesh, deformed: &[DVec3]) -> Result<()> {
        if deformed.len() != mesh.control_point_count() {
            return Err(BakeError::corrupt(
                &mesh.name,
                format!(
                    "{} deformed positions for {} control points",
                    deformed.len(),
                    mesh.control_point_count()
                ),
            ));
        }

        match self.layout {
            VertexLayout::ByControlPoint => {
                if self.vertex_count() != deformed.len() {
                    return Err(BakeError::corrupt(
                        &mesh.name,
                        "vertex buffer does not match the control point count",
                    ));
                }
                for (vertex, position) in deformed.iter().enumerate() {
                    write_position(&mut self.positions, vertex, *position);
                }
            }
            VertexLayout::ByPolygonVertex => {
                if self.vertex_count() != mesh.polygon_count() * TRIANGLE_VERTEX_COUNT {
                    return Err(BakeError::corrupt(
                        &mesh.name,
                        "vertex buffer does not match the polygon count",
                    ));
                }
                let mut vertex = 0;
                for polygon in &mesh.polygons {
                    for &control_point in polygon {
                        let position = deformed.get(control_point).ok_or_else(|| {
                            BakeError::corrupt(
                                &mesh.name,
                                format!("control point {control_point} out of range"),
                            )
                        })?;
                        write_position(&mut self.positions, vertex, *position);
                        vertex += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Check the buffer invariants
    ///
    /// The submeshes must tile the index buffer exactly, every index must
    /// address an existing vertex, and non-empty attribute streams must hold
    /// one entry per vertex.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |reason: String| Err(BakeError::corrupt(&self.name, reason));

        if self.positions.len() % VERTEX_STRIDE != 0 {
            return corrupt(format!(
                "position buffer length {} is not a multiple of {VERTEX_STRIDE}",
                self.positions.len()
            ));
        }

        let mut expected_offset = 0;
        for (material, submesh) in self.submeshes.iter().enumerate() {
            if submesh.index_offset != expected_offset {
                return corrupt(format!(
                    "submesh {material} starts at {} instead of {expected_offset}",
                    submesh.index_offset
                ));
            }
            expected_offset += submesh.triangle_count * TRIANGLE_VERTEX_COUNT;
        }
        if expected_offset != self.indices.len() {
            return corrupt(format!(
                "submeshes cover {expected_offset} indices, buffer holds {}",
                self.indices.len()
            ));
        }

        let vertex_count = self.vertex_count();
        if let Some(index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return corrupt(format!(
                "index {index} out of range ({vertex_count} vertices)"
            ));
        }

        if !self.normals.is_empty() && self.normals.len() != vertex_count * NORMAL_STRIDE {
            return corrupt(format!(
                "{} normal floats for {vertex_count} vertices",
                self.normals.len()
            ));
        }
        if !self.uvs.is_empty() && self.uvs.len() != vertex_count * UV_STRIDE {
            return corrupt(format!(
                "{} uv floats for {vertex_count} vertices",
                self.uvs.len()
            ));
        }

        Ok(())
    }
}

fn write_position(buffer: &mut [f32], vertex: usize, position: DVec3) {
    let offset = vertex * VERTEX_STRIDE;
    buffer[offset] = position.x as f32;
    buffer[offset + 1] = position.y as f32;
    buffer[offset + 2] = position.z as f32;
    buffer[offset + 3] = 1.0;
}

fn write_normal(buffer: &mut [f32], vertex: usize, normal: DVec3) {
    let offset = vertex * NORMAL_STRIDE;
    buffer[offset] = normal.x as f32;
    buffer[offset + 1] = normal.y as f32;
    buffer[offset + 2] = normal.z as f32;
}

fn write_uv(buffer: &mut [f32], vertex: usize, uv: DVec2) {
    let offset = vertex * UV_STRIDE;
    buffer[offset] = uv.x as f32;
    buffer[offset + 1] = uv.y as f32;
}

/// Keep a channel only if its mapping can be packed
fn usable_channel<'a, T>(
    channel: &'static str,
    element: Option<&'a LayerElement<T>>,
) -> Option<&'a LayerElement<T>> {
    let element = element?;
    match element.mapping {
        MappingMode::ByControlPoint | MappingMode::ByPolygonVertex => Some(element),
        MappingMode::None => None,
        mode => {
            let err = BakeError::UnsupportedMapping {
                channel,
                mode: format!("{mode:?}"),
            };
            warn!("{err}; channel ignored");
            None
        }
    }
}

/// Resolve a channel value for one triangle corner
fn corner_value<T: Copy>(
    mesh: &Mesh,
    channel: &'static str,
    element: &LayerElement<T>,
    control_point: usize,
    polygon_vertex: usize,
) -> Result<T> {
    let slot = match element.mapping {
        MappingMode::ByControlPoint => control_point,
        _ => polygon_vertex,
    };
    element.value_at(slot).ok_or_else(|| {
        BakeError::corrupt(
            &mesh.name,
            format!("{channel} element {slot} out of range"),
        )
    })
}

/// Count triangles per material and turn the counts into offsets
///
/// Returns the submeshes with their counts reset to zero so they can act as
/// write cursors, and the per-polygon material indices when they apply.
fn partition(mesh: &Mesh) -> Result<(Vec<SubMesh>, Option<&[usize]>)> {
    let polygon_count = mesh.polygon_count();
    let material_indices = mesh
        .materials
        .as_ref()
        .and_then(|element| element.polygon_indices(polygon_count));

    let mut submeshes: Vec<SubMesh> = Vec::new();
    if let Some(indices) = material_indices {
        for (polygon_index, &material) in indices.iter().enumerate() {
            if material >= MAX_SUBMESHES {
                return Err(BakeError::corrupt(
                    &mesh.name,
                    format!(
                        "polygon {polygon_index} uses material {material}, limit is {MAX_SUBMESHES}"
                    ),
                ));
            }
            if submeshes.len() <= material {
                submeshes.resize(material + 1, SubMesh::default());
            }
            submeshes[material].triangle_count += 1;
        }
    }

    // All faces share one material
    if submeshes.is_empty() {
        submeshes.push(SubMesh {
            index_offset: 0,
            triangle_count: polygon_count,
        });
    }

    let mut offset = 0;
    for submesh in &mut submeshes {
        submesh.index_offset = offset;
        offset += submesh.triangle_count * TRIANGLE_VERTEX_COUNT;
        submesh.triangle_count = 0;
    }

    Ok((submeshes, material_indices))
}

/// Pack a mesh using `positions` in place of its raw control points
pub fn pack(mesh: &Mesh, positions: &[DVec3]) -> Result<BakedMesh> {
    let control_point_count = mesh.control_point_count();
    let polygon_count = mesh.polygon_count();

    if positions.len() != control_point_count {
        return Err(BakeError::corrupt(
            &mesh.name,
            format!(
                "{} positions for {control_point_count} control points",
                positions.len()
            ),
        ));
    }

    let normals = usable_channel("normal", mesh.normals.as_ref());
    let uvs = usable_channel("uv", mesh.uvs.as_ref());

    let per_corner = normals.is_some_and(|n| n.mapping == MappingMode::ByPolygonVertex)
        || uvs.is_some_and(|u| u.mapping == MappingMode::ByPolygonVertex);
    let layout = if per_corner {
        VertexLayout::ByPolygonVertex
    } else {
        VertexLayout::ByControlPoint
    };

    let vertex_count = match layout {
        VertexLayout::ByControlPoint => control_point_count,
        VertexLayout::ByPolygonVertex => polygon_count * TRIANGLE_VERTEX_COUNT,
    };
    if u32::try_from(vertex_count).is_err() {
        return Err(BakeError::corrupt(
            &mesh.name,
            format!("{vertex_count} vertices do not fit 32-bit indices"),
        ));
    }

    let (mut submeshes, material_indices) = partition(mesh)?;

    let mut baked = BakedMesh {
        name: mesh.name.clone(),
        positions: vec![0.0; vertex_count * VERTEX_STRIDE],
        normals: if normals.is_some() {
            vec![0.0; vertex_count * NORMAL_STRIDE]
        } else {
            Vec::new()
        },
        uvs: if uvs.is_some() {
            vec![0.0; vertex_count * UV_STRIDE]
        } else {
            Vec::new()
        },
        indices: vec![0; polygon_count * TRIANGLE_VERTEX_COUNT],
        submeshes: Vec::new(),
        layout,
    };

    if layout == VertexLayout::ByControlPoint {
        for (control_point, position) in positions.iter().enumerate() {
            write_position(&mut baked.positions, control_point, *position);
            if let Some(element) = normals {
                let normal = corner_value(mesh, "normal", element, control_point, control_point)?;
                write_normal(&mut baked.normals, control_point, normal);
            }
            if let Some(element) = uvs {
                let uv = corner_value(mesh, "uv", element, control_point, control_point)?;
                write_uv(&mut baked.uvs, control_point, uv);
            }
        }
    }

    let mut vertex = 0;
    for (polygon_index, polygon) in mesh.polygons.iter().enumerate() {
        if polygon.len() != TRIANGLE_VERTEX_COUNT {
            return Err(BakeError::corrupt(
                &mesh.name,
                format!(
                    "polygon {polygon_index} has {} vertices, expected {TRIANGLE_VERTEX_COUNT}",
                    polygon.len()
                ),
            ));
        }

        let material = material_indices.map_or(0, |indices| indices[polygon_index]);
        let submesh = &mut submeshes[material];
        let base = submesh.index_offset + submesh.triangle_count * TRIANGLE_VERTEX_COUNT;

        for (corner, &control_point) in polygon.iter().enumerate() {
            let Some(position) = positions.get(control_point) else {
                return Err(BakeError::corrupt(
                    &mesh.name,
                    format!(
                        "polygon {polygon_index} references control point {control_point} \
                         ({control_point_count} available)"
                    ),
                ));
            };

            match layout {
                VertexLayout::ByControlPoint => {
                    baked.indices[base + corner] = control_point as u32;
                }
                VertexLayout::ByPolygonVertex => {
                    baked.indices[base + corner] = vertex as u32;
                    write_position(&mut baked.positions, vertex, *position);
                    if let Some(element) = normals {
                        let normal = corner_value(mesh, "normal", element, control_point, vertex)?;
                        write_normal(&mut baked.normals, vertex, normal);
                    }
                    if let Some(element) = uvs {
                        let uv = corner_value(mesh, "uv", element, control_point, vertex)?;
                        write_uv(&mut baked.uvs, vertex, uv);
                    }
                }
            }
            vertex += 1;
        }

        submesh.triangle_count += 1;
    }

    baked.submeshes = submeshes;
    baked.validate()?;

    trace!(
        "Packed '{}': {} vertices, {} triangles, {} submeshes ({:?})",
        baked.name,
        baked.vertex_count(),
        baked.triangle_count(),
        baked.submeshes.len(),
        baked.layout
    );

    Ok(baked)
}
