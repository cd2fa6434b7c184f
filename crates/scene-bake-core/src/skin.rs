//! Skeletal deformation of control points
//!
//! Every cluster contributes a vertex transform relating the bone's bind
//! and current global transforms to the mesh's own bind and current global
//! transforms. The contributions are blended per control point in one of
//! two representations:
//!
//! - **Linear**: weighted sum of 4x4 matrices, or a product of
//!   weight-folded matrices in [`LinkMode::Additive`].
//! - **Dual quaternion**: weighted sum of unit dual quaternions with
//!   antipodal correction, normalized before use.
//!
//! [`SkinningType::Blend`] runs both and mixes the results per control point
//! using the skin's blend weights. The link mode and skinning type of a mesh
//! come from its first skin and apply to every cluster of every skin.
//!
//! Control points with no accumulated weight keep their input position.
//! Clusters without a link node are skipped with a warning.

use crate::dual_quat::DualQuat;
use crate::error::{BakeError, Result};
use crate::math::{matrix_add, matrix_add_to_diagonal, matrix_scale};
use crate::scene::{Cluster, LinkMode, Mesh, NodeId, SceneGraph, SkinningType};
use crate::transform::{EvalContext, geometric_offset, global_transform};
use glam::{DMat4, DVec3};
use log::{debug, warn};

/// Vertex transform contributed by one cluster
///
/// `reference_global_current` is the current global transform of the mesh
/// node. In [`LinkMode::Additive`] with an associate model the transform is
/// routed through the associate's bind and current transforms.
pub fn cluster_vertex_transform<S: SceneGraph + ?Sized>(
    scene: &S,
    mesh_node: NodeId,
    cluster_index: usize,
    cluster: &Cluster,
    link_mode: LinkMode,
    reference_global_current: &DMat4,
    ctx: EvalContext<'_>,
) -> Result<DMat4> {
    let Some(link) = cluster.link else {
        return Err(BakeError::MissingBindData {
            cluster: cluster_index,
            reason: "cluster has no link node".to_string(),
        });
    };
    if !scene.contains_node(link) {
        return Err(BakeError::MissingBindData {
            cluster: cluster_index,
            reason: format!("link node {link} is not in the scene"),
        });
    }

    let reference_global_init = cluster.transform * geometric_offset(scene, mesh_node);
    let cluster_global_current = global_transform(scene, link, ctx);

    if link_mode == LinkMode::Additive
        && let Some(associate) = cluster.associate_model
    {
        if !scene.contains_node(associate) {
            return Err(BakeError::MissingBindData {
                cluster: cluster_index,
                reason: format!("associate model {associate} is not in the scene"),
            });
        }
        let associate_global_init =
            cluster.transform_associate_model * geometric_offset(scene, associate);
        let associate_global_current = global_transform(scene, associate, ctx);
        let cluster_global_init = cluster.transform_link * geometric_offset(scene, link);

        return Ok(reference_global_init.inverse()
            * associate_global_init
            * associate_global_current.inverse()
            * cluster_global_current
            * cluster_global_init.inverse()
            * reference_global_init);
    }

    let cluster_global_init = cluster.transform_link;
    let relative_init = cluster_global_init.inverse() * reference_global_init;
    let relative_current_inverse = reference_global_current.inverse() * cluster_global_current;

    Ok(relative_current_inverse * relative_init)
}

/// Resolve every usable cluster of every skin on the mesh
fn resolve_clusters<'m, S: SceneGraph + ?Sized>(
    scene: &S,
    mesh_node: NodeId,
    mesh: &'m Mesh,
    link_mode: LinkMode,
    reference_global_current: &DMat4,
    ctx: EvalContext<'_>,
) -> Vec<(&'m Cluster, DMat4)> {
    let mut resolved = Vec::new();

    let clusters = mesh.skins.iter().flat_map(|skin| skin.clusters.iter());
    for (index, cluster) in clusters.enumerate() {
        match cluster_vertex_transform(
            scene,
            mesh_node,
            index,
            cluster,
            link_mode,
            reference_global_current,
            ctx,
        ) {
            Ok(transform) => resolved.push((cluster, transform)),
            Err(err) => warn!("Mesh '{}': {err}; cluster skipped", mesh.name),
        }
    }

    resolved
}

/// Influences of a cluster that land on existing control points
fn valid_influences<'c>(
    mesh: &'c Mesh,
    cluster: &'c Cluster,
    vertex_count: usize,
) -> impl Iterator<Item = (usize, f64)> + 'c {
    let out_of_range = cluster
        .indices
        .iter()
        .filter(|&&index| index >= vertex_count)
        .count();
    if out_of_range > 0 {
        warn!(
            "Mesh '{}': {out_of_range} cluster indices beyond {vertex_count} control points ignored",
            mesh.name
        );
    }

    cluster
        .influences()
        .filter(move |&(index, weight)| index < vertex_count && weight != 0.0)
}

/// Apply the link-mode post-step to one deformed position
fn finish(link_mode: LinkMode, source: DVec3, deformed: DVec3, weight: f64) -> DVec3 {
    match link_mode {
        LinkMode::Normalize => deformed / weight,
        LinkMode::TotalOne => deformed + source * (1.0 - weight),
        LinkMode::Additive => deformed,
    }
}

/// Linear blend skinning
pub fn linear_deformation<S: SceneGraph + ?Sized>(
    scene: &S,
    mesh_node: NodeId,
    mesh: &Mesh,
    link_mode: LinkMode,
    positions: &[DVec3],
    reference_global_current: &DMat4,
    ctx: EvalContext<'_>,
) -> Vec<DVec3> {
    let vertex_count = positions.len();
    let seed = if link_mode == LinkMode::Additive {
        DMat4::IDENTITY
    } else {
        DMat4::ZERO
    };
    let mut deformations = vec![seed; vertex_count];
    let mut weights = vec![0.0; vertex_count];

    let clusters = resolve_clusters(
        scene,
        mesh_node,
        mesh,
        link_mode,
        reference_global_current,
        ctx,
    );
    for (cluster, vertex_transform) in clusters {
        for (index, weight) in valid_influences(mesh, cluster, vertex_count) {
            let influence = matrix_scale(&vertex_transform, weight);

            if link_mode == LinkMode::Additive {
                let influence = matrix_add_to_diagonal(&influence, 1.0 - weight);
                deformations[index] = influence * deformations[index];
                weights[index] = 1.0;
            } else {
                deformations[index] = matrix_add(&deformations[index], &influence);
                weights[index] += weight;
            }
        }
    }

    positions
        .iter()
        .zip(deformations.iter().zip(&weights))
        .map(|(&source, (deformation, &weight))| {
            if weight == 0.0 {
                return source;
            }
            let deformed = (*deformation * source.extend(1.0)).truncate();
            finish(link_mode, source, deformed, weight)
        })
        .collect()
}

/// Dual quaternion skinning
///
/// The normalized dual quaternion already carries unit weight, so
/// [`LinkMode::Normalize`] needs no further division. [`LinkMode::TotalOne`]
/// adds the unweighted remainder of the source position to the rigid result.
pub fn dual_quaternion_deformation<S: SceneGraph + ?Sized>(
    scene: &S,
    mesh_node: NodeId,
    mesh: &Mesh,
    link_mode: LinkMode,
    positions: &[DVec3],
    reference_global_current: &DMat4,
    ctx: EvalContext<'_>,
) -> Vec<DVec3> {
    let vertex_count = positions.len();
    let mut deformations = vec![DualQuat::ZERO; vertex_count];
    let mut weights = vec![0.0; vertex_count];

    let clusters = resolve_clusters(
        scene,
        mesh_node,
        mesh,
        link_mode,
        reference_global_current,
        ctx,
    );
    for (cluster, vertex_transform) in clusters {
        let dual_quat = DualQuat::from_mat4(&vertex_transform);

        for (index, weight) in valid_influences(mesh, cluster, vertex_count) {
            let influence = dual_quat * weight;

            if link_mode == LinkMode::Additive {
                deformations[index] = influence;
                weights[index] = 1.0;
            } else {
                // q and -q are the same rotation; keep the blend on one hemisphere
                if deformations[index].real_dot(&dual_quat) >= 0.0 {
                    deformations[index] += influence;
                } else {
                    deformations[index] -= influence;
                }
                weights[index] += weight;
            }
        }
    }

    let mut cancelled = 0usize;
    let deformed = positions
        .iter()
        .zip(deformations.iter().zip(&weights))
        .map(|(&source, (deformation, &weight))| {
            if weight == 0.0 {
                return source;
            }
            let Some(unit) = deformation.normalize() else {
                cancelled += 1;
                return source;
            };
            let rigid = unit.transform_point(source);
            match link_mode {
                LinkMode::Normalize | LinkMode::Additive => rigid,
                LinkMode::TotalOne => rigid + source * (1.0 - weight),
            }
        })
        .collect();

    if cancelled > 0 {
        warn!(
            "Mesh '{}': {cancelled} control points had cancelling dual quaternions and were left undeformed",
            mesh.name
        );
    }

    deformed
}

/// Deform world-space control points with every skin on the mesh
///
/// Returns a copy of `positions` when the mesh has no clusters.
pub fn compute_skin_deformation<S: SceneGraph + ?Sized>(
    scene: &S,
    mesh_node: NodeId,
    mesh: &Mesh,
    positions: &[DVec3],
    reference_global_current: &DMat4,
    ctx: EvalContext<'_>,
) -> Vec<DVec3> {
    let Some(first) = mesh.skins.first() else {
        return positions.to_vec();
    };
    if !mesh.has_skin() {
        return positions.to_vec();
    }

    let link_mode = first.link_mode;
    debug!(
        "Skinning '{}' ({:?}, {:?}) at t={}",
        mesh.name, first.skinning_type, link_mode, ctx.time
    );

    match first.skinning_type {
        SkinningType::Rigid | SkinningType::Linear => linear_deformation(
            scene,
            mesh_node,
            mesh,
            link_mode,
            positions,
            reference_global_current,
            ctx,
        ),
        SkinningType::DualQuaternion => dual_quaternion_deformation(
            scene,
            mesh_node,
            mesh,
            link_mode,
            positions,
            reference_global_current,
            ctx,
        ),
        SkinningType::Blend => {
            let linear = linear_deformation(
                scene,
                mesh_node,
                mesh,
                link_mode,
                positions,
                reference_global_current,
                ctx,
            );
            let dual = dual_quaternion_deformation(
                scene,
                mesh_node,
                mesh,
                link_mode,
                positions,
                reference_global_current,
                ctx,
            );

            // Control points without a blend weight stay fully linear
            linear
                .iter()
                .zip(&dual)
                .enumerate()
                .map(|(index, (&linear, &dual))| {
                    let blend = first.blend_weights.get(index).copied().unwrap_or(0.0);
                    dual * blend + linear * (1.0 - blend)
                })
                .collect()
        }
    }
}
