//! Transform resolution for nodes at a point in time
//!
//! A node's global transform comes from the active pose when the pose holds
//! an entry for it, and from the provider's animated transform chain
//! otherwise. Nothing here mutates the scene; the same `(time, pose)` always
//! yields the same matrices.

use crate::math::from_trs_degrees;
use crate::scene::{NodeId, Pose, SceneGraph};
use glam::DMat4;

/// Immutable evaluation context threaded through every resolver call
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    /// Evaluation time in seconds
    pub time: f64,
    /// Pose overriding animated transforms for the nodes it covers
    pub pose: Option<&'a Pose>,
}

impl<'a> EvalContext<'a> {
    /// Context at `time` with no pose
    pub fn at(time: f64) -> Self {
        Self { time, pose: None }
    }

    /// Same time, with a pose
    pub fn with_pose(self, pose: &'a Pose) -> Self {
        Self {
            pose: Some(pose),
            ..self
        }
    }
}

/// Global transform of `node`
///
/// Pose entries stored in global space, and every entry of a bind pose, are
/// used as-is. Local entries are composed with the parent's global transform,
/// resolved through the same pose.
pub fn global_transform<S: SceneGraph + ?Sized>(
    scene: &S,
    node: NodeId,
    ctx: EvalContext<'_>,
) -> DMat4 {
    if let Some(pose) = ctx.pose
        && let Some(index) = pose.find(node)
        && let Some(matrix) = pose.matrix(index)
    {
        if pose.is_bind_pose() || !pose.is_local_matrix(index) {
            return matrix;
        }

        let parent_global = scene
            .parent(node)
            .map_or(DMat4::IDENTITY, |parent| global_transform(scene, parent, ctx));
        return parent_global * matrix;
    }

    scene.evaluate_global_transform(node, ctx.time)
}

/// Geometric pivot of `node`: `T * R * S` of its geometric translation,
/// rotation and scaling
pub fn geometric_offset<S: SceneGraph + ?Sized>(scene: &S, node: NodeId) -> DMat4 {
    from_trs_degrees(
        scene.geometric_translation(node),
        scene.geometric_rotation(node),
        scene.geometric_scaling(node),
    )
}

/// Matrix taking the node's control points into world space
pub fn world_transform<S: SceneGraph + ?Sized>(
    scene: &S,
    node: NodeId,
    ctx: EvalContext<'_>,
) -> DMat4 {
    global_transform(scene, node, ctx) * geometric_offset(scene, node)
}
