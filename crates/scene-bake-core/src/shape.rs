//! Blend-shape (morph target) deformation

use crate::scene::{BlendShapeChannel, Mesh};
use crate::transform::EvalContext;
use glam::{DMat4, DVec3};
use log::{trace, warn};

/// Index of the target shape a channel weight activates
///
/// The first target is active for `0 < weight <= full_weights[0]`; target
/// `k + 1` is active for `full_weights[k] < weight < full_weights[k + 1]`.
/// At most one target is active, and a weight that falls on an inner
/// threshold or above the last one activates nothing.
pub fn active_target(weight: f64, full_weights: &[f64]) -> Option<usize> {
    let first = *full_weights.first()?;
    if weight > 0.0 && weight <= first {
        return Some(0);
    }

    full_weights
        .windows(2)
        .position(|bracket| weight > bracket[0] && weight < bracket[1])
        .map(|k| k + 1)
}

fn channel_target(channel: &BlendShapeChannel, time: f64) -> Option<(usize, f64)> {
    let weight = channel.weight.as_ref()?.evaluate(time)?;
    let target = active_target(weight, &channel.full_weights)?;
    (target < channel.targets.len()).then_some((target, weight))
}

/// Add every active blend-shape contribution to `positions`
///
/// `positions` are the mesh control points in the space described by
/// `world`; target shapes are brought into the same space before taking the
/// difference. All contributions are measured against the input positions
/// and applied together at the end.
pub fn compute_shape_deformation(
    mesh: &Mesh,
    positions: &mut [DVec3],
    ctx: EvalContext<'_>,
    world: &DMat4,
) {
    let vertex_count = positions.len();
    let mut offsets = vec![DVec3::ZERO; vertex_count];
    let mut applied = 0usize;

    for blend_shape in &mesh.blend_shapes {
        for channel in &blend_shape.channels {
            let Some((target, weight)) = channel_target(channel, ctx.time) else {
                continue;
            };
            let shape = &channel.targets[target];
            if shape.control_points.len() != vertex_count {
                warn!(
                    "Mesh '{}': shape '{}' has {} control points, expected {vertex_count}; skipped",
                    mesh.name,
                    shape.name,
                    shape.control_points.len()
                );
                continue;
            }

            trace!(
                "Mesh '{}': channel '{}' at {weight} uses shape '{}'",
                mesh.name, channel.name, shape.name
            );

            let scale = weight * 0.01;
            for ((offset, source), target) in offsets
                .iter_mut()
                .zip(positions.iter())
                .zip(&shape.control_points)
            {
                *offset += (world.transform_point3(*target) - *source) * scale;
            }
            applied += 1;
        }
    }

    if applied > 0 {
        for (position, offset) in positions.iter_mut().zip(&offsets) {
            *position += *offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AnimCurve, BlendShape, Shape};
    use test_case::test_case;

    fn assert_vec_close(a: DVec3, b: DVec3) {
        assert!(a.abs_diff_eq(b, 1e-9), "{a:?} != {b:?}");
    }

    #[test_case(0.0 => None; "zero weight")]
    #[test_case(-5.0 => None; "negative weight")]
    #[test_case(30.0 => Some(0); "inside first bracket")]
    #[test_case(50.0 => Some(0); "on first threshold")]
    #[test_case(60.0 => Some(1); "inside second bracket")]
    #[test_case(80.0 => None; "on inner threshold")]
    #[test_case(90.0 => Some(2); "inside third bracket")]
    #[test_case(100.0 => None; "on last threshold")]
    fn test_active_target(weight: f64) -> Option<usize> {
        active_target(weight, &[50.0, 80.0, 100.0])
    }

    #[test]
    fn test_active_target_without_thresholds() {
        assert_eq!(active_target(50.0, &[]), None);
    }

    fn mesh(weight: f64) -> Mesh {
        let mut mesh = Mesh::new(
            "Face",
            vec![DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)],
            vec![],
        );
        mesh.blend_shapes = vec![BlendShape {
            name: "Expressions".to_string(),
            channels: vec![BlendShapeChannel {
                name: "Smile".to_string(),
                weight: Some(AnimCurve::linear([(0.0, weight)])),
                targets: vec![Shape {
                    name: "SmileFull".to_string(),
                    control_points: vec![DVec3::new(0.0, 2.0, 0.0), DVec3::new(1.0, 0.0, 4.0)],
                }],
                full_weights: vec![100.0],
            }],
        }];
        mesh
    }

    #[test]
    fn test_zero_weight_is_a_no_op() {
        let mesh = mesh(0.0);
        let mut positions = mesh.control_points.clone();
        compute_shape_deformation(&mesh, &mut positions, EvalContext::at(0.0), &DMat4::IDENTITY);
        assert_eq!(positions, mesh.control_points);
    }

    #[test]
    fn test_partial_weight_moves_toward_target() {
        let mesh = mesh(25.0);
        let mut positions = mesh.control_points.clone();
        compute_shape_deformation(&mesh, &mut positions, EvalContext::at(0.0), &DMat4::IDENTITY);

        assert_vec_close(positions[0], DVec3::new(0.0, 0.5, 0.0));
        assert_vec_close(positions[1], DVec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_targets_follow_world_matrix() {
        let mesh = mesh(100.0);
        let world = DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0));
        let mut positions: Vec<DVec3> = mesh
            .control_points
            .iter()
            .map(|p| world.transform_point3(*p))
            .collect();
        compute_shape_deformation(&mesh, &mut positions, EvalContext::at(0.0), &world);

        assert_vec_close(positions[0], DVec3::new(10.0, 2.0, 0.0));
        assert_vec_close(positions[1], DVec3::new(11.0, 0.0, 4.0));
    }

    #[test]
    fn test_channel_without_curve_or_bad_shape_is_ignored() {
        let mut mesh = mesh(50.0);
        mesh.blend_shapes[0].channels[0].targets[0].control_points.pop();
        let mut positions = mesh.control_points.clone();
        compute_shape_deformation(&mesh, &mut positions, EvalContext::at(0.0), &DMat4::IDENTITY);
        assert_eq!(positions, mesh.control_points);

        let mut mesh = self::mesh(50.0);
        mesh.blend_shapes[0].channels[0].weight = None;
        let mut positions = mesh.control_points.clone();
        compute_shape_deformation(&mesh, &mut positions, EvalContext::at(0.0), &DMat4::IDENTITY);
        assert_eq!(positions, mesh.control_points);
    }

    #[test]
    fn test_channels_accumulate_against_input() {
        let mut mesh = mesh(50.0);
        let channel = mesh.blend_shapes[0].channels[0].clone();
        mesh.blend_shapes[0].channels.push(channel);
        let mut positions = mesh.control_points.clone();
        compute_shape_deformation(&mesh, &mut positions, EvalContext::at(0.0), &DMat4::IDENTITY);

        // Two half contributions measured from the same base reach the target
        assert_vec_close(positions[0], DVec3::new(0.0, 2.0, 0.0));
    }
}
