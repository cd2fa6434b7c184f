//! Bake orchestration: one pass over the scene at one point in time
//!
//! The orchestrator walks the node hierarchy depth-first, bakes every
//! material it meets once, and runs each mesh through
//! transform → pack → blend shapes → skin → re-project. Meshes are
//! independent, so with [`BakeOptions::parallel`] they are baked on the
//! rayon pool; the output order is the traversal order either way.
//!
//! Recoverable problems (unresolvable geometry, unsupported channels,
//! unlinked clusters) are logged and skipped. A mesh with corrupt topology
//! is recorded in [`BakeOutput::failures`] while its siblings still bake.

use crate::error::{BakeError, Result};
use crate::material::{BakedMaterial, MaterialCache};
use crate::packer::{BakedMesh, pack};
use crate::scene::{MaterialId, Mesh, NodeId, Pose, SceneGraph};
use crate::shape::compute_shape_deformation;
use crate::skin::compute_skin_deformation;
use crate::transform::{EvalContext, world_transform};
use glam::DVec3;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Which stored pose, if any, overrides animated transforms
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PoseSelection {
    /// Evaluate animation only
    #[default]
    None,
    /// Pose by position in the scene's pose list
    Index(usize),
    /// Pose by name
    Name(String),
    /// The first pose flagged as a bind pose, if there is one
    FirstBindPose,
}

impl PoseSelection {
    /// Find the selected pose
    ///
    /// An index or name that matches nothing is an error; a missing bind
    /// pose falls back to animation.
    pub fn resolve<'a>(&self, poses: &'a [Pose]) -> Result<Option<&'a Pose>> {
        match self {
            Self::None => Ok(None),
            Self::Index(index) => poses.get(*index).map(Some).ok_or_else(|| {
                BakeError::InvalidScene(format!(
                    "pose index {index} out of range ({} poses)",
                    poses.len()
                ))
            }),
            Self::Name(name) => poses
                .iter()
                .find(|pose| pose.name == *name)
                .map(Some)
                .ok_or_else(|| BakeError::InvalidScene(format!("no pose named '{name}'"))),
            Self::FirstBindPose => {
                let pose = poses.iter().find(|pose| pose.is_bind_pose());
                if pose.is_none() {
                    info!("Scene has no bind pose, evaluating animation");
                }
                Ok(pose)
            }
        }
    }
}

/// Options for one bake pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BakeOptions {
    /// Evaluation time in seconds
    pub time: f64,
    pub pose: PoseSelection,
    /// Bake meshes on the rayon thread pool
    pub parallel: bool,
}

impl BakeOptions {
    pub fn at_time(time: f64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }
}

/// A mesh that could not be baked
#[derive(Debug)]
pub struct MeshFailure {
    pub node: NodeId,
    /// Name of the mesh node
    pub name: String,
    pub error: BakeError,
}

/// Result of one bake pass
#[derive(Debug)]
pub struct BakeOutput {
    pub time: f64,
    /// Baked meshes in depth-first traversal order
    pub meshes: Vec<BakedMesh>,
    pub materials: BTreeMap<MaterialId, BakedMaterial>,
    pub failures: Vec<MeshFailure>,
}

impl BakeOutput {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(BakedMesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(BakedMesh::triangle_count).sum()
    }
}

/// Where the orchestrator is in its pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeState {
    Idle,
    Scanning(NodeId),
    BakingMesh(NodeId),
    Recursing(NodeId),
}

fn enter(state: BakeState) {
    trace!("bake state: {state:?}");
}

/// Depth-first node order, each node at most once
fn traversal_order<S: SceneGraph + ?Sized>(scene: &S) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![scene.root()];

    while let Some(node) = stack.pop() {
        enter(BakeState::Scanning(node));
        if !visited.insert(node) {
            warn!(
                "Node '{}' ({node}) reached twice, skipping",
                scene.node_name(node)
            );
            continue;
        }
        order.push(node);

        let children = scene.children(node);
        if !children.is_empty() {
            enter(BakeState::Recursing(node));
            stack.extend(children.iter().rev().copied());
        }
    }

    order
}

/// Bake a single mesh node
pub fn bake_mesh<S: SceneGraph + ?Sized>(
    scene: &S,
    node: NodeId,
    mesh: &Mesh,
    ctx: EvalContext<'_>,
) -> Result<BakedMesh> {
    let world = world_transform(scene, node, ctx);
    let positions: Vec<DVec3> = mesh
        .control_points
        .iter()
        .map(|point| world.transform_point3(*point))
        .collect();

    let mut baked = pack(mesh, &positions)?;

    if mesh.has_deformation() {
        // Blend shapes pull the skinned positions toward their targets
        let mut deformed = compute_skin_deformation(scene, node, mesh, &positions, &world, ctx);
        compute_shape_deformation(mesh, &mut deformed, ctx, &world);
        baked.update_positions(mesh, &deformed)?;
    }

    debug!(
        "Baked mesh '{}' on node '{}': {} vertices, {} triangles",
        baked.name,
        scene.node_name(node),
        baked.vertex_count(),
        baked.triangle_count()
    );

    Ok(baked)
}

/// Materials and mesh of one visited node
fn bake_node<S: SceneGraph + ?Sized>(
    scene: &S,
    node: NodeId,
    ctx: EvalContext<'_>,
    materials: &MaterialCache,
) -> Option<std::result::Result<BakedMesh, MeshFailure>> {
    for &id in scene.materials(node) {
        match scene.material(id) {
            Some(material) => {
                materials.ensure_baked(id, material);
            }
            None => warn!(
                "Node '{}' references unknown material {id}",
                scene.node_name(node)
            ),
        }
    }

    let mesh = match scene.node_geometry(node) {
        Ok(Some(mesh)) => mesh,
        Ok(None) => return None,
        Err(err) => {
            warn!("{err}; mesh skipped");
            return None;
        }
    };

    enter(BakeState::BakingMesh(node));
    Some(bake_mesh(scene, node, mesh, ctx).map_err(|error| {
        warn!(
            "Failed to bake mesh on node '{}': {error}",
            scene.node_name(node)
        );
        MeshFailure {
            node,
            name: scene.node_name(node).to_string(),
            error,
        }
    }))
}

/// Bake every mesh and material reachable from the scene root
///
/// Fails only when the options cannot be resolved against the scene.
pub fn bake_scene<S: SceneGraph + ?Sized>(scene: &S, options: &BakeOptions) -> Result<BakeOutput> {
    let pose = options.pose.resolve(scene.poses())?;
    let ctx = EvalContext {
        time: options.time,
        pose,
    };

    let nodes = traversal_order(scene);
    let materials = MaterialCache::new();

    let results: Vec<_> = if options.parallel {
        nodes
            .par_iter()
            .filter_map(|&node| bake_node(scene, node, ctx, &materials))
            .collect()
    } else {
        nodes
            .iter()
            .filter_map(|&node| bake_node(scene, node, ctx, &materials))
            .collect()
    };
    enter(BakeState::Idle);

    let mut meshes = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(mesh) => meshes.push(mesh),
            Err(failure) => failures.push(failure),
        }
    }

    let output = BakeOutput {
        time: options.time,
        meshes,
        materials: materials.into_inner(),
        failures,
    };

    info!(
        "Baked {} meshes ({} vertices, {} triangles), {} materials, {} failures at t={}",
        output.meshes.len(),
        output.vertex_count(),
        output.triangle_count(),
        output.materials.len(),
        output.failures.len(),
        output.time
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeRecord, PoseEntry, SceneDocument, SurfaceMaterial};
    use glam::DMat4;

    fn triangle(name: &str) -> Mesh {
        Mesh::new(
            name,
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![vec![0, 1, 2]],
        )
    }

    fn scene() -> SceneDocument {
        let mut root = NodeRecord::new("Root");
        root.children = vec![NodeId(1), NodeId(3)];
        let mut a = NodeRecord::new("A");
        a.mesh = Some(0);
        a.materials = vec![MaterialId(0)];
        a.children = vec![NodeId(2)];
        let mut a_child = NodeRecord::new("AChild");
        a_child.mesh = Some(1);
        a_child.materials = vec![MaterialId(0), MaterialId(1)];
        let mut b = NodeRecord::new("B");
        b.mesh = Some(2);

        let pose = Pose {
            name: "Bind".to_string(),
            bind_pose: true,
            entries: vec![PoseEntry {
                node: NodeId(3),
                matrix: DMat4::from_translation(DVec3::new(0.0, 0.0, 9.0)),
                local: false,
            }],
        };

        SceneDocument::new(
            NodeId(0),
            vec![root, a, a_child, b],
            vec![triangle("MeshA"), triangle("MeshAChild"), triangle("MeshB")],
            vec![SurfaceMaterial::new("Red"), SurfaceMaterial::new("Blue")],
            vec![pose],
        )
        .unwrap()
    }

    fn names(output: &BakeOutput) -> Vec<&str> {
        output.meshes.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_depth_first_order_and_shared_materials() {
        let output = bake_scene(&scene(), &BakeOptions::default()).unwrap();

        assert_eq!(names(&output), vec!["MeshA", "MeshAChild", "MeshB"]);
        assert_eq!(output.materials.len(), 2);
        assert_eq!(output.materials[&MaterialId(1)].name, "Blue");
        assert!(output.failures.is_empty());
        assert_eq!(output.triangle_count(), 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let scene = scene();
        let sequential = bake_scene(&scene, &BakeOptions::default()).unwrap();
        let parallel = bake_scene(
            &scene,
            &BakeOptions {
                parallel: true,
                ..BakeOptions::default()
            },
        )
        .unwrap();

        assert_eq!(sequential.meshes, parallel.meshes);
        assert_eq!(sequential.materials, parallel.materials);
    }

    #[test]
    fn test_bind_pose_overrides_animation() {
        let scene = scene();
        let options = BakeOptions {
            pose: PoseSelection::FirstBindPose,
            ..BakeOptions::default()
        };
        let output = bake_scene(&scene, &options).unwrap();

        let b = &output.meshes[2];
        assert_eq!(&b.positions[..4], &[0.0, 0.0, 9.0, 1.0]);
        // Nodes outside the pose still evaluate animation
        assert_eq!(&output.meshes[0].positions[..4], &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_pose_is_an_error() {
        let scene = scene();
        for pose in [PoseSelection::Index(4), PoseSelection::Name("Rest".to_string())] {
            let options = BakeOptions {
                pose,
                ..BakeOptions::default()
            };
            assert!(matches!(
                bake_scene(&scene, &options),
                Err(BakeError::InvalidScene(_))
            ));
        }

        let by_name = PoseSelection::Name("Bind".to_string());
        assert!(by_name.resolve(scene.poses()).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_mesh_fails_alone() {
        let mut scene = scene();
        scene.meshes[1].polygons = vec![vec![0, 1]];
        let output = bake_scene(&scene, &BakeOptions::default()).unwrap();

        assert_eq!(names(&output), vec!["MeshA", "MeshB"]);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].name, "AChild");
        assert!(matches!(
            output.failures[0].error,
            BakeError::CorruptTopology { .. }
        ));
    }

    #[test]
    fn test_invalid_mesh_is_skipped() {
        let mut scene = scene();
        scene.nodes[1].mesh = Some(17);
        let output = bake_scene(&scene, &BakeOptions::default()).unwrap();

        // Children of the skipped node are still visited
        assert_eq!(names(&output), vec!["MeshAChild", "MeshB"]);
        assert!(output.failures.is_empty());
    }
}
