//! `info` command: show the node hierarchy of a scene

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};

use scene_bake_core::scene::Mesh;
use scene_bake_core::{NodeId, SceneDocument, SceneGraph};

use crate::utils::{NodeType, TreeNode, TreeOptions, format_count, render_tree};

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the scene document (JSON)
    pub input: PathBuf,

    /// Maximum depth to display
    #[arg(long)]
    pub depth: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

pub fn execute(args: InfoArgs) -> Result<()> {
    let scene = SceneDocument::from_path(&args.input)
        .with_context(|| format!("Failed to load scene: {}", args.input.display()))?;

    println!("\n{}", style("Scene Information").bold().underlined());
    println!("File: {}", style(args.input.display()).cyan());
    println!("Nodes: {}", style(scene.nodes.len()).green());
    println!("Meshes: {}", style(scene.meshes.len()).green());
    println!("Materials: {}", style(scene.materials.len()).green());
    println!("Poses: {}", style(scene.poses.len()).green());
    println!();

    let options = TreeOptions {
        max_depth: args.depth,
        no_color: args.no_color,
        ..TreeOptions::default()
    };
    print!("{}", render_tree(&scene_tree(&scene, &args.input, args.depth), &options));

    Ok(())
}

/// Build the display tree: the node hierarchy followed by the pose list
///
/// Nodes below `max_depth` are never built, so deep hierarchies cost no more
/// than what is rendered.
fn scene_tree(scene: &SceneDocument, path: &Path, max_depth: Option<usize>) -> TreeNode {
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

    let mut root = TreeNode::new(file_name, NodeType::Scene)
        .add_child(node_tree(scene, scene.root(), 1, max_depth));

    if !scene.poses.is_empty() {
        let mut group = TreeNode::new("Poses", NodeType::Group);
        for pose in &scene.poses {
            let kind = if pose.is_bind_pose() { "bind" } else { "rest" };
            group = group.add_child(
                TreeNode::new(&pose.name, NodeType::Pose)
                    .with_metadata("type", kind)
                    .with_metadata("entries", pose.entries.len()),
            );
        }
        root = root.add_child(group);
    }

    root
}

/// `depth` is the level of `node` in the rendered tree, the file being level 0
fn node_tree(
    scene: &SceneDocument,
    node: NodeId,
    depth: usize,
    max_depth: Option<usize>,
) -> TreeNode {
    let mut tree = TreeNode::new(scene.node_name(node), NodeType::Node);
    if max_depth.is_some_and(|max_depth| depth >= max_depth) {
        return tree;
    }

    match scene.node_geometry(node) {
        Ok(Some(mesh)) => tree = tree.add_child(mesh_tree(mesh)),
        Ok(None) => {}
        Err(err) => tree = tree.with_metadata("error", err),
    }

    for &id in scene.materials(node) {
        if let Some(material) = scene.material(id) {
            let mut child = TreeNode::new(&material.name, NodeType::Material)
                .with_metadata("id", id);
            for texture in material
                .properties
                .values()
                .flat_map(|property| &property.textures)
            {
                child = child.with_texture(texture);
            }
            tree = tree.add_child(child);
        }
    }

    for &child in scene.children(node) {
        tree = tree.add_child(node_tree(scene, child, depth + 1, max_depth));
    }

    tree
}

fn mesh_tree(mesh: &Mesh) -> TreeNode {
    let mut tree = TreeNode::new(&mesh.name, NodeType::Mesh)
        .with_metadata("control points", mesh.control_point_count())
        .with_metadata("polygons", mesh.polygon_count());

    if mesh.has_skin() {
        let clusters: usize = mesh.skins.iter().map(|skin| skin.clusters.len()).sum();
        tree = tree.with_metadata("skin", format_count(clusters, "cluster"));
    }
    if mesh.has_blend_shapes() {
        let channels: usize = mesh
            .blend_shapes
            .iter()
            .map(|blend_shape| blend_shape.channels.len())
            .sum();
        tree = tree.with_metadata("blend shapes", format_count(channels, "channel"));
    }

    tree
}
