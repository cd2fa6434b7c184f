//! `bake` command: evaluate a scene at one time and write the baked meshes

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use log::{info, warn};
use std::path::PathBuf;

use scene_bake_core::{
    BakeOptions, BakeOutput, ExportOptions, PoseSelection, SceneDocument, bake_scene,
    export_to_path,
};

use crate::utils::{add_count_row, create_spinner, create_table, format_bytes, format_seconds};

#[derive(Args)]
pub struct BakeArgs {
    /// Path to the scene document (JSON)
    pub input: PathBuf,

    /// Path to write the baked meshes to
    pub output: PathBuf,

    /// Evaluation time in seconds
    #[arg(short, long, default_value_t = 0.0, value_name = "SECONDS")]
    pub time: f64,

    /// Evaluate through the pose at this index instead of the animation
    #[arg(long, value_name = "INDEX", conflicts_with_all = ["pose_name", "bind_pose"])]
    pub pose: Option<usize>,

    /// Evaluate through the pose with this name
    #[arg(long, value_name = "NAME", conflicts_with = "bind_pose")]
    pub pose_name: Option<String>,

    /// Evaluate through the first bind pose of the scene
    #[arg(long)]
    pub bind_pose: bool,

    /// Bake meshes on a worker pool
    #[arg(long)]
    pub parallel: bool,

    /// Indent the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Leave the material table out of the output
    #[arg(long)]
    pub no_materials: bool,
}

impl BakeArgs {
    fn pose_selection(&self) -> PoseSelection {
        if let Some(index) = self.pose {
            PoseSelection::Index(index)
        } else if let Some(name) = &self.pose_name {
            PoseSelection::Name(name.clone())
        } else if self.bind_pose {
            PoseSelection::FirstBindPose
        } else {
            PoseSelection::None
        }
    }

    fn bake_options(&self) -> BakeOptions {
        BakeOptions {
            time: self.time,
            pose: self.pose_selection(),
            parallel: self.parallel,
        }
    }

    fn export_options(&self) -> ExportOptions {
        ExportOptions {
            pretty: self.pretty,
            include_materials: !self.no_materials,
        }
    }
}

pub fn execute(args: BakeArgs) -> Result<()> {
    let scene = SceneDocument::from_path(&args.input)
        .with_context(|| format!("Failed to load scene: {}", args.input.display()))?;
    info!(
        "Loaded {} nodes, {} meshes from {}",
        scene.nodes.len(),
        scene.meshes.len(),
        args.input.display()
    );

    let spinner = create_spinner("Baking meshes...");
    let output = bake_scene(&scene, &args.bake_options());
    spinner.finish_and_clear();
    let output = output.context("Failed to bake scene")?;

    export_to_path(&output, &args.output, &args.export_options())
        .with_context(|| format!("Failed to write output file: {}", args.output.display()))?;

    print_summary(&args, &output)?;
    Ok(())
}

fn print_summary(args: &BakeArgs, output: &BakeOutput) -> Result<()> {
    println!("\n{}", style("Bake Summary").bold().underlined());
    println!("Scene: {}", style(args.input.display()).cyan());
    println!("Time: {}", style(format_seconds(output.time)).yellow());

    if output.meshes.is_empty() {
        warn!("No meshes were baked from {}", args.input.display());
        println!("{}", style("⚠ No meshes were baked").yellow());
    } else {
        let mut table = create_table(vec!["Mesh", "Vertices", "Triangles", "Submeshes"]);
        for mesh in &output.meshes {
            add_count_row(
                &mut table,
                &mesh.name,
                &[mesh.vertex_count(), mesh.triangle_count(), mesh.submeshes.len()],
            );
        }
        println!();
        table.printstd();
        println!(
            "Total: {} vertices, {} triangles",
            style(output.vertex_count()).green(),
            style(output.triangle_count()).green()
        );
    }

    if !args.no_materials {
        println!("Materials: {}", style(output.materials.len()).green());
    }

    if !output.failures.is_empty() {
        println!("\n{}", style("Failed Meshes").bold().red());
        for failure in &output.failures {
            println!(
                "  ✗ {} ({}): {}",
                style(&failure.name).red(),
                failure.node,
                failure.error
            );
        }
    }

    let size = std::fs::metadata(&args.output)
        .with_context(|| format!("Failed to read output file: {}", args.output.display()))?
        .len();
    println!(
        "\n✓ Wrote {} ({})",
        style(args.output.display()).cyan(),
        format_bytes(size)
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: BakeArgs,
    }

    fn parse(extra: &[&str]) -> BakeArgs {
        let mut argv = vec!["bake", "in.json", "out.json"];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        let options = args.bake_options();
        assert_eq!(options.time, 0.0);
        assert_eq!(options.pose, PoseSelection::None);
        assert!(!options.parallel);
        assert_eq!(args.export_options(), ExportOptions::default());
    }

    #[test]
    fn test_pose_flags() {
        assert_eq!(parse(&["--pose", "2"]).pose_selection(), PoseSelection::Index(2));
        assert_eq!(
            parse(&["--pose-name", "Bind"]).pose_selection(),
            PoseSelection::Name("Bind".to_string())
        );
        assert_eq!(parse(&["--bind-pose"]).pose_selection(), PoseSelection::FirstBindPose);
    }

    #[test]
    fn test_pose_flags_conflict() {
        let argv = ["bake", "in.json", "out.json", "--pose", "0", "--bind-pose"];
        assert!(Harness::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_output_flags() {
        let args = parse(&["-t", "1.25", "--parallel", "--pretty", "--no-materials"]);
        let options = args.bake_options();
        assert_eq!(options.time, 1.25);
        assert!(options.parallel);
        assert_eq!(
            args.export_options(),
            ExportOptions {
                pretty: true,
                include_materials: false,
            }
        );
    }
}
