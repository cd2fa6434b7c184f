//! Root CLI structure for scene-bake

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scene-bake")]
#[command(about = "Bake animated scenes into renderer-ready meshes", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bake every mesh of a scene at one point in time
    Bake(crate::commands::bake::BakeArgs),

    /// Show the node hierarchy of a scene
    Info(crate::commands::info::InfoArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
