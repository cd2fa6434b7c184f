//! Mesh baking and deformation for parsed 3D scenes
//!
//! `scene-bake-core` turns a scene graph (nodes, meshes, materials, skins,
//! blend shapes, poses) into flat, renderer-ready vertex buffers evaluated
//! at one point in time.
//!
//! ```rust,no_run
//! use scene_bake_core::{BakeOptions, ExportOptions, SceneDocument, bake_scene, export_to_path};
//!
//! let scene = SceneDocument::from_path("character.json")?;
//! let output = bake_scene(&scene, &BakeOptions::at_time(1.5))?;
//!
//! for mesh in &output.meshes {
//!     println!("{}: {} triangles", mesh.name, mesh.triangle_count());
//! }
//!
//! export_to_path(&output, "character.baked.json", &ExportOptions::default())?;
//! # Ok::<(), scene_bake_core::BakeError>(())
//! ```

pub mod bake;
pub mod dual_quat;
pub mod error;
pub mod export;
pub mod material;
pub mod math;
pub mod packer;
pub mod scene;
pub mod shape;
pub mod skin;
pub mod transform;

// Re-export common types
pub use bake::{BakeOptions, BakeOutput, BakeState, MeshFailure, PoseSelection, bake_mesh, bake_scene};
pub use error::{BakeError, Result};
pub use export::{ExportOptions, export_to_json, export_to_path};
pub use material::{BakedMaterial, ColorChannel, MaterialCache, bake_material};
pub use packer::{BakedMesh, SubMesh, VertexLayout, pack};
pub use scene::{MaterialId, NodeId, SceneDocument, SceneGraph};
pub use transform::EvalContext;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
