//! JSON export of baked meshes and materials

use crate::bake::BakeOutput;
use crate::error::Result;
use crate::material::BakedMaterial;
use crate::packer::BakedMesh;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export formatting options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Indent the JSON output
    pub pretty: bool,
    /// Write the baked material table
    pub include_materials: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            include_materials: true,
        }
    }
}

/// Serialized shape of a bake pass
#[derive(Serialize)]
struct ExportDocument<'a> {
    time: f64,
    meshes: &'a [BakedMesh],
    /// Keyed by material id
    #[serde(skip_serializing_if = "Option::is_none")]
    materials: Option<BTreeMap<String, &'a BakedMaterial>>,
}

impl<'a> ExportDocument<'a> {
    fn new(output: &'a BakeOutput, options: &ExportOptions) -> Self {
        let materials = options.include_materials.then(|| {
            output
                .materials
                .iter()
                .map(|(id, material)| (id.to_string(), material))
                .collect()
        });

        Self {
            time: output.time,
            meshes: &output.meshes,
            materials,
        }
    }
}

/// Write a bake pass as JSON
pub fn export_to_json<W: Write>(
    output: &BakeOutput,
    writer: W,
    options: &ExportOptions,
) -> Result<()> {
    let document = ExportDocument::new(output, options);
    if options.pretty {
        serde_json::to_writer_pretty(writer, &document)?;
    } else {
        serde_json::to_writer(writer, &document)?;
    }
    Ok(())
}

/// Write a bake pass as JSON to a file, replacing it if it exists
pub fn export_to_path<P: AsRef<Path>>(
    output: &BakeOutput,
    path: P,
    options: &ExportOptions,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    export_to_json(output, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}
