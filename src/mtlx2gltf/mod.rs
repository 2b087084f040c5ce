//! MaterialX to glTF conversion.
//!
//! `gltf_pbr` and `surface_unlit` shaders bound to materials are written as
//! glTF material entries, with image nodes becoming textures, images and
//! samplers. Optionally a geometry file is embedded so the result can be
//! previewed directly, and the output can be packaged as a binary GLB.
//!
//! # Example
//!
//! ```ignore
//! use materialxgltf::mtlx::parse_mtlx_file;
//! use materialxgltf::mtlx2gltf::{MtlxToGltfOptions, MtlxToGltfWriter};
//! use std::path::Path;
//!
//! let doc = parse_mtlx_file(Path::new("brass.mtlx"))?;
//! let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
//! let json = writer.convert(&doc)?;
//! std::fs::write("brass.gltf", json)?;
//! ```

mod geometry;
mod material;
mod orm;
mod package;
mod procedural;
mod translate;

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::path::PathBuf;

use crate::mtlx::Document;
use crate::util::{ConversionLog, FileSearchPath};

pub use geometry::{assign_materials, create_prims_for_materials, load_geometry};
pub use package::PackageReport;

/// MaterialX to glTF conversion options.
#[derive(Debug, Clone, PartialEq)]
pub struct MtlxToGltfOptions {
    /// Translate shaders other than `gltf_pbr` / `surface_unlit` first
    pub translate_shaders: bool,
    /// Package the written glTF as a GLB file
    pub package_binary: bool,
    /// glTF or GLB file whose scene is embedded in the output
    pub geometry_file: Option<PathBuf>,
    /// Add a copy of the geometry for every material after the first
    pub prims_per_material: bool,
    /// Bind materials to primitives from look material assignments
    pub assign_from_looks: bool,
    /// Report progress at info level
    pub debug_output: bool,
    /// Export node graph textures as `KHR_procedurals`
    pub create_procedural_textures: bool,
    /// Directories searched for images during merging and packaging
    pub search_path: FileSearchPath,
    /// Write input values even when they match the definition default
    pub write_default_inputs: bool,
    /// `asset.copyright` of the output
    pub copyright: Option<String>,
}

impl Default for MtlxToGltfOptions {
    fn default() -> Self {
        Self {
            translate_shaders: false,
            package_binary: false,
            geometry_file: None,
            prims_per_material: true,
            assign_from_looks: false,
            debug_output: true,
            create_procedural_textures: false,
            search_path: FileSearchPath::new(),
            write_default_inputs: false,
            copyright: None,
        }
    }
}

/// Writes MaterialX materials as glTF.
#[derive(Debug, Clone, Default)]
pub struct MtlxToGltfWriter {
    options: MtlxToGltfOptions,
    log: ConversionLog,
}

impl MtlxToGltfWriter {
    pub fn new(options: MtlxToGltfOptions) -> Self {
        let log = ConversionLog::new(options.debug_output);
        Self { options, log }
    }

    pub fn options(&self) -> &MtlxToGltfOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MtlxToGltfOptions) {
        self.log.set_verbose(options.debug_output);
        self.options = options;
    }

    /// Conversion messages accumulated so far.
    pub fn log(&self) -> String {
        self.log.text()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Convert a document to indented glTF JSON text.
    ///
    /// A document without `gltf_pbr` or `surface_unlit` materials yields
    /// the geometry alone, or an empty object without a geometry file.
    pub fn convert(&mut self, doc: &Document) -> Result<String> {
        let mut gltf = Map::new();

        if let Some(geometry_file) = self.options.geometry_file.clone() {
            if geometry_file.exists() {
                self.log
                    .log(format!("- Embedding glTF geometry file: {}", geometry_file.display()));
                gltf = load_geometry(&geometry_file)?;
            } else {
                self.log
                    .warn(format!("- glTF geometry file not found: {}", geometry_file.display()));
            }
        }

        let written = self.materialx_to_gltf(doc, &mut gltf, true);
        if written == 0 {
            self.log
                .warn("- No gltf_pbr or surface_unlit materials found to convert");
        }

        if self.options.assign_from_looks {
            let assigned = assign_materials(doc, &mut gltf);
            self.log
                .log(format!("- Assigned materials to {} primitives from looks", assigned));
        }

        if self.options.prims_per_material && written > 0 {
            self.log
                .log(format!("- Generating a new primitive for each of {} materials", written));
            let row_count = (written as f64).sqrt() as usize;
            create_prims_for_materials(&mut gltf, row_count);
        }

        serde_json::to_string_pretty(&JsonValue::Object(gltf)).context("Failed to serialize glTF JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtlx::parse_mtlx;

    const BRASS: &str = r#"<?xml version="1.0"?>
<materialx version="1.38">
  <gltf_pbr name="Brass" type="surfaceshader">
    <input name="base_color" type="color3" value="0.9, 0.7, 0.3" />
    <input name="metallic" type="float" value="1" />
    <input name="roughness" type="float" value="0.3" />
  </gltf_pbr>
  <surfacematerial name="MAT_Brass" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="Brass" />
  </surfacematerial>
</materialx>"#;

    #[test]
    fn test_convert_without_geometry() {
        let doc = parse_mtlx(BRASS).unwrap();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        let text = writer.convert(&doc).unwrap();
        let json: JsonValue = serde_json::from_str(&text).unwrap();

        assert_eq!(json["asset"]["version"], "2.0");
        assert_eq!(json["asset"]["generator"], "MaterialX 1.38 to glTF 2.0 generator");
        assert!(json["asset"].get("copyright").is_none());
        assert_eq!(json["materials"][0]["name"], "Brass");
        assert!(json.get("meshes").is_none());
        assert!(text.contains("\n  \"asset\""));
    }

    #[test]
    fn test_convert_empty_document() {
        let doc = Document::new();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        let json: JsonValue = serde_json::from_str(&writer.convert(&doc).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({}));
        assert!(writer.log().contains("No gltf_pbr or surface_unlit materials"));
    }

    #[test]
    fn test_untranslated_shaders_keep_geometry() {
        let doc = parse_mtlx(
            r#"<materialx version="1.38">
  <standard_surface name="Marble" type="surfaceshader" />
  <surfacematerial name="MAT_Marble" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="Marble" />
  </surfacematerial>
</materialx>"#,
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let geometry = dir.path().join("scene.gltf");
        let scene = serde_json::json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "Box", "mesh": 0 }],
            "meshes": [{ "primitives": [{ "attributes": {} }] }],
            "materials": [{ "name": "Old" }, { "name": "Older" }]
        });
        std::fs::write(&geometry, scene.to_string()).unwrap();

        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions {
            geometry_file: Some(geometry),
            ..Default::default()
        });
        let json: JsonValue = serde_json::from_str(&writer.convert(&doc).unwrap()).unwrap();
        assert_eq!(json["nodes"][0]["name"], "Box");
        assert_eq!(json["meshes"].as_array().unwrap().len(), 1);
        assert_eq!(json["meshes"][0]["primitives"][0]["material"], 0);
    }

    #[test]
    fn test_missing_geometry_is_logged() {
        let doc = parse_mtlx(BRASS).unwrap();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions {
            geometry_file: Some(PathBuf::from("missing/geometry.gltf")),
            copyright: Some("Copyright Example".to_string()),
            ..Default::default()
        });
        let json: JsonValue = serde_json::from_str(&writer.convert(&doc).unwrap()).unwrap();
        assert!(writer.log().contains("geometry file not found"));
        assert_eq!(json["asset"]["copyright"], "Copyright Example");
    }
}
