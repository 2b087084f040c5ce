//! glTF to MaterialX conversion.
//!
//! Every glTF material becomes a `gltf_pbr` (or `surface_unlit`) shader
//! node plus a `surfacematerial`. Textures become `gltf_image` style nodes
//! carrying the sampler and texture transform settings.
//!
//! # Example
//!
//! ```ignore
//! use materialxgltf::gltf2mtlx::{GltfToMtlxOptions, GltfToMtlxReader};
//! use std::path::Path;
//!
//! let mut reader = GltfToMtlxReader::new(GltfToMtlxOptions {
//!     create_assignments: true,
//!     ..Default::default()
//! });
//! let doc = reader.convert_file(Path::new("BoomBox.gltf"))?;
//! doc.write_file(Path::new("BoomBox.mtlx"))?;
//! ```

mod assign;
mod material;

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::globals::*;
use crate::mtlx::{Document, Element};
use crate::util::{load_gltf_json, ConversionLog};

pub use assign::{compute_mesh_materials, primitive_paths, MeshMaterials, PrimitivePath};

/// glTF to MaterialX conversion options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GltfToMtlxOptions {
    /// Add a look with material assignments for every mesh primitive
    pub create_assignments: bool,
    /// Add every node definition input to generated shaders
    pub add_all_inputs: bool,
    /// Report progress at info level
    pub debug_output: bool,
}

impl Default for GltfToMtlxOptions {
    fn default() -> Self {
        Self {
            create_assignments: false,
            add_all_inputs: false,
            debug_output: true,
        }
    }
}

/// Reads glTF material definitions into MaterialX documents.
#[derive(Debug, Clone, Default)]
pub struct GltfToMtlxReader {
    options: GltfToMtlxOptions,
    log: ConversionLog,
}

impl GltfToMtlxReader {
    pub fn new(options: GltfToMtlxOptions) -> Self {
        let log = ConversionLog::new(options.debug_output);
        Self { options, log }
    }

    pub fn options(&self) -> &GltfToMtlxOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: GltfToMtlxOptions) {
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

    /// Convert a `.gltf` or `.glb` file.
    pub fn convert_file(&mut self, path: &Path) -> Result<Document> {
        if !path.exists() {
            self.log.warn(format!("File not found: {}", path.display()));
            anyhow::bail!("File not found: {}", path.display());
        }

        self.log.log(format!("Read glTF file: {}", path.display()));
        let gltf = load_gltf_json(path)?;
        self.convert(&gltf)
            .with_context(|| format!("Failed to convert glTF file: {}", path.display()))
    }

    /// Convert parsed glTF JSON into a new MaterialX document.
    pub fn convert(&mut self, gltf: &JsonValue) -> Result<Document> {
        let mut doc = Document::new();
        let material_names = self.gltf_to_materialx(&mut doc, gltf)?;

        let mesh_materials = compute_mesh_materials(gltf, &material_names);
        for material in &mesh_materials.cpv_materials {
            self.add_vertex_color(&mut doc, material);
        }

        if self.options.create_assignments && !mesh_materials.assignments.is_empty() {
            doc.add_comment(" Generated material assignments ");
            let look = doc.root.add_child(Element::new("look", "look"));
            for (material, paths) in &mesh_materials.assignments {
                let assign = look.add_child(Element::new("materialassign", material.as_str()));
                assign.set_attribute("material", material.as_str());
                assign.set_attribute("geom", paths.join(","));
            }
            self.log.log(format!(
                "Created {} material assignments",
                mesh_materials.assignments.len()
            ));
        }

        Ok(doc)
    }

    /// Modulate the base color image of a material by the vertex colors.
    fn add_vertex_color(&mut self, doc: &mut Document, material: &str) {
        let image_name = doc.node(material).and_then(|material| {
            let shader = doc.shader_nodes(material).into_iter().next()?;
            ["base_color", "emission_color"]
                .iter()
                .find_map(|input| doc.connected_node_of(shader, input))
                .filter(|image| image.graph.is_none())
                .filter(|image| image.node.node_def().is_some_and(|nd| nd.input("geomcolor").is_some()))
                .map(|image| image.node.name.clone())
        });
        let Some(image_name) = image_name else {
            self.log
                .log(format!("No color image to apply vertex colors to for: {}", material));
            return;
        };

        let geomcolor = doc.add_node("geomcolor", "", "color4").name.clone();
        if let Some(input) = doc
            .node_mut(&image_name)
            .and_then(|image| image.add_input_from_nodedef("geomcolor"))
        {
            input.set_node_name(&geomcolor);
        }
        self.log
            .log(format!("Added vertex colors to {} for material {}", image_name, material));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn textured_scene() -> JsonValue {
        json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "Box", "mesh": 0 }],
            "meshes": [{
                "name": "BoxMesh",
                "primitives": [{ "material": 0, "attributes": { "POSITION": 0, "COLOR_0": 1 } }]
            }],
            "materials": [{
                "name": "Painted",
                "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
            }],
            "textures": [{ "source": 0 }],
            "images": [{ "uri": "paint.png" }]
        })
    }

    #[test]
    fn test_vertex_colors_feed_base_color_image() {
        let mut reader = GltfToMtlxReader::new(GltfToMtlxOptions::default());
        let doc = reader.convert(&textured_scene()).unwrap();

        let image = doc.node("image_base_color").unwrap();
        let geomcolor = image.input("geomcolor").unwrap();
        let node = doc.node(geomcolor.attribute("nodename").unwrap()).unwrap();
        assert_eq!(node.category, "geomcolor");
        assert_eq!(node.type_string(), "color4");
        assert!(doc.looks().next().is_none());
    }

    #[test]
    fn test_create_assignments() {
        let mut reader = GltfToMtlxReader::new(GltfToMtlxOptions {
            create_assignments: true,
            ..Default::default()
        });
        let doc = reader.convert(&textured_scene()).unwrap();

        let look = doc.looks().next().unwrap();
        assert_eq!(look.name, "look");
        let assign = look.child("MAT_Painted").unwrap();
        assert_eq!(assign.category, "materialassign");
        assert_eq!(assign.attribute("material"), Some("MAT_Painted"));
        assert_eq!(assign.attribute("geom"), Some("/Box/BoxMesh"));
        assert!(doc.validate().is_empty(), "{:?}", doc.validate());
    }

    #[test]
    fn test_convert_missing_file() {
        let mut reader = GltfToMtlxReader::new(GltfToMtlxOptions::default());
        assert!(reader.convert_file(Path::new("does/not/exist.gltf")).is_err());
        assert!(reader.log().contains("File not found"));
        reader.clear_log();
        assert!(reader.log().is_empty());
    }
}
