//! Geometry embedding and material binding for preview scenes.

use anyhow::Result;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::Path;

use crate::globals::*;
use crate::gltf2mtlx::primitive_paths;
use crate::mtlx::Document;
use crate::util::{json_array_entry, load_gltf_json, GLB_MAGIC};

use super::material::material_names;

const GRID_SPACING: f64 = 2.5;
const MESH_POSTFIX: &str = "_material_";

/// Load a `.gltf` or `.glb` file to embed in the output.
///
/// Primitives without a material are bound to material 0. Buffer data stays
/// referenced by URI; the binary chunk of a GLB is not carried over.
pub fn load_geometry(path: &Path) -> Result<Map<String, JsonValue>> {
    let JsonValue::Object(mut gltf) = load_gltf_json(path)? else {
        anyhow::bail!("glTF geometry file is not a JSON object: {}", path.display());
    };

    let is_glb = std::fs::read(path)
        .map(|bytes| bytes.starts_with(GLB_MAGIC))
        .unwrap_or(false);
    if is_glb {
        log::warn!(
            "Binary buffer of {} is not embedded; buffers without a URI will be invalid",
            path.display()
        );
    }

    if let Some(meshes) = gltf.get_mut("meshes").and_then(JsonValue::as_array_mut) {
        for mesh in meshes {
            let Some(primitives) = mesh.get_mut("primitives").and_then(JsonValue::as_array_mut) else {
                continue;
            };
            for primitive in primitives.iter_mut().filter_map(JsonValue::as_object_mut) {
                primitive.entry("material").or_insert(JsonValue::from(0));
            }
        }
    }

    Ok(gltf)
}

/// Add a copy of every mesh for each material after the first.
///
/// Copies are placed on a grid in scene 0 with `row_count` copies per row,
/// so every material can be previewed side by side.
pub fn create_prims_for_materials(gltf: &mut Map<String, JsonValue>, row_count: usize) {
    let material_count = gltf
        .get("materials")
        .and_then(JsonValue::as_array)
        .map_or(0, Vec::len);
    let has_scene = gltf
        .get("scenes")
        .and_then(JsonValue::as_array)
        .is_some_and(|scenes| !scenes.is_empty());
    let has_nodes = gltf
        .get("nodes")
        .and_then(JsonValue::as_array)
        .is_some_and(|nodes| !nodes.is_empty());
    if material_count <= 1 || !has_scene || !has_nodes {
        return;
    }
    let row_count = row_count.max(1);

    let meshes: Vec<JsonValue> = gltf
        .get("meshes")
        .and_then(JsonValue::as_array)
        .cloned()
        .unwrap_or_default();
    let mut mesh_index = meshes.len();
    let mut mesh_copies = Vec::new();
    let mut node_copies = Vec::new();

    let mut x = GRID_SPACING;
    let mut y = 0.0;
    for material_id in 1..material_count {
        for (index, mesh) in meshes.iter().enumerate() {
            if mesh.get("primitives").is_none() {
                continue;
            }
            let mut copy = mesh.clone();
            if let Some(primitives) = copy.get_mut("primitives").and_then(JsonValue::as_array_mut) {
                for primitive in primitives.iter_mut().filter_map(JsonValue::as_object_mut) {
                    primitive.insert("material".into(), JsonValue::from(material_id));
                }
            }
            let base_name = mesh
                .get("name")
                .and_then(JsonValue::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("{}{}", GLTF_DEFAULT_MESH_PREFIX, index));
            let name = format!("{}{}{}", base_name, MESH_POSTFIX, material_id);
            if let Some(copy) = copy.as_object_mut() {
                copy.insert("name".into(), JsonValue::from(name.as_str()));
            }
            mesh_copies.push(copy);

            node_copies.push(json!({
                "name": name,
                "mesh": mesh_index,
                "translation": [x, y, 0.0],
            }));
            mesh_index += 1;
        }

        x += GRID_SPACING;
        if (material_id + 1) % row_count == 0 {
            x = 0.0;
            y += GRID_SPACING;
        }
    }

    json_array_entry(gltf, "meshes").extend(mesh_copies);
    let nodes = json_array_entry(gltf, "nodes");
    let first_new = nodes.len();
    nodes.extend(node_copies);
    let node_count = nodes.len();

    if let Some(scene) = gltf
        .get_mut("scenes")
        .and_then(JsonValue::as_array_mut)
        .and_then(|scenes| scenes.first_mut())
        .and_then(JsonValue::as_object_mut)
    {
        json_array_entry(scene, "nodes").extend((first_new..node_count).map(JsonValue::from));
    }
}

/// glTF material index of every MaterialX material node that has a
/// written shader.
fn material_indices(doc: &Document, gltf: &Map<String, JsonValue>) -> HashMap<String, usize> {
    let names = material_names(gltf);
    let index_of = |name: &str| names.iter().position(|n| n.as_deref() == Some(name));

    let mut indices = HashMap::new();
    for (index, name) in names.iter().enumerate() {
        if let Some(name) = name {
            indices.insert(format!("{}{}", MTLX_MATERIAL_PREFIX, name), index);
        }
    }
    for material in doc.material_nodes() {
        let shader_index = doc
            .shader_nodes(material)
            .iter()
            .find_map(|shader| index_of(&shader.name_path()));
        if let Some(index) = shader_index {
            indices.insert(material.name.clone(), index);
        }
    }
    indices
}

/// Bind primitives to materials from the material assignments of all looks.
///
/// Assignment geometry is a comma separated list of primitive paths as
/// produced by [`primitive_paths`]. Returns the number of primitives bound.
pub fn assign_materials(doc: &Document, gltf: &mut Map<String, JsonValue>) -> usize {
    let indices = material_indices(doc, gltf);
    if indices.is_empty() {
        log::debug!("No glTF materials to assign");
        return 0;
    }
    let paths = primitive_paths(&JsonValue::Object(gltf.clone()));
    if paths.is_empty() {
        log::debug!("No mesh primitives to assign materials to");
        return 0;
    }

    let mut assigned = 0;
    for assign in doc.material_assigns() {
        let material = assign.attribute("material").unwrap_or("");
        let Some(&index) = indices.get(material) else {
            log::debug!("Material {} was not written to glTF", material);
            continue;
        };
        let geom = assign.attribute("geom").unwrap_or("");
        for item in geom.split(',').map(str::trim).filter(|g| !g.is_empty()) {
            for prim in paths.iter().filter(|p| p.path == item) {
                let primitive = gltf
                    .get_mut("meshes")
                    .and_then(|m| m.get_mut(prim.mesh))
                    .and_then(|m| m.get_mut("primitives"))
                    .and_then(|p| p.get_mut(prim.primitive))
                    .and_then(JsonValue::as_object_mut);
                if let Some(primitive) = primitive {
                    primitive.insert("material".into(), JsonValue::from(index));
                    assigned += 1;
                }
            }
        }
    }
    assigned
}
