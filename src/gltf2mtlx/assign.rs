//! Geometry paths of glTF primitives and the materials bound to them.

use serde_json::Value as JsonValue;

use crate::globals::*;
use crate::mtlx::create_valid_name;
use crate::util::json_array;

/// A mesh primitive reached from a scene, with its geometry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitivePath {
    /// Slash separated path, e.g. `/Root/Cube` or `/NODE_0/MESH_0/PRIMITIVE_1`
    pub path: String,
    pub mesh: usize,
    pub primitive: usize,
    /// Bound material index
    pub material: Option<usize>,
    /// The primitive carries a `COLOR_<n>` attribute
    pub has_vertex_color: bool,
}

#[derive(Default)]
struct Counters {
    node: usize,
    mesh: usize,
}

/// Every primitive instanced by a scene node, in traversal order.
///
/// Unnamed nodes and meshes get `NODE_<n>` / `MESH_<n>` segments, numbered
/// per scene. Meshes with several primitives add a `PRIMITIVE_<i>` segment.
pub fn primitive_paths(gltf: &JsonValue) -> Vec<PrimitivePath> {
    let nodes = json_array(gltf, "nodes");
    let meshes = json_array(gltf, "meshes");
    let mut result = Vec::new();

    for scene in json_array(gltf, "scenes") {
        let mut counters = Counters::default();
        for index in json_array(scene, "nodes").iter().filter_map(JsonValue::as_u64) {
            let mut visited = Vec::new();
            visit_node(nodes, meshes, index as usize, "", &mut counters, &mut visited, &mut result);
        }
    }

    result
}

fn visit_node(
    nodes: &[JsonValue],
    meshes: &[JsonValue],
    index: usize,
    parent_path: &str,
    counters: &mut Counters,
    visited: &mut Vec<usize>,
    result: &mut Vec<PrimitivePath>,
) {
    let Some(node) = nodes.get(index) else {
        log::warn!("Scene references missing node {}", index);
        return;
    };
    if visited.contains(&index) {
        log::warn!("Node {} is its own ancestor", index);
        return;
    }

    let node_name = match node.get("name").and_then(JsonValue::as_str) {
        Some(name) => name.to_string(),
        None => {
            let name = format!("{}{}", GLTF_DEFAULT_NODE_PREFIX, counters.node);
            counters.node += 1;
            name
        }
    };
    let path = format!("{}/{}", parent_path, create_valid_name(&node_name));

    if let Some(mesh_index) = node.get("mesh").and_then(JsonValue::as_u64) {
        let mesh_index = mesh_index as usize;
        if let Some(mesh) = meshes.get(mesh_index) {
            let mesh_name = match mesh.get("name").and_then(JsonValue::as_str) {
                Some(name) => name.to_string(),
                None => {
                    let name = format!("{}{}", GLTF_DEFAULT_MESH_PREFIX, counters.mesh);
                    counters.mesh += 1;
                    name
                }
            };
            let mesh_path = format!("{}/{}", path, create_valid_name(&mesh_name));

            let primitives = json_array(mesh, "primitives");
            for (prim_index, primitive) in primitives.iter().enumerate() {
                let prim_path = if primitives.len() == 1 {
                    mesh_path.clone()
                } else {
                    format!("{}/{}{}", mesh_path, GLTF_DEFAULT_PRIMITIVE_PREFIX, prim_index)
                };
                let has_vertex_color = primitive
                    .get("attributes")
                    .and_then(JsonValue::as_object)
                    .is_some_and(|attrs| attrs.keys().any(|k| k.starts_with("COLOR_")));
                result.push(PrimitivePath {
                    path: prim_path,
                    mesh: mesh_index,
                    primitive: prim_index,
                    material: primitive
                        .get("material")
                        .and_then(JsonValue::as_u64)
                        .map(|m| m as usize),
                    has_vertex_color,
                });
            }
        }
    }

    visited.push(index);
    for child in json_array(node, "children").iter().filter_map(JsonValue::as_u64) {
        visit_node(nodes, meshes, child as usize, &path, counters, visited, result);
    }
    visited.pop();
}

/// Material to geometry bindings of a glTF scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshMaterials {
    /// Material name with its geometry paths, in first use order
    pub assignments: Vec<(String, Vec<String>)>,
    /// Materials bound to at least one primitive with vertex colors
    pub cpv_materials: Vec<String>,
}

/// Collect the geometry paths using each material.
///
/// `material_names` maps glTF material indices to the generated MaterialX
/// material names.
pub fn compute_mesh_materials(gltf: &JsonValue, material_names: &[String]) -> MeshMaterials {
    let mut result = MeshMaterials::default();

    for prim in primitive_paths(gltf) {
        let Some(name) = prim.material.and_then(|m| material_names.get(m)) else {
            continue;
        };

        match result.assignments.iter_mut().find(|(m, _)| m == name) {
            Some((_, paths)) => paths.push(prim.path),
            None => result.assignments.push((name.clone(), vec![prim.path])),
        }

        if prim.has_vertex_color && !result.cpv_materials.contains(name) {
            log::debug!("Vertex colors found for material {}", name);
            result.cpv_materials.push(name.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scene() -> JsonValue {
        json!({
            "scenes": [{ "nodes": [0, 2] }],
            "nodes": [
                { "name": "Root node", "children": [1] },
                { "mesh": 0 },
                { "mesh": 1 }
            ],
            "meshes": [
                { "name": "Cube", "primitives": [{ "material": 0 }] },
                { "primitives": [
                    { "material": 1, "attributes": { "POSITION": 0, "COLOR_0": 1 } },
                    { "material": 0 }
                ] }
            ]
        })
    }

    #[test]
    fn test_primitive_paths() {
        let paths: Vec<_> = primitive_paths(&scene()).into_iter().map(|p| p.path).collect();
        assert_eq!(
            paths,
            vec![
                "/Root_node/NODE_0/Cube",
                "/NODE_1/MESH_0/PRIMITIVE_0",
                "/NODE_1/MESH_0/PRIMITIVE_1",
            ]
        );
    }

    #[test]
    fn test_compute_mesh_materials() {
        let names = vec!["MAT_a".to_string(), "MAT_b".to_string()];
        let result = compute_mesh_materials(&scene(), &names);

        assert_eq!(
            result.assignments,
            vec![
                (
                    "MAT_a".to_string(),
                    vec![
                        "/Root_node/NODE_0/Cube".to_string(),
                        "/NODE_1/MESH_0/PRIMITIVE_1".to_string()
                    ]
                ),
                ("MAT_b".to_string(), vec!["/NODE_1/MESH_0/PRIMITIVE_0".to_string()]),
            ]
        );
        assert_eq!(result.cpv_materials, vec!["MAT_b".to_string()]);
    }

    #[test]
    fn test_unnamed_siblings_get_distinct_paths() {
        let gltf = json!({
            "scenes": [{ "nodes": [0] }],
            "nodes": [
                { "name": "Root", "children": [1, 2] },
                { "mesh": 0 },
                { "mesh": 1 }
            ],
            "meshes": [
                { "primitives": [{ "material": 0 }] },
                { "primitives": [{ "material": 1 }] }
            ]
        });
        let paths: Vec<_> = primitive_paths(&gltf).into_iter().map(|p| p.path).collect();
        assert_eq!(paths, vec!["/Root/NODE_0/MESH_0", "/Root/NODE_1/MESH_1"]);
    }

    #[test]
    fn test_node_cycles_terminate() {
        let gltf = json!({
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "a", "children": [0], "mesh": 0 }],
            "meshes": [{ "name": "m", "primitives": [{}] }]
        });
        assert_eq!(primitive_paths(&gltf).len(), 1);
    }
}
