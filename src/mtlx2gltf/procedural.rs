//! `KHR_procedurals` export of node graphs.
//!
//! Each graph node, graph input and graph output becomes one entry of the
//! top level `procedurals` list. Connections are stored as indices into that
//! list and image files as texture indices.

use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;

use crate::globals::*;
use crate::mtlx::{Element, NodeRef, Value};

use super::material::{GltfTables, ShaderContext, KHR_PROCEDURALS};
use super::MtlxToGltfWriter;

const SKIPPED_ATTRIBUTES: [&str; 3] = ["uiname", "xpos", "ypos"];

fn value_json(input: &Element, value: &str) -> JsonValue {
    Value::parse(value, input.type_string())
        .map(|v| v.to_json())
        .unwrap_or_else(|| JsonValue::from(value))
}

/// Name of the graph child an output or input connects to.
fn connection_name(elem: &Element) -> Option<&str> {
    elem.non_empty_attribute(MTLX_INTERFACE_NAME_ATTRIBUTE)
        .or_else(|| elem.non_empty_attribute(MTLX_NODE_NAME_ATTRIBUTE))
}

impl MtlxToGltfWriter {
    /// Texture info referencing the procedural that drives a shader input.
    pub(super) fn write_procedural_texture_info(
        &mut self,
        ctx: ShaderContext,
        tables: &mut GltfTables,
        input_name: &str,
        graph: &Element,
    ) -> Option<Map<String, JsonValue>> {
        if !tables.graphs.contains_key(&graph.name) {
            let indices = self.graph_to_procedurals(ctx, tables, graph);
            tables.graphs.insert(graph.name.clone(), indices);
        }

        let input = ctx.shader.node.input(input_name)?;
        let connection = match input.non_empty_attribute(MTLX_OUTPUT_ATTRIBUTE) {
            Some(output) => format!("{}/{}", graph.name, output),
            None => format!("{}/{}", graph.name, graph.outputs().next()?.name),
        };
        let Some(index) = tables.graphs.get(&graph.name).and_then(|g| g.get(&connection)).copied() else {
            self.log
                .warn(format!("- Procedural output not found: {}", connection));
            return None;
        };

        tables.use_extension(KHR_PROCEDURALS);
        let mut info = Map::new();
        info.insert("index".into(), JsonValue::from(0));
        let mut extension = Map::new();
        extension.insert(KHR_PROCEDURALS.into(), json!({ "index": index }));
        info.insert("extensions".into(), JsonValue::Object(extension));
        Some(info)
    }

    /// Append the procedurals of `graph`, returning their indices by name path.
    fn graph_to_procedurals(
        &mut self,
        ctx: ShaderContext,
        tables: &mut GltfTables,
        graph: &Element,
    ) -> HashMap<String, usize> {
        let path_of = |elem: &Element| format!("{}/{}", graph.name, elem.name);
        let mut indices = HashMap::new();

        // Reserve node entries first so connections can refer forward
        let nodes: Vec<&Element> = graph.nodes().collect();
        for node in &nodes {
            tables.procedurals.push(json!({ "name": path_of(node) }));
            indices.insert(path_of(node), tables.procedurals.len() - 1);
        }

        for input in graph.inputs() {
            let mut entry = Map::new();
            entry.insert("name".into(), JsonValue::from(path_of(input)));
            entry.insert("nodetype".into(), JsonValue::from(input.category.as_str()));
            if let Some(value) = input.value_string() {
                entry.insert("type".into(), JsonValue::from(input.type_string()));
                if input.type_string() == FILENAME_TYPE {
                    let file = ctx.doc.resolved_file_value(Some(graph), input);
                    let texture = tables.add_texture(&path_of(input), &file);
                    entry.insert("texture".into(), JsonValue::from(texture));
                } else {
                    entry.insert("value".into(), value_json(input, value));
                }
            }
            tables.procedurals.push(JsonValue::Object(entry));
            indices.insert(path_of(input), tables.procedurals.len() - 1);
        }

        for output in graph.outputs() {
            let mut entry = Map::new();
            entry.insert("name".into(), JsonValue::from(path_of(output)));
            entry.insert("nodetype".into(), JsonValue::from(output.category.as_str()));
            if let Some(target) = connection_name(output).and_then(|name| graph.child(name)) {
                if let Some(index) = indices.get(&path_of(target)) {
                    entry.insert("procedural".into(), JsonValue::from(*index));
                }
                if let Some(output_name) = output.non_empty_attribute(MTLX_OUTPUT_ATTRIBUTE) {
                    entry.insert("output".into(), JsonValue::from(output_name));
                }
            }
            tables.procedurals.push(JsonValue::Object(entry));
            indices.insert(path_of(output), tables.procedurals.len() - 1);
        }

        for node in nodes {
            let mut entry = Map::new();
            entry.insert("name".into(), JsonValue::from(path_of(node)));
            entry.insert("nodetype".into(), JsonValue::from(node.category.as_str()));
            for (name, value) in node.attributes() {
                if !SKIPPED_ATTRIBUTES.contains(&name) {
                    entry.insert(name.into(), JsonValue::from(value));
                }
            }

            let mut inputs = Vec::new();
            for input in node.inputs() {
                let mut item = Map::new();
                item.insert("name".into(), JsonValue::from(input.name.as_str()));
                if let Some(value) = input.value_string() {
                    item.insert("type".into(), JsonValue::from(input.type_string()));
                    if input.type_string() == FILENAME_TYPE {
                        let file = ctx.doc.resolved_file_value(Some(graph), input);
                        let texture = tables.add_texture(&format!("{}/{}", path_of(node), input.name), &file);
                        let image = NodeRef {
                            node,
                            graph: Some(graph),
                        };
                        self.write_image_properties(ctx.doc, tables, image, texture, None);
                        item.insert("texture".into(), JsonValue::from(texture));
                    } else {
                        item.insert("value".into(), value_json(input, value));
                    }
                } else if let Some(target) = connection_name(input).and_then(|name| graph.child(name)) {
                    item.insert("type".into(), JsonValue::from(input.type_string()));
                    if let Some(index) = indices.get(&path_of(target)) {
                        item.insert("procedural".into(), JsonValue::from(*index));
                    }
                    if let Some(output_name) = input.non_empty_attribute(MTLX_OUTPUT_ATTRIBUTE) {
                        item.insert("output".into(), JsonValue::from(output_name));
                    }
                }
                inputs.push(JsonValue::Object(item));
            }
            if !inputs.is_empty() {
                entry.insert("inputs".into(), JsonValue::Array(inputs));
            }

            if let Some(index) = indices.get(&path_of(node)) {
                tables.procedurals[*index] = JsonValue::Object(entry);
            }
        }

        self.log.log(format!(
            "- Exported {} procedurals for graph: {}",
            indices.len(),
            graph.name
        ));
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::super::MtlxToGltfOptions;
    use super::*;
    use crate::mtlx::parse_mtlx;

    const CHECKER: &str = r#"<?xml version="1.0"?>
<materialx version="1.38">
  <nodegraph name="NG_checker">
    <input name="scale" type="vector2" value="8, 8" />
    <texcoord name="uv" type="vector2" xpos="1" ypos="2" />
    <multiply name="scaled" type="vector2">
      <input name="in1" type="vector2" nodename="uv" />
      <input name="in2" type="vector2" interfacename="scale" />
    </multiply>
    <image name="tile" type="color3">
      <input name="file" type="filename" value="tile.png" />
      <input name="texcoord" type="vector2" nodename="scaled" />
      <input name="uaddressmode" type="string" value="mirror" />
    </image>
    <output name="out" type="color3" nodename="tile" />
  </nodegraph>
  <gltf_pbr name="Checker" type="surfaceshader">
    <input name="base_color" type="color3" nodegraph="NG_checker" output="out" />
    <input name="specular_color" type="color3" nodegraph="NG_checker" />
  </gltf_pbr>
  <surfacematerial name="MAT_Checker" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="Checker" />
  </surfacematerial>
</materialx>"#;

    fn write(procedural: bool) -> JsonValue {
        let doc = parse_mtlx(CHECKER).unwrap();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions {
            create_procedural_textures: procedural,
            ..Default::default()
        });
        let mut gltf = Map::new();
        writer.materialx_to_gltf(&doc, &mut gltf, true);
        JsonValue::Object(gltf)
    }

    #[test]
    fn test_graph_exported_as_procedurals() {
        let gltf = write(true);
        let procedurals = gltf["extensions"]["KHR_procedurals"]["procedurals"].as_array().unwrap();
        // uv, scaled, tile, scale input, out output
        assert_eq!(procedurals.len(), 5);

        assert_eq!(procedurals[0]["name"], "NG_checker/uv");
        assert_eq!(procedurals[0]["nodetype"], "texcoord");
        assert_eq!(procedurals[0]["type"], "vector2");
        assert!(procedurals[0].get("xpos").is_none());

        let scaled = &procedurals[1];
        assert_eq!(scaled["inputs"][0], json!({ "name": "in1", "type": "vector2", "procedural": 0 }));
        assert_eq!(scaled["inputs"][1]["procedural"], 3);

        let tile = &procedurals[2];
        assert_eq!(tile["inputs"][0]["texture"], 0);
        assert_eq!(tile["inputs"][2]["value"], "mirror");
        assert_eq!(gltf["images"][0]["uri"], "tile.png");
        assert_eq!(gltf["samplers"][0]["wrapS"], 33648);

        assert_eq!(procedurals[3], json!({ "name": "NG_checker/scale", "nodetype": "input", "type": "vector2", "value": [8.0, 8.0] }));
        assert_eq!(procedurals[4], json!({ "name": "NG_checker/out", "nodetype": "output", "procedural": 2 }));

        let material = &gltf["materials"][0];
        assert_eq!(
            material["pbrMetallicRoughness"]["baseColorTexture"]["extensions"]["KHR_procedurals"]["index"],
            4
        );
        // The second reference reuses the exported graph
        assert_eq!(
            material["extensions"]["KHR_materials_specular"]["specularColorTexture"]["extensions"]["KHR_procedurals"]["index"],
            4
        );
        assert!(gltf["extensionsUsed"].as_array().unwrap().contains(&json!("KHR_procedurals")));
    }

    #[test]
    fn test_graph_image_as_texture_without_option() {
        let gltf = write(false);
        assert!(gltf.get("extensions").is_none());
        let base = &gltf["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"];
        assert_eq!(base["index"], 0);
        assert!(base.get("extensions").is_none());
        assert_eq!(gltf["images"][0], json!({ "name": "NG_checker/tile", "uri": "tile.png" }));
    }
}
