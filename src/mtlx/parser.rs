//! MaterialX XML parser.
//!
//! Parses .mtlx files into the generic element tree so documents can be
//! inspected, edited and converted to glTF.

use anyhow::{Context, Result};
use roxmltree::{Document as XmlDocument, Node, NodeType};
use std::path::Path;

use super::types::*;

/// Parse a MaterialX file from disk.
pub fn parse_mtlx_file(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read MaterialX file: {}", path.display()))?;
    parse_mtlx(&content).with_context(|| format!("Failed to parse MaterialX file: {}", path.display()))
}

/// Parse MaterialX XML content into a document.
pub fn parse_mtlx(content: &str) -> Result<Document> {
    let xml = XmlDocument::parse(content).context("Failed to parse MaterialX XML")?;
    let root = xml.root_element();

    // Verify this is a MaterialX document
    if root.tag_name().name() != "materialx" {
        anyhow::bail!(
            "Not a MaterialX document: root element is '{}'",
            root.tag_name().name()
        );
    }

    let mut doc = Document {
        root: Element::new("materialx", ""),
    };
    copy_attributes(&root, &mut doc.root);
    if doc.root.attribute("version").is_none() {
        doc.root.set_attribute("version", "1.38");
    }
    parse_children(&root, &mut doc.root);

    log::debug!(
        "Parsed MaterialX {}: {} top level elements, {} materials",
        doc.version(),
        doc.root.children.iter().filter(|c| !c.is_comment()).count(),
        doc.material_nodes().count()
    );

    Ok(doc)
}

fn copy_attributes(node: &Node, elem: &mut Element) {
    for attr in node.attributes() {
        if attr.name() == "name" {
            elem.name = attr.value().to_string();
        } else {
            elem.set_attribute(attr.name(), attr.value());
        }
    }
}

fn parse_children(node: &Node, parent: &mut Element) {
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => {
                let tag = child.tag_name().name();
                if tag == "include" {
                    // XIncludes reference library files which are not loaded
                    log::debug!(
                        "Skipping XInclude: {}",
                        child.attribute("href").unwrap_or("")
                    );
                    continue;
                }
                let mut elem = Element::new(tag, "");
                copy_attributes(&child, &mut elem);
                parse_children(&child, &mut elem);
                parent.children.push(elem);
            }
            NodeType::Comment => {
                if let Some(text) = child.text() {
                    parent.children.push(Element::comment(text));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtlx::Value;

    const SAMPLE_MTLX: &str = r#"<?xml version="1.0"?>
<materialx version="1.38" colorspace="lin_rec709">
  <!-- Generated shader: Test -->
  <nodegraph name="NG_Test">
    <image name="img_basecolor" type="color3">
      <input name="file" type="filename" value="tex/basecolor.jpg" colorspace="srgb_texture" />
    </image>
    <image name="img_normal" type="vector3">
      <input name="file" type="filename" value="tex/normal.jpg" />
    </image>
    <normalmap name="normalmap1" type="vector3">
      <input name="in" type="vector3" nodename="img_normal" />
    </normalmap>
    <output name="base_color_output" type="color3" nodename="img_basecolor" />
    <output name="normal_output" type="vector3" nodename="normalmap1" />
  </nodegraph>

  <gltf_pbr name="TestShader" type="surfaceshader">
    <input name="base_color" type="color3" nodegraph="NG_Test" output="base_color_output" />
    <input name="normal" type="vector3" nodegraph="NG_Test" output="normal_output" />
    <input name="metallic" type="float" value="0.25" />
  </gltf_pbr>

  <surfacematerial name="M_Test" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="TestShader" />
  </surfacematerial>
</materialx>"#;

    #[test]
    fn test_parse_mtlx() {
        let doc = parse_mtlx(SAMPLE_MTLX).unwrap();

        assert_eq!(doc.version(), "1.38");
        assert_eq!(doc.colorspace(), Some("lin_rec709"));
        assert_eq!(doc.root.node_graphs().count(), 1);
        assert_eq!(doc.material_nodes().count(), 1);
        assert!(doc.root.children[0].is_comment());
        assert_eq!(doc.root.children[0].doc_string(), " Generated shader: Test ");
    }

    #[test]
    fn test_parse_nodegraph() {
        let doc = parse_mtlx(SAMPLE_MTLX).unwrap();
        let ng = doc.node_graph("NG_Test").unwrap();

        assert_eq!(ng.nodes().count(), 3);
        assert_eq!(ng.outputs().count(), 2);

        let img = ng.child("img_basecolor").unwrap();
        let file = img.input("file").unwrap();
        assert_eq!(file.value_string(), Some("tex/basecolor.jpg"));
        assert_eq!(file.attribute("colorspace"), Some("srgb_texture"));
    }

    #[test]
    fn test_parse_shader_inputs() {
        let doc = parse_mtlx(SAMPLE_MTLX).unwrap();
        let shader = doc.node("TestShader").unwrap();

        assert_eq!(shader.input_value("metallic"), Some(Value::Float(0.25)));
        assert_eq!(
            shader.input("base_color").unwrap().attribute("nodegraph"),
            Some("NG_Test")
        );
    }

    #[test]
    fn test_material_shader_resolution() {
        let doc = parse_mtlx(SAMPLE_MTLX).unwrap();
        let material = doc.node("M_Test").unwrap();
        let shaders = doc.shader_nodes(material);

        assert_eq!(shaders.len(), 1);
        assert_eq!(shaders[0].name_path(), "TestShader");

        // Normal map resolves through the graph output, then past normalmap
        let normal = doc.connected_node_of(shaders[0], "normal").unwrap();
        assert_eq!(normal.category(), "normalmap");
        let image = doc.connected_node_of(normal, "in").unwrap();
        assert_eq!(doc.image_file(image), Some("tex/normal.jpg".to_string()));
    }

    #[test]
    fn test_reject_non_materialx() {
        assert!(parse_mtlx("<scene/>").is_err());
        assert!(parse_mtlx("<materialx").is_err());
    }
}
