//! MaterialX serialization: XML text and the JSON element hierarchy.

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::fmt::Write as _;
use std::path::Path;

use crate::globals::{JSON_CATEGORY_NAME_SEPARATOR, MATERIALX_DOCUMENT_ROOT};

use super::types::{Document, Element};

const INDENT: &str = "  ";

impl Document {
    /// Serialize the document to MaterialX XML.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\"?>\n");
        write_element(&mut out, &self.root, 0);
        out
    }

    /// Write the document to a MaterialX file.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml_string())
            .with_context(|| format!("Failed to write MaterialX file: {}", path.display()))
    }

    /// Convert the document to a JSON hierarchy.
    ///
    /// Every element becomes an object keyed `category:name` holding its
    /// attributes and children.
    pub fn to_json(&self) -> JsonValue {
        let mut root = Map::new();
        for (key, value) in self.root.attributes() {
            root.insert(key.to_string(), JsonValue::from(value));
        }
        let mut elements = Map::new();
        for child in self.root.children.iter().filter(|c| !c.is_comment()) {
            element_to_json(child, &mut elements);
        }
        root.insert(MATERIALX_DOCUMENT_ROOT.to_string(), JsonValue::Object(elements));
        JsonValue::Object(root)
    }
}

fn element_to_json(elem: &Element, parent: &mut Map<String, JsonValue>) {
    let mut json = Map::new();
    for (key, value) in elem.attributes() {
        json.insert(key.to_string(), JsonValue::from(value));
    }
    for child in elem.children.iter().filter(|c| !c.is_comment()) {
        element_to_json(child, &mut json);
    }
    parent.insert(
        format!("{}{}{}", elem.category, JSON_CATEGORY_NAME_SEPARATOR, elem.name),
        JsonValue::Object(json),
    );
}

fn write_element(out: &mut String, elem: &Element, depth: usize) {
    let indent = INDENT.repeat(depth);

    if elem.is_comment() {
        let _ = writeln!(out, "{}<!--{}-->", indent, elem.doc_string().replace("--", "- -"));
        return;
    }

    let _ = write!(out, "{}<{}", indent, elem.category);
    if !elem.name.is_empty() {
        let _ = write!(out, " name=\"{}\"", escape(&elem.name));
    }
    for (key, value) in elem.attributes() {
        let _ = write!(out, " {}=\"{}\"", key, escape(value));
    }

    if elem.children.is_empty() {
        out.push_str(" />\n");
        return;
    }

    out.push_str(">\n");
    for child in &elem.children {
        write_element(out, child, depth + 1);
    }
    let _ = writeln!(out, "{}</{}>", indent, elem.category);
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtlx::parse_mtlx;

    #[test]
    fn test_write_xml() {
        let mut doc = Document::new();
        doc.add_comment(" Generated shader: A&B ");
        let shader = doc.add_node("gltf_pbr", "A_B", "surfaceshader");
        shader.set_attribute("nodedef", "ND_gltf_pbr_surfaceshader");
        shader.add_input("base_color", "color3").set_value_string("1, 0, 0");
        doc.add_node("surfacematerial", "MAT_A_B", "material");

        let xml = doc.to_xml_string();
        assert!(xml.starts_with("<?xml version=\"1.0\"?>\n<materialx version=\"1.38\">\n"));
        assert!(xml.contains("  <!-- Generated shader: A&B -->\n"));
        assert!(xml.contains(
            "  <gltf_pbr name=\"A_B\" type=\"surfaceshader\" nodedef=\"ND_gltf_pbr_surfaceshader\">\n"
        ));
        assert!(xml.contains("    <input name=\"base_color\" type=\"color3\" value=\"1, 0, 0\" />\n"));
        assert!(xml.contains("  <surfacematerial name=\"MAT_A_B\" type=\"material\" />\n"));

        // The output parses back to the same tree
        let reparsed = parse_mtlx(&xml).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_escape_attributes() {
        let mut doc = Document::new();
        let image = doc.add_node("gltf_image", "img", "float");
        image.add_input("file", "filename").set_value_string("a<b>&\"c\".png");
        let reparsed = parse_mtlx(&doc.to_xml_string()).unwrap();
        let file = reparsed.node("img").unwrap().input("file").unwrap();
        assert_eq!(file.value_string(), Some("a<b>&\"c\".png"));
    }

    #[test]
    fn test_to_json() {
        let mut doc = Document::new();
        let shader = doc.add_node("gltf_pbr", "shader", "surfaceshader");
        shader.add_input("alpha", "float").set_value_string("0.5");

        let json = doc.to_json();
        assert_eq!(json["version"], "1.38");
        let shader = &json["materialx"]["gltf_pbr:shader"];
        assert_eq!(shader["type"], "surfaceshader");
        assert_eq!(shader["input:alpha"]["value"], "0.5");
    }
}
