//! Structural checks on MaterialX documents.

use crate::globals::*;

use super::types::{Document, Element};

impl Document {
    /// Check the document for dangling connections, nodes without a known
    /// definition and material assignments to unknown materials.
    ///
    /// Returns the problems found; an empty list means the document is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        validate_scope(self, &self.root, None, &mut errors);
        for graph in self.root.node_graphs() {
            validate_scope(self, graph, Some(graph), &mut errors);
        }

        for look in self.looks() {
            for assign in look.children_of_category("materialassign") {
                let material = assign.attribute("material").unwrap_or("");
                let known = self
                    .node(material)
                    .is_some_and(|m| m.category == MTLX_SURFACE_MATERIAL_CATEGORY);
                if !known {
                    errors.push(format!(
                        "Material assign '{}/{}' references unknown material '{}'",
                        look.name, assign.name, material
                    ));
                }
            }
        }

        errors
    }
}

fn validate_scope(doc: &Document, parent: &Element, graph: Option<&Element>, errors: &mut Vec<String>) {
    let path = |name: &str| match graph {
        Some(g) => format!("{}/{}", g.name, name),
        None => name.to_string(),
    };

    for node in parent.nodes() {
        if node.node_def().is_none() {
            errors.push(format!(
                "Node '{}' of category '{}' has no matching node definition",
                path(&node.name),
                node.category
            ));
        }

        for input in node.inputs() {
            check_connection(doc, parent, graph, input, &path(&node.name), errors);
        }
    }

    for output in parent.outputs() {
        check_connection(doc, parent, graph, output, &path(&output.name), errors);
    }
}

fn check_connection(
    doc: &Document,
    parent: &Element,
    graph: Option<&Element>,
    port: &Element,
    owner: &str,
    errors: &mut Vec<String>,
) {
    if let Some(ng) = port.non_empty_attribute(MTLX_NODEGRAPH_ATTRIBUTE) {
        match doc.node_graph(ng) {
            None => errors.push(format!(
                "'{}.{}' references missing node graph '{}'",
                owner, port.name, ng
            )),
            Some(g) => {
                if let Some(output) = port.non_empty_attribute(MTLX_OUTPUT_ATTRIBUTE) {
                    if g.outputs().all(|o| o.name != output) {
                        errors.push(format!(
                            "'{}.{}' references missing output '{}' of node graph '{}'",
                            owner, port.name, output, ng
                        ));
                    }
                }
            }
        }
    } else if let Some(node_name) = port.non_empty_attribute(MTLX_NODE_NAME_ATTRIBUTE) {
        if parent.child(node_name).is_none() {
            errors.push(format!(
                "'{}.{}' references missing node '{}'",
                owner, port.name, node_name
            ));
        }
    } else if let (Some(interface), Some(g)) = (port.non_empty_attribute(MTLX_INTERFACE_NAME_ATTRIBUTE), graph) {
        if g.input(interface).is_none() {
            errors.push(format!(
                "'{}.{}' references missing interface input '{}'",
                owner, port.name, interface
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_document() {
        let mut doc = Document::new();
        doc.add_node("gltf_pbr", "shader", "surfaceshader");
        let material = doc.add_node("surfacematerial", "MAT_shader", "material");
        material
            .add_input("surfaceshader", "surfaceshader")
            .set_node_name("shader");
        assert!(doc.validate().is_empty());
    }

    #[test]
    fn test_dangling_references() {
        let mut doc = Document::new();
        let shader = doc.add_node("gltf_pbr", "shader", "surfaceshader");
        shader.add_input("base_color", "color3").set_node_name("missing_image");
        doc.add_node("mystery", "node", "float");
        let look = doc.root.add_child(Element::new("look", "look"));
        let assign = look.add_child(Element::new("materialassign", "MAT_x"));
        assign.set_attribute("material", "MAT_x");

        let errors = doc.validate();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("missing_image")));
        assert!(errors.iter().any(|e| e.contains("mystery")));
        assert!(errors.iter().any(|e| e.contains("MAT_x")));
    }
}
