//! MaterialX document model.
//!
//! A MaterialX document is a tree of elements. Every element has a category
//! (its XML tag), a name, an ordered list of attributes and children. Nodes,
//! inputs, outputs, node graphs and looks are all elements distinguished by
//! category only.

use std::path::Path;

use crate::globals::*;

use super::library::{self, NodeDef};
use super::value::Value;

/// Category of comment elements.
pub const COMMENT_CATEGORY: &str = "comment";
/// Attribute holding comment text.
pub const DOC_ATTRIBUTE: &str = "doc";

/// Categories that never denote nodes.
const NON_NODE_CATEGORIES: &[&str] = &[
    COMMENT_CATEGORY,
    "input",
    "output",
    "nodegraph",
    "nodedef",
    "implementation",
    "look",
    "lookgroup",
    "materialassign",
    "collection",
    "geominfo",
    "propertyset",
    "typedef",
    "token",
    "variantset",
    "backdrop",
];

/// A MaterialX element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Element category (XML tag name)
    pub category: String,
    /// Element name, empty for comments
    pub name: String,
    attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<Element>,
}

/// Replace every character that is not alphanumeric or `_` with `_`.
pub fn create_valid_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Increment a trailing integer, or append `2` when there is none.
pub fn increment_name(name: &str) -> String {
    let split = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if split < name.len() {
        if let Ok(n) = name[split..].parse::<u64>() {
            return format!("{}{}", &name[..split], n + 1);
        }
    }
    format!("{}2", name)
}

impl Element {
    /// Create a new element.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a comment element.
    pub fn comment(text: impl Into<String>) -> Self {
        let mut elem = Self::new(COMMENT_CATEGORY, "");
        elem.set_attribute(DOC_ATTRIBUTE, text);
        elem
    }

    pub fn is_comment(&self) -> bool {
        self.category == COMMENT_CATEGORY
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, treating an empty value as absent.
    pub fn non_empty_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|v| !v.is_empty())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|(k, _)| k != name);
    }

    /// Attributes in document order, excluding the name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `type` attribute, empty when unset.
    pub fn type_string(&self) -> &str {
        self.attribute(MTLX_TYPE_ATTRIBUTE).unwrap_or("")
    }

    pub fn set_type(&mut self, ty: &str) {
        self.set_attribute(MTLX_TYPE_ATTRIBUTE, ty);
    }

    pub fn value_string(&self) -> Option<&str> {
        self.attribute(MTLX_VALUE_ATTRIBUTE)
    }

    /// The typed value of this element, if it carries one.
    pub fn value(&self) -> Option<Value> {
        Value::parse(self.value_string()?, self.type_string())
    }

    pub fn set_value_string(&mut self, value: impl Into<String>) {
        self.set_attribute(MTLX_VALUE_ATTRIBUTE, value);
    }

    /// Set a typed value and its type.
    pub fn set_value(&mut self, value: &Value) {
        if self.type_string().is_empty() || value.type_name() != "string" {
            self.set_type(value.type_name());
        }
        self.set_value_string(value.to_value_string());
    }

    /// Connect this input to a sibling node, dropping any constant value.
    pub fn set_node_name(&mut self, node_name: &str) {
        self.set_attribute(MTLX_NODE_NAME_ATTRIBUTE, node_name);
        self.remove_attribute(MTLX_VALUE_ATTRIBUTE);
    }

    /// Text of a comment element.
    pub fn doc_string(&self) -> &str {
        self.attribute(DOC_ATTRIBUTE).unwrap_or("")
    }

    // ---------------------------------------------------------------------
    // Children
    // ---------------------------------------------------------------------

    /// Get a named child. Comments are never returned.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|c| !c.is_comment() && c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .find(|c| !c.is_comment() && c.name == name)
    }

    pub fn children_of_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.category == category)
    }

    /// Make a valid name that no sibling uses yet.
    pub fn create_valid_child_name(&self, name: &str) -> String {
        let mut child_name = create_valid_name(name);
        while self.child(&child_name).is_some() {
            child_name = increment_name(&child_name);
        }
        child_name
    }

    /// Append a child and return it.
    pub fn add_child(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Append a comment child.
    pub fn add_comment(&mut self, text: &str) {
        self.children.push(Element::comment(text));
    }

    /// Add a node child with a unique valid name.
    ///
    /// An empty name yields `<category>1` (made unique).
    pub fn add_node(&mut self, category: &str, name: &str, ty: &str) -> &mut Element {
        let base = if name.is_empty() {
            format!("{}1", category)
        } else {
            name.to_string()
        };
        let name = self.create_valid_child_name(&base);
        let mut node = Element::new(category, name);
        node.set_type(ty);
        self.add_child(node)
    }

    pub fn remove_child(&mut self, name: &str) -> Option<Element> {
        let index = self
            .children
            .iter()
            .position(|c| !c.is_comment() && c.name == name)?;
        Some(self.children.remove(index))
    }

    // ---------------------------------------------------------------------
    // Inputs / outputs
    // ---------------------------------------------------------------------

    pub fn inputs(&self) -> impl Iterator<Item = &Element> {
        self.children_of_category("input")
    }

    pub fn input(&self, name: &str) -> Option<&Element> {
        self.inputs().find(|i| i.name == name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .find(|c| c.category == "input" && c.name == name)
    }

    /// Add (or replace the type of) an input.
    pub fn add_input(&mut self, name: &str, ty: &str) -> &mut Element {
        if let Some(index) = self
            .children
            .iter()
            .position(|c| c.category == "input" && c.name == name)
        {
            self.children[index].set_type(ty);
            return &mut self.children[index];
        }
        let mut input = Element::new("input", name);
        input.set_type(ty);
        self.add_child(input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Element> {
        self.children_of_category("output")
    }

    /// Child elements that are nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Element> {
        self.children
            .iter()
            .filter(|c| !NON_NODE_CATEGORIES.contains(&c.category.as_str()))
    }

    pub fn node_graphs(&self) -> impl Iterator<Item = &Element> {
        self.children_of_category("nodegraph")
    }

    // ---------------------------------------------------------------------
    // Node definitions
    // ---------------------------------------------------------------------

    /// The node definition for this node, by `nodedef` attribute or by
    /// category and type.
    pub fn node_def(&self) -> Option<&'static NodeDef> {
        if let Some(id) = self.non_empty_attribute(MTLX_NODEDEF_ATTRIBUTE) {
            if let Some(nd) = library::node_def_by_id(id) {
                return Some(nd);
            }
        }
        library::find_node_def(&self.category, self.type_string())
    }

    /// Return the named input, creating it from the node definition if needed.
    ///
    /// Returns `None` when the node definition does not declare the input.
    pub fn add_input_from_nodedef(&mut self, name: &str) -> Option<&mut Element> {
        if self.input(name).is_none() {
            let nd = self.node_def()?;
            let decl = nd.input(name)?;
            let input = self.add_input(&decl.name, &decl.ty);
            if let Some(value) = &decl.value {
                input.set_value_string(value.clone());
            }
        }
        self.input_mut(name)
    }

    /// Add every input declared by the node definition.
    pub fn add_inputs_from_nodedef(&mut self) {
        let Some(nd) = self.node_def() else {
            return;
        };
        for decl in &nd.inputs {
            self.add_input_from_nodedef(&decl.name);
        }
    }

    /// Value of an input: the explicit value when the input exists (`None`
    /// when it is a connection), otherwise the node definition default.
    pub fn input_value(&self, name: &str) -> Option<Value> {
        if let Some(input) = self.input(name) {
            return input.value();
        }
        let decl = self.node_def()?.input(name)?;
        Value::parse(decl.value.as_deref()?, &decl.ty)
    }

    /// Node definition default of an input.
    pub fn default_input_value(&self, name: &str) -> Option<Value> {
        let decl = self.node_def()?.input(name)?;
        Value::parse(decl.value.as_deref()?, &decl.ty)
    }
}

/// A node together with the node graph that contains it.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub node: &'a Element,
    /// Containing node graph, `None` for document level nodes
    pub graph: Option<&'a Element>,
}

impl<'a> NodeRef<'a> {
    /// Path of the node from the document root, e.g. `NG_wood/image1`.
    pub fn name_path(&self) -> String {
        match self.graph {
            Some(graph) => format!("{}/{}", graph.name, self.node.name),
            None => self.node.name.clone(),
        }
    }

    pub fn category(&self) -> &'a str {
        &self.node.category
    }
}

/// A MaterialX document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The `materialx` root element
    pub root: Element,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new empty MaterialX document.
    pub fn new() -> Self {
        let mut root = Element::new(MATERIALX_DOCUMENT_ROOT, "");
        root.set_attribute("version", "1.38");
        Self { root }
    }

    /// MaterialX version string, e.g. `1.38`.
    pub fn version(&self) -> &str {
        self.root.attribute("version").unwrap_or("1.38")
    }

    /// Document default colorspace.
    pub fn colorspace(&self) -> Option<&str> {
        self.root.attribute(MTLX_COLOR_SPACE_ATTRIBUTE)
    }

    /// Get a document level node (or other element) by name.
    pub fn node(&self, name: &str) -> Option<&Element> {
        self.root.child(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.root.child_mut(name)
    }

    pub fn node_graph(&self, name: &str) -> Option<&Element> {
        self.root.node_graphs().find(|g| g.name == name)
    }

    /// Add a document level node with a unique valid name.
    pub fn add_node(&mut self, category: &str, name: &str, ty: &str) -> &mut Element {
        self.root.add_node(category, name, ty)
    }

    pub fn add_comment(&mut self, text: &str) {
        self.root.add_comment(text);
    }

    pub fn create_valid_child_name(&self, name: &str) -> String {
        self.root.create_valid_child_name(name)
    }

    /// All `surfacematerial` nodes.
    pub fn material_nodes(&self) -> impl Iterator<Item = &Element> {
        self.root.children_of_category(MTLX_SURFACE_MATERIAL_CATEGORY)
    }

    pub fn looks(&self) -> impl Iterator<Item = &Element> {
        self.root.children_of_category("look")
    }

    /// Material assignments of all looks, in document order.
    pub fn material_assigns(&self) -> impl Iterator<Item = &Element> {
        self.looks().flat_map(|look| look.children_of_category("materialassign"))
    }

    /// Resolve the node an input is connected to.
    ///
    /// `scope` is the node graph containing the input's node, `None` at
    /// document level.
    pub fn connected_node<'a>(&'a self, scope: Option<&'a Element>, input: &Element) -> Option<NodeRef<'a>> {
        if let Some(graph_name) = input.non_empty_attribute(MTLX_NODEGRAPH_ATTRIBUTE) {
            let graph = self.node_graph(graph_name)?;
            let output = match input.non_empty_attribute(MTLX_OUTPUT_ATTRIBUTE) {
                Some(name) => graph.outputs().find(|o| o.name == name)?,
                None => graph.outputs().next()?,
            };
            let node_name = output.non_empty_attribute(MTLX_NODE_NAME_ATTRIBUTE)?;
            let node = graph.child(node_name)?;
            return Some(NodeRef {
                node,
                graph: Some(graph),
            });
        }

        let node_name = input.non_empty_attribute(MTLX_NODE_NAME_ATTRIBUTE)?;
        let parent = scope.unwrap_or(&self.root);
        let node = parent.child(node_name)?;
        Some(NodeRef { node, graph: scope })
    }

    /// Resolve the node connected to a named input of `node`.
    pub fn connected_node_of<'a>(&'a self, node: NodeRef<'a>, input_name: &str) -> Option<NodeRef<'a>> {
        let input = node.node.input(input_name)?;
        self.connected_node(node.graph, input)
    }

    /// Shader nodes connected to a material node.
    pub fn shader_nodes<'a>(&'a self, material: &'a Element) -> Vec<NodeRef<'a>> {
        material
            .inputs()
            .filter(|i| i.type_string() == SURFACE_SHADER_TYPE)
            .filter_map(|i| self.connected_node(None, i))
            .collect()
    }

    /// Resolved value of a `filename` input: the closest `fileprefix` is
    /// prepended to relative paths.
    pub fn resolved_file_value(&self, scope: Option<&Element>, input: &Element) -> String {
        let value = input.value_string().unwrap_or("");
        if value.is_empty() || Path::new(value).is_absolute() {
            return value.to_string();
        }
        let prefix = scope
            .and_then(|g| g.attribute(MTLX_FILE_PREFIX_ATTRIBUTE))
            .or_else(|| self.root.attribute(MTLX_FILE_PREFIX_ATTRIBUTE))
            .unwrap_or("");
        format!("{}{}", prefix, value)
    }

    /// Resolved file name of a node's `file` input, when that input is of
    /// `filename` type and non-empty.
    pub fn image_file(&self, image: NodeRef<'_>) -> Option<String> {
        let file_input = image.node.input("file")?;
        if file_input.type_string() != FILENAME_TYPE {
            return None;
        }
        let file = self.resolved_file_value(image.graph, file_input);
        (!file.is_empty()).then_some(file)
    }

    /// Rewrite every `filename` value to its resolved base name.
    ///
    /// Returns the `(original, rewritten)` pairs that changed.
    pub fn make_file_paths_relative(&mut self) -> Vec<(String, String)> {
        let doc_prefix = self
            .root
            .attribute(MTLX_FILE_PREFIX_ATTRIBUTE)
            .unwrap_or("")
            .to_string();
        let mut result = Vec::new();
        rewrite_file_paths(&mut self.root, &doc_prefix, &mut result);
        result
    }
}

fn rewrite_file_paths(elem: &mut Element, prefix: &str, result: &mut Vec<(String, String)>) {
    let prefix = elem
        .attribute(MTLX_FILE_PREFIX_ATTRIBUTE)
        .unwrap_or(prefix)
        .to_string();

    for child in elem.children.iter_mut() {
        if child.type_string() == FILENAME_TYPE {
            if let Some(unresolved) = child.value_string().filter(|v| !v.is_empty()).map(String::from) {
                let resolved = if Path::new(&unresolved).is_absolute() {
                    unresolved.clone()
                } else {
                    format!("{}{}", prefix, unresolved)
                };
                let base_name = resolved
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(&resolved)
                    .to_string();
                child.set_value_string(base_name.clone());
                if unresolved != base_name {
                    result.push((unresolved.replace('\\', "/"), base_name));
                }
            }
        }
        rewrite_file_paths(child, &prefix, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_child_names() {
        let mut doc = Document::new();
        assert_eq!(doc.create_valid_child_name("my shader"), "my_shader");
        doc.add_node("gltf_pbr", "SHD_0", "surfaceshader");
        assert_eq!(doc.create_valid_child_name("SHD_0"), "SHD_1");
        doc.add_node("extract", "extract_orm", "float");
        assert_eq!(doc.create_valid_child_name("extract_orm"), "extract_orm2");
        let geom = doc.add_node("geomcolor", "", "color4");
        assert_eq!(geom.name, "geomcolor1");
    }

    #[test]
    fn test_add_input_from_nodedef() {
        let mut doc = Document::new();
        let shader = doc.add_node("gltf_pbr", "shader", "surfaceshader");
        let ior = shader.add_input_from_nodedef("ior").unwrap();
        assert_eq!(ior.type_string(), "float");
        assert_eq!(ior.value_string(), Some("1.5"));
        assert!(shader.add_input_from_nodedef("not_an_input").is_none());

        // Existing inputs are returned untouched
        shader.input_mut("ior").unwrap().set_value_string("1.2");
        assert_eq!(shader.add_input_from_nodedef("ior").unwrap().value_string(), Some("1.2"));
    }

    #[test]
    fn test_input_value_falls_back_to_default() {
        let mut doc = Document::new();
        let shader = doc.add_node("gltf_pbr", "shader", "surfaceshader");
        assert_eq!(shader.input_value("roughness"), Some(Value::Float(1.0)));
        shader.add_input("roughness", "float").set_node_name("image1");
        assert_eq!(shader.input_value("roughness"), None);
    }

    #[test]
    fn test_connected_node_through_graph() {
        let mut doc = Document::new();
        let mut graph = Element::new("nodegraph", "NG");
        graph.add_node("image", "img", "color3");
        let out = graph.add_child(Element::new("output", "out"));
        out.set_type("color3");
        out.set_attribute("nodename", "img");
        doc.root.add_child(graph);

        let shader = doc.add_node("gltf_pbr", "shader", "surfaceshader");
        let input = shader.add_input("base_color", "color3");
        input.set_attribute("nodegraph", "NG");

        let shader = doc.node("shader").unwrap();
        let connected = doc.connected_node(None, shader.input("base_color").unwrap()).unwrap();
        assert_eq!(connected.name_path(), "NG/img");
    }

    #[test]
    fn test_make_file_paths_relative() {
        let mut doc = Document::new();
        doc.root.set_attribute("fileprefix", "textures/");
        let image = doc.add_node("gltf_image", "img", "float");
        let file = image.add_input("file", "filename");
        file.set_value_string("wood.png");

        // Prefixed relative names already resolve to their base name
        assert!(doc.make_file_paths_relative().is_empty());

        let image = doc.add_node("gltf_image", "img2", "float");
        image.add_input("file", "filename").set_value_string("/abs/dir/rock.png");
        let changed = doc.make_file_paths_relative();
        assert_eq!(changed, vec![("/abs/dir/rock.png".to_string(), "rock.png".to_string())]);
    }
}
