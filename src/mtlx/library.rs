//! Built-in node definitions.
//!
//! Only the definitions for node categories the converters read or emit are
//! provided. Defaults mirror the MaterialX standard and glTF PBR libraries.

use std::sync::OnceLock;

/// An input declared by a node definition.
#[derive(Debug, Clone)]
pub struct InputDef {
    pub name: String,
    pub ty: String,
    /// Default value string, absent for geometric defaults (e.g. normals)
    pub value: Option<String>,
}

/// A node definition: node category, output type and declared inputs.
#[derive(Debug, Clone)]
pub struct NodeDef {
    /// Definition identifier, e.g. `ND_gltf_pbr_surfaceshader`
    pub id: String,
    /// Node category the definition applies to
    pub node: String,
    /// Output type, `multioutput` for nodes with several outputs
    pub output_type: String,
    pub inputs: Vec<InputDef>,
}

impl NodeDef {
    /// Get a declared input by name.
    pub fn input(&self, name: &str) -> Option<&InputDef> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Default value string of a declared input.
    pub fn input_value_string(&self, name: &str) -> Option<&str> {
        self.input(name).and_then(|i| i.value.as_deref())
    }
}

struct DefBuilder(NodeDef);

impl DefBuilder {
    fn new(id: &str, node: &str, output_type: &str) -> Self {
        DefBuilder(NodeDef {
            id: id.to_string(),
            node: node.to_string(),
            output_type: output_type.to_string(),
            inputs: Vec::new(),
        })
    }

    fn input(mut self, name: &str, ty: &str, value: &str) -> Self {
        self.0.inputs.push(InputDef {
            name: name.to_string(),
            ty: ty.to_string(),
            value: Some(value.to_string()),
        });
        self
    }

    fn geom_input(mut self, name: &str, ty: &str) -> Self {
        self.0.inputs.push(InputDef {
            name: name.to_string(),
            ty: ty.to_string(),
            value: None,
        });
        self
    }

    fn texture_inputs(self) -> Self {
        self.input("file", "filename", "")
            .geom_input("texcoord", "vector2")
            .input("pivot", "vector2", "0, 1")
            .input("scale", "vector2", "1, 1")
            .input("rotate", "float", "0")
            .input("offset", "vector2", "0, 0")
            .input("uaddressmode", "string", "periodic")
            .input("vaddressmode", "string", "periodic")
            .input("filtertype", "string", "linear")
    }

    fn build(self) -> NodeDef {
        self.0
    }
}

fn type_default(ty: &str, one: bool) -> &'static str {
    match (ty, one) {
        ("float", true) => "1",
        ("float", false) => "0",
        ("vector2", true) => "1, 1",
        ("vector2", false) => "0, 0",
        ("color3" | "vector3", true) => "1, 1, 1",
        ("color3" | "vector3", false) => "0, 0, 0",
        ("color4" | "vector4", true) => "1, 1, 1, 1",
        (_, _) => "0, 0, 0, 0",
    }
}

fn build_library() -> Vec<NodeDef> {
    let mut defs = vec![
        DefBuilder::new("ND_gltf_pbr_surfaceshader", "gltf_pbr", "surfaceshader")
            .input("base_color", "color3", "1, 1, 1")
            .input("alpha", "float", "1")
            .input("metallic", "float", "1")
            .input("roughness", "float", "1")
            .geom_input("normal", "vector3")
            .geom_input("tangent", "vector3")
            .input("occlusion", "float", "1")
            .input("transmission", "float", "0")
            .input("specular", "float", "1")
            .input("specular_color", "color3", "1, 1, 1")
            .input("ior", "float", "1.5")
            .input("alpha_mode", "integer", "0")
            .input("alpha_cutoff", "float", "0.5")
            .input("iridescence", "float", "0")
            .input("iridescence_ior", "float", "1.3")
            .input("iridescence_thickness", "float", "100")
            .input("sheen_color", "color3", "0, 0, 0")
            .input("sheen_roughness", "float", "0")
            .input("clearcoat", "float", "0")
            .input("clearcoat_roughness", "float", "0")
            .geom_input("clearcoat_normal", "vector3")
            .input("emissive", "color3", "0, 0, 0")
            .input("emissive_strength", "float", "1")
            .input("thickness", "float", "0")
            .geom_input("attenuation_distance", "float")
            .input("attenuation_color", "color3", "1, 1, 1")
            .build(),
        DefBuilder::new("ND_surface_unlit", "surface_unlit", "surfaceshader")
            .input("emission", "float", "1")
            .input("emission_color", "color3", "1, 1, 1")
            .input("transmission", "float", "0")
            .input("transmission_color", "color3", "1, 1, 1")
            .input("opacity", "float", "1")
            .build(),
        DefBuilder::new("ND_standard_surface_surfaceshader", "standard_surface", "surfaceshader")
            .input("base", "float", "0.8")
            .input("base_color", "color3", "1, 1, 1")
            .input("diffuse_roughness", "float", "0")
            .input("metalness", "float", "0")
            .input("specular", "float", "1")
            .input("specular_color", "color3", "1, 1, 1")
            .input("specular_roughness", "float", "0.2")
            .input("specular_IOR", "float", "1.5")
            .input("transmission", "float", "0")
            .input("transmission_color", "color3", "1, 1, 1")
            .input("transmission_depth", "float", "0")
            .input("sheen", "float", "0")
            .input("sheen_color", "color3", "1, 1, 1")
            .input("sheen_roughness", "float", "0.3")
            .input("coat", "float", "0")
            .input("coat_roughness", "float", "0.1")
            .geom_input("coat_normal", "vector3")
            .input("thin_film_thickness", "float", "0")
            .input("thin_film_IOR", "float", "1.5")
            .input("emission", "float", "0")
            .input("emission_color", "color3", "1, 1, 1")
            .input("opacity", "color3", "1, 1, 1")
            .geom_input("normal", "vector3")
            .geom_input("tangent", "vector3")
            .build(),
        DefBuilder::new("ND_surfacematerial", "surfacematerial", "material")
            .geom_input("surfaceshader", "surfaceshader")
            .build(),
        DefBuilder::new("ND_gltf_colorimage", "gltf_colorimage", "multioutput")
            .input("color", "color4", "1, 1, 1, 1")
            .input("geomcolor", "color4", "1, 1, 1, 1")
            .texture_inputs()
            .build(),
        DefBuilder::new("ND_gltf_normalmap_vector3", "gltf_normalmap", "vector3")
            .input("default", "vector3", "0.5, 0.5, 1")
            .texture_inputs()
            .build(),
        DefBuilder::new(
            "ND_gltf_iridescence_thickness_float",
            "gltf_iridescence_thickness",
            "float",
        )
        .input("thicknessMin", "float", "100")
        .input("thicknessMax", "float", "400")
        .texture_inputs()
        .build(),
        DefBuilder::new("ND_texcoord_vector2", "texcoord", "vector2")
            .input("index", "integer", "0")
            .build(),
        DefBuilder::new("ND_extract_vector3", "extract", "float")
            .input("in", "vector3", "0, 0, 0")
            .input("index", "integer", "0")
            .build(),
        DefBuilder::new("ND_separate3_vector3", "separate3", "multioutput")
            .input("in", "vector3", "0, 0, 0")
            .build(),
        DefBuilder::new("ND_geomcolor_color4", "geomcolor", "color4")
            .input("index", "integer", "0")
            .build(),
        DefBuilder::new("ND_normalmap", "normalmap", "vector3")
            .input("in", "vector3", "0.5, 0.5, 1")
            .input("scale", "float", "1")
            .geom_input("normal", "vector3")
            .geom_input("tangent", "vector3")
            .build(),
        DefBuilder::new("ND_multiply_color3FA", "multiply", "color3")
            .input("in1", "color3", "0, 0, 0")
            .input("in2", "float", "1")
            .build(),
    ];

    for ty in ["float", "color3", "color4", "vector2", "vector3"] {
        defs.push(
            DefBuilder::new(&format!("ND_gltf_image_{}", ty), "gltf_image", ty)
                .input("factor", ty, type_default(ty, true))
                .input("default", ty, type_default(ty, false))
                .texture_inputs()
                .build(),
        );
        defs.push(
            DefBuilder::new(&format!("ND_image_{}", ty), "image", ty)
                .input("file", "filename", "")
                .input("default", ty, type_default(ty, false))
                .geom_input("texcoord", "vector2")
                .input("uaddressmode", "string", "periodic")
                .input("vaddressmode", "string", "periodic")
                .input("filtertype", "string", "linear")
                .build(),
        );
    }

    defs
}

/// All built-in node definitions.
pub fn node_defs() -> &'static [NodeDef] {
    static LIBRARY: OnceLock<Vec<NodeDef>> = OnceLock::new();
    LIBRARY.get_or_init(build_library)
}

/// Get a node definition by identifier.
pub fn node_def_by_id(id: &str) -> Option<&'static NodeDef> {
    node_defs().iter().find(|nd| nd.id == id)
}

/// Find the node definition for a node category and output type.
///
/// When no definition matches the type exactly, the first definition for the
/// category is returned.
pub fn find_node_def(category: &str, output_type: &str) -> Option<&'static NodeDef> {
    let mut candidates = node_defs().iter().filter(|nd| nd.node == category);
    let first = candidates.next()?;
    if first.output_type == output_type {
        return Some(first);
    }
    candidates
        .find(|nd| nd.output_type == output_type)
        .or(Some(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_gltf_image_by_type() {
        let nd = find_node_def("gltf_image", "vector3").unwrap();
        assert_eq!(nd.id, "ND_gltf_image_vector3");
        assert_eq!(nd.input_value_string("factor"), Some("1, 1, 1"));
        assert_eq!(nd.input_value_string("uaddressmode"), Some("periodic"));
    }

    #[test]
    fn test_gltf_pbr_defaults() {
        let nd = node_def_by_id("ND_gltf_pbr_surfaceshader").unwrap();
        assert_eq!(nd.input_value_string("ior"), Some("1.5"));
        assert!(nd.input("normal").is_some());
        assert_eq!(nd.input_value_string("normal"), None);
    }

    #[test]
    fn test_unknown_category() {
        assert!(find_node_def("does_not_exist", "float").is_none());
    }
}
