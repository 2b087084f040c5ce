//! `standard_surface` to `gltf_pbr` shader translation.

use crate::globals::*;
use crate::mtlx::{Document, Element, Value};

use super::MtlxToGltfWriter;

/// `gltf_pbr` input, `standard_surface` input, optional weight input.
const STANDARD_SURFACE_INPUTS: [(&str, &str, Option<&str>); 19] = [
    ("base_color", "base_color", Some("base")),
    ("metallic", "metalness", None),
    ("roughness", "specular_roughness", None),
    ("transmission", "transmission", None),
    ("thickness", "transmission_depth", None),
    ("attenuation_color", "transmission_color", None),
    ("specular", "specular", None),
    ("specular_color", "specular_color", None),
    ("ior", "specular_IOR", None),
    ("alpha", "opacity", None),
    ("iridescence_thickness", "thin_film_thickness", None),
    ("iridescence_ior", "thin_film_IOR", None),
    ("sheen_color", "sheen_color", Some("sheen")),
    ("sheen_roughness", "sheen_roughness", None),
    ("clearcoat", "coat", None),
    ("clearcoat_roughness", "coat_roughness", None),
    ("emissive", "emission_color", Some("emission")),
    ("normal", "normal", None),
    ("clearcoat_normal", "coat_normal", None),
];

const CONNECTION_ATTRIBUTES: [&str; 4] = [
    MTLX_NODE_NAME_ATTRIBUTE,
    MTLX_NODEGRAPH_ATTRIBUTE,
    MTLX_OUTPUT_ATTRIBUTE,
    MTLX_COLOR_SPACE_ATTRIBUTE,
];

fn is_connected(input: &Element) -> bool {
    input.non_empty_attribute(MTLX_NODE_NAME_ATTRIBUTE).is_some()
        || input.non_empty_attribute(MTLX_NODEGRAPH_ATTRIBUTE).is_some()
}

/// Convert a constant to the target input type.
fn convert_value(value: &Value, target_type: &str, weight: f64) -> Option<Value> {
    match target_type {
        "float" => value.as_float().map(|v| Value::Float(v * weight)),
        "color3" => value
            .as_color3()
            .map(|c| Value::Color3([c[0] * weight, c[1] * weight, c[2] * weight])),
        "vector3" => value.as_color3().map(Value::Vector3),
        _ => None,
    }
}

impl MtlxToGltfWriter {
    /// Rewrite material shaders to `gltf_pbr` where possible.
    ///
    /// `standard_surface` shaders are replaced in place. Returns the number
    /// of shaders translated.
    pub fn translate_shaders(&mut self, doc: &mut Document) -> usize {
        let mut names: Vec<(String, String)> = Vec::new();
        for material in doc.material_nodes() {
            for shader in doc.shader_nodes(material) {
                let category = shader.category();
                if category == MTLX_GLTF_PBR_CATEGORY || category == MTLX_UNLIT_CATEGORY {
                    continue;
                }
                if !names.iter().any(|(name, _)| *name == shader.node.name) {
                    names.push((shader.node.name.clone(), category.to_string()));
                }
            }
        }

        let mut translated = 0;
        for (name, category) in names {
            if category != MTLX_STANDARD_SURFACE_CATEGORY {
                self.log
                    .warn(format!("- Failed to translate shader: {} of category {}", name, category));
                continue;
            }
            let Some(index) = doc.root.children.iter().position(|c| c.name == name) else {
                continue;
            };
            let shader = self.standard_surface_to_gltf_pbr(&doc.root.children[index]);
            doc.root.children[index] = shader;
            self.log.log(format!("- Translated shader: {} to gltf_pbr", name));
            translated += 1;
        }
        translated
    }

    fn standard_surface_to_gltf_pbr(&mut self, source: &Element) -> Element {
        let mut shader = Element::new(MTLX_GLTF_PBR_CATEGORY, source.name.as_str());
        shader.set_type(SURFACE_SHADER_TYPE);
        shader.set_attribute(MTLX_NODEDEF_ATTRIBUTE, "ND_gltf_pbr_surfaceshader");

        for (target, input_name, weight_name) in STANDARD_SURFACE_INPUTS {
            if let Some(input) = source.input(input_name).filter(|i| is_connected(i)) {
                let Some(output) = shader.add_input_from_nodedef(target) else {
                    continue;
                };
                output.remove_attribute(MTLX_VALUE_ATTRIBUTE);
                for attr in CONNECTION_ATTRIBUTES {
                    if let Some(value) = input.non_empty_attribute(attr) {
                        output.set_attribute(attr, value);
                    }
                }
                let weighted = weight_name.and_then(|w| source.input_value(w)).and_then(|w| w.as_float());
                if weighted.is_some_and(|w| w != 1.0) {
                    self.log.warn(format!(
                        "- Weight not applied to connected input {} of {}",
                        input_name, source.name
                    ));
                }
                continue;
            }

            let Some(value) = source.input_value(input_name) else {
                continue;
            };
            let weight = match weight_name {
                Some(w) if source.input(w).is_some_and(is_connected) => {
                    self.log
                        .warn(format!("- Connected weight {} of {} dropped", w, source.name));
                    1.0
                }
                Some(w) => source.input_value(w).and_then(|v| v.as_float()).unwrap_or(1.0),
                None => 1.0,
            };
            let Some(target_type) = shader.node_def().and_then(|nd| nd.input(target)).map(|i| i.ty.clone()) else {
                continue;
            };
            let Some(value) = convert_value(&value, &target_type, weight) else {
                continue;
            };
            if let Some(output) = shader.add_input_from_nodedef(target) {
                output.set_value(&value);
                if let Some(colorspace) = source
                    .input(input_name)
                    .and_then(|i| i.non_empty_attribute(MTLX_COLOR_SPACE_ATTRIBUTE))
                {
                    output.set_attribute(MTLX_COLOR_SPACE_ATTRIBUTE, colorspace);
                }
            }
        }
        shader
    }
}

#[cfg(test)]
mod tests {
    use super::super::MtlxToGltfOptions;
    use super::*;
    use crate::mtlx::parse_mtlx;

    const STANDARD: &str = r#"<?xml version="1.0"?>
<materialx version="1.38">
  <image name="albedo" type="color3">
    <input name="file" type="filename" value="albedo.png" />
  </image>
  <standard_surface name="Car_paint" type="surfaceshader">
    <input name="base" type="float" value="0.5" />
    <input name="base_color" type="color3" value="1, 0.2, 0" />
    <input name="metalness" type="float" value="1" />
    <input name="coat" type="float" value="1" />
    <input name="sheen_color" type="color3" nodename="albedo" />
    <input name="sheen" type="float" value="0.5" />
  </standard_surface>
  <surfacematerial name="MAT_Car_paint" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="Car_paint" />
  </surfacematerial>
  <UsdPreviewSurface name="Preview" type="surfaceshader" />
  <surfacematerial name="MAT_Preview" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="Preview" />
  </surfacematerial>
</materialx>"#;

    #[test]
    fn test_translate_standard_surface() {
        let mut doc = parse_mtlx(STANDARD).unwrap();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        assert_eq!(writer.translate_shaders(&mut doc), 1);

        // Replaced in place
        let position = doc.root.children.iter().position(|c| c.name == "Car_paint").unwrap();
        assert_eq!(position, 1);
        let shader = doc.node("Car_paint").unwrap();
        assert_eq!(shader.category, "gltf_pbr");
        assert_eq!(shader.type_string(), "surfaceshader");

        assert_eq!(shader.input_value("base_color"), Some(Value::Color3([0.5, 0.1, 0.0])));
        assert_eq!(shader.input_value("metallic"), Some(Value::Float(1.0)));
        assert_eq!(shader.input_value("clearcoat"), Some(Value::Float(1.0)));
        assert_eq!(shader.input_value("roughness"), Some(Value::Float(0.2)));
        assert_eq!(shader.input_value("alpha"), Some(Value::Float(1.0)));
        assert_eq!(shader.input_value("emissive"), Some(Value::Color3([0.0, 0.0, 0.0])));
        assert!(shader.input("normal").is_none());

        let sheen = shader.input("sheen_color").unwrap();
        assert_eq!(sheen.attribute("nodename"), Some("albedo"));
        assert!(sheen.value_string().is_none());

        let log = writer.log();
        assert!(log.contains("Failed to translate shader: Preview"));
        assert!(log.contains("Weight not applied"));
        assert_eq!(doc.node("Preview").unwrap().category, "UsdPreviewSurface");
    }

    #[test]
    fn test_translated_document_converts() {
        let mut doc = parse_mtlx(STANDARD).unwrap();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        writer.translate_shaders(&mut doc);

        let mut gltf = serde_json::Map::new();
        assert_eq!(writer.materialx_to_gltf(&doc, &mut gltf, true), 1);
        let material = &gltf["materials"][0];
        assert_eq!(material["name"], "Car_paint");
        assert_eq!(material["extensions"]["KHR_materials_clearcoat"]["clearcoatFactor"], 1.0);
        assert_eq!(material["extensions"]["KHR_materials_sheen"]["sheenColorTexture"]["index"], 0);
    }

    #[test]
    fn test_nothing_to_translate() {
        let mut doc = Document::new();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        assert_eq!(writer.translate_shaders(&mut doc), 0);
    }
}
