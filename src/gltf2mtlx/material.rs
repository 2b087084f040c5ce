//! Translation of glTF material entries into MaterialX shader graphs.

use anyhow::{bail, Result};
use serde_json::Value as JsonValue;

use crate::globals::*;
use crate::mtlx::{format_float, format_floats, Document, Element, Value};
use crate::util::json_array;

use super::GltfToMtlxReader;

/// Shader inputs with geometric defaults, never added with all inputs.
const GEOMETRIC_INPUTS: &[&str] = &["tangent", "normal", "clearcoat_normal", "attenuation_distance"];

/// Texture, image and sampler tables of a glTF document.
pub(super) struct TextureTables<'a> {
    textures: &'a [JsonValue],
    images: &'a [JsonValue],
    samplers: &'a [JsonValue],
}

impl<'a> TextureTables<'a> {
    pub(super) fn new(gltf: &'a JsonValue) -> Self {
        Self {
            textures: json_array(gltf, "textures"),
            images: json_array(gltf, "images"),
            samplers: json_array(gltf, "samplers"),
        }
    }

    fn texture(&self, info: &JsonValue) -> Option<&'a JsonValue> {
        let index = info.get("index")?.as_u64()?;
        self.textures.get(index as usize)
    }

    /// Image URI of a texture info, empty when unresolved.
    fn uri(&self, info: &JsonValue) -> String {
        self.texture(info)
            .and_then(|t| t.get("source"))
            .and_then(JsonValue::as_u64)
            .and_then(|source| self.images.get(source as usize))
            .and_then(|image| image.get("uri"))
            .and_then(JsonValue::as_str)
            .unwrap_or("")
            .to_string()
    }

    fn sampler(&self, info: &JsonValue) -> Option<&'a JsonValue> {
        let index = self.texture(info)?.get("sampler")?.as_u64()?;
        self.samplers.get(index as usize)
    }
}

fn filter_type(code: u64) -> Option<&'static str> {
    match code {
        9728 | 9985 => Some("closest"),
        9729 | 9986 => Some("linear"),
        9984 | 9987 => Some("cubic"),
        _ => None,
    }
}

fn address_mode(code: u64) -> Option<&'static str> {
    match code {
        33071 => Some("clamp"),
        33648 => Some("mirror"),
        10497 => Some("periodic"),
        _ => None,
    }
}

fn alpha_mode(mode: &str) -> i64 {
    match mode {
        "MASK" => 1,
        "BLEND" => 2,
        _ => 0,
    }
}

fn json_floats(value: &JsonValue) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(JsonValue::as_f64).collect()
}

fn get_f64(obj: &JsonValue, key: &str) -> Option<f64> {
    obj.get(key).and_then(JsonValue::as_f64)
}

fn set_input_string(node: &mut Element, name: &str, value: &str) -> bool {
    match node.add_input_from_nodedef(name) {
        Some(input) => {
            input.set_value_string(value);
            true
        }
        None => false,
    }
}

/// Arguments for a mapped or constant float input.
struct FloatInput<'j, 'n> {
    texture: Option<&'j JsonValue>,
    values: Vec<Option<f64>>,
    image_name: &'n str,
    category: &'n str,
    node_type: &'n str,
    inputs: &'n [&'n str],
}

/// Arguments for a mapped or constant color (and alpha) input.
struct ColorInput<'j, 'n> {
    texture: Option<&'j JsonValue>,
    color: Option<Vec<f64>>,
    image_name: &'n str,
    color_input: &'n str,
    alpha_input: Option<&'n str>,
}

impl GltfToMtlxReader {
    /// Add shaders and materials for every glTF material to `doc`.
    ///
    /// Returns the MaterialX material name generated for each glTF material,
    /// in glTF index order.
    pub fn gltf_to_materialx(&mut self, doc: &mut Document, gltf: &JsonValue) -> Result<Vec<String>> {
        let materials = json_array(gltf, "materials");
        if materials.is_empty() {
            self.log.warn("No materials found to convert");
            bail!("No materials found to convert");
        }

        let tables = TextureTables::new(gltf);
        Ok(materials
            .iter()
            .map(|material| self.convert_material(doc, material, &tables))
            .collect())
    }

    fn convert_material(&mut self, doc: &mut Document, material: &JsonValue, tables: &TextureTables) -> String {
        let (shader_name, material_name) = match material.get("name").and_then(JsonValue::as_str) {
            Some(name) => (name.to_string(), format!("{}{}", MTLX_MATERIAL_PREFIX, name)),
            None => (
                MTLX_DEFAULT_SHADER_NAME.to_string(),
                MTLX_DEFAULT_MATERIAL_NAME.to_string(),
            ),
        };
        let shader_name = doc.create_valid_child_name(&shader_name);
        let material_name = doc.create_valid_child_name(&material_name);

        let extensions = material.get("extensions");
        let unlit = material.get("unlit").is_some()
            || extensions.is_some_and(|e| e.get("KHR_materials_unlit").is_some());
        let (category, nodedef) = if unlit {
            (MTLX_UNLIT_CATEGORY, "ND_surface_unlit")
        } else {
            (MTLX_GLTF_PBR_CATEGORY, "ND_gltf_pbr_surfaceshader")
        };

        doc.add_comment(&format!(" Generated shader: {} ", shader_name));
        let shader = doc.add_node(category, &shader_name, SURFACE_SHADER_TYPE);
        shader.set_attribute(MTLX_NODEDEF_ATTRIBUTE, nodedef);
        if self.options.add_all_inputs {
            shader.add_inputs_from_nodedef();
            for name in GEOMETRIC_INPUTS {
                shader.remove_child(name);
            }
        }

        doc.add_comment(&format!(" Generated material: {} ", material_name));
        let material_node = doc.add_node(MTLX_SURFACE_MATERIAL_CATEGORY, &material_name, MATERIAL_TYPE);
        material_node
            .add_input(SURFACE_SHADER_TYPE, SURFACE_SHADER_TYPE)
            .set_node_name(&shader_name);

        self.log
            .log(format!("- Convert glTF material to MaterialX: {}", material_name));

        let shader = shader_name.as_str();

        if let Some(pbr) = material.get("pbrMetallicRoughness") {
            self.read_metallic_roughness(doc, shader, pbr, unlit, tables);
        }

        if let Some(normal) = material.get("normalTexture") {
            self.read_input(
                doc,
                shader,
                FloatInput {
                    texture: Some(normal),
                    values: Vec::new(),
                    image_name: "image_normal",
                    category: MTLX_GLTF_NORMALMAP_IMAGE,
                    node_type: MTLX_VEC3_TYPE,
                    inputs: &["normal"],
                },
                tables,
            );
        }

        if let Some(occlusion) = material.get("occlusionTexture") {
            self.read_input(
                doc,
                shader,
                FloatInput {
                    texture: Some(occlusion),
                    values: Vec::new(),
                    image_name: "image_occlusion",
                    category: MTLX_GLTF_IMAGE,
                    node_type: "float",
                    inputs: &["occlusion"],
                },
                tables,
            );
        }

        let emissive_factor = material
            .get("emissiveFactor")
            .and_then(json_floats)
            .unwrap_or_else(|| vec![0.0, 0.0, 0.0]);
        self.read_color_input(
            doc,
            shader,
            ColorInput {
                texture: material.get("emissiveTexture"),
                color: Some(emissive_factor),
                image_name: "image_emissive",
                color_input: "emissive",
                alpha_input: None,
            },
            tables,
        );

        if let Some(mode) = material.get("alphaMode").and_then(JsonValue::as_str) {
            let mode = alpha_mode(mode);
            if mode != 0 {
                self.set_shader_value(doc, shader, "alpha_mode", Value::Integer(mode));
            }
        }

        if let Some(cutoff) = get_f64(material, "alphaCutoff") {
            if cutoff != 0.5 {
                self.set_shader_value(doc, shader, "alpha_cutoff", Value::Float(cutoff));
            }
        }

        if let Some(extensions) = extensions {
            self.read_extensions(doc, shader, extensions, tables);
        }

        material_name
    }

    fn read_metallic_roughness(
        &mut self,
        doc: &mut Document,
        shader: &str,
        pbr: &JsonValue,
        unlit: bool,
        tables: &TextureTables,
    ) {
        let base_texture = pbr.get("baseColorTexture");
        let base_factor = pbr.get("baseColorFactor").and_then(json_floats);
        if base_texture.is_some() || base_factor.is_some() {
            let (color_input, alpha_input) = if unlit {
                ("emission_color", "opacity")
            } else {
                ("base_color", "alpha")
            };
            let image_name = format!("image_{}", color_input);
            self.read_color_input(
                doc,
                shader,
                ColorInput {
                    texture: base_texture,
                    color: base_factor,
                    image_name: &image_name,
                    color_input,
                    alpha_input: Some(alpha_input),
                },
                tables,
            );
        }

        if let Some(metallic) = get_f64(pbr, "metallicFactor") {
            self.set_shader_value(doc, shader, "metallic", Value::Float(metallic));
        }
        if let Some(roughness) = get_f64(pbr, "roughnessFactor") {
            self.set_shader_value(doc, shader, "roughness", Value::Float(roughness));
        }

        let Some(orm_texture) = pbr.get("metallicRoughnessTexture") else {
            return;
        };
        let Some(image) = self.read_input(
            doc,
            shader,
            FloatInput {
                texture: Some(orm_texture),
                values: Vec::new(),
                image_name: "image_orm",
                category: MTLX_GLTF_IMAGE,
                node_type: MTLX_VEC3_TYPE,
                inputs: &["metallic", "roughness", "occlusion"],
            },
            tables,
        ) else {
            return;
        };

        // Occlusion, roughness and metallic live in the R, G and B channels
        for (index, input_name) in ["occlusion", "roughness", "metallic"].iter().enumerate() {
            let extract_name = doc.create_valid_child_name("extract_orm");
            let extract = doc.add_node("extract", &extract_name, "float");
            extract.add_inputs_from_nodedef();
            if let Some(input) = extract.input_mut("in") {
                input.set_type(MTLX_VEC3_TYPE);
                input.set_node_name(&image);
            }
            if let Some(input) = extract.input_mut("index") {
                input.set_value(&Value::Integer(index as i64));
            }

            match doc
                .node_mut(shader)
                .and_then(|s| s.add_input_from_nodedef(input_name))
            {
                Some(input) => {
                    input.set_type("float");
                    input.set_node_name(&extract_name);
                }
                None => self.log.log(format!("Failed to add input: {}", input_name)),
            }
        }
    }

    fn read_extensions(&mut self, doc: &mut Document, shader: &str, extensions: &JsonValue, tables: &TextureTables) {
        if let Some(ior) = extensions
            .get("KHR_materials_ior")
            .and_then(|e| get_f64(e, "ior"))
        {
            self.set_shader_value(doc, shader, "ior", Value::Float(ior));
        }

        if let Some(specular) = extensions.get("KHR_materials_specular") {
            let color_factor = specular.get("specularColorFactor").and_then(json_floats);
            let color_texture = specular.get("specularColorTexture");
            if color_factor.is_some() || color_texture.is_some() {
                self.read_color_input(
                    doc,
                    shader,
                    ColorInput {
                        texture: color_texture,
                        color: color_factor,
                        image_name: "image_specularcolor",
                        color_input: "specular_color",
                        alpha_input: None,
                    },
                    tables,
                );
            }
            self.read_optional_float(doc, shader, specular, "specularFactor", "specularTexture", "image_specular", "specular", tables);
        }

        if let Some(transmission) = extensions
            .get("KHR_materials_transmission")
            .and_then(|e| get_f64(e, "transmissionFactor"))
        {
            self.set_shader_value(doc, shader, "transmission", Value::Float(transmission));
        }

        if let Some(iridescence) = extensions.get("KHR_materials_iridescence") {
            self.read_iridescence(doc, shader, iridescence, tables);
        }

        if let Some(strength) = extensions
            .get("KHR_materials_emissive_strength")
            .and_then(|e| get_f64(e, "emissiveStrength"))
        {
            self.set_shader_value(doc, shader, "emissive_strength", Value::Float(strength));
        }

        if let Some(volume) = extensions.get("KHR_materials_volume") {
            self.read_optional_float(doc, shader, volume, "thicknessFactor", "thicknessTexture", "image_thickness", "thickness", tables);
            if let Some(color) = volume.get("attenuationColor").and_then(json_floats) {
                if color.len() >= 3 {
                    self.set_shader_value(
                        doc,
                        shader,
                        "attenuation_color",
                        Value::Color3([color[0], color[1], color[2]]),
                    );
                }
            }
            if let Some(distance) = get_f64(volume, "attenuationDistance") {
                self.set_shader_value(doc, shader, "attenuation_distance", Value::Float(distance));
            }
        }

        if let Some(clearcoat) = extensions.get("KHR_materials_clearcoat") {
            self.read_optional_float(doc, shader, clearcoat, "clearcoatFactor", "clearcoatTexture", "image_clearcoat", "clearcoat", tables);
            self.read_optional_float(
                doc,
                shader,
                clearcoat,
                "clearcoatRoughnessFactor",
                "clearcoatRoughnessTexture",
                "image_clearcoat_roughness",
                "clearcoat_roughness",
                tables,
            );
            if let Some(normal) = clearcoat.get("clearcoatNormalTexture") {
                self.read_input(
                    doc,
                    shader,
                    FloatInput {
                        texture: Some(normal),
                        values: Vec::new(),
                        image_name: "image_clearcoat_normal",
                        category: MTLX_GLTF_NORMALMAP_IMAGE,
                        node_type: MTLX_VEC3_TYPE,
                        inputs: &["clearcoat_normal"],
                    },
                    tables,
                );
            }
        }

        if let Some(sheen) = extensions.get("KHR_materials_sheen") {
            let color_factor = sheen.get("sheenColorFactor").and_then(json_floats);
            let color_texture = sheen.get("sheenColorTexture");
            if color_factor.is_some() || color_texture.is_some() {
                self.read_color_input(
                    doc,
                    shader,
                    ColorInput {
                        texture: color_texture,
                        color: color_factor,
                        image_name: "image_sheen",
                        color_input: "sheen_color",
                        alpha_input: None,
                    },
                    tables,
                );
            }
            self.read_optional_float(
                doc,
                shader,
                sheen,
                "sheenRoughnessFactor",
                "sheenRoughnessTexture",
                "image_sheen_roughness",
                "sheen_roughness",
                tables,
            );
        }
    }

    fn read_iridescence(&mut self, doc: &mut Document, shader: &str, iridescence: &JsonValue, tables: &TextureTables) {
        self.read_optional_float(
            doc,
            shader,
            iridescence,
            "iridescenceFactor",
            "iridescenceTexture",
            "image_iridescence",
            "iridescence",
            tables,
        );

        if let Some(ior) = get_f64(iridescence, "iridescenceIor") {
            self.set_shader_value(doc, shader, "iridescence_ior", Value::Float(ior));
        }

        let minimum = get_f64(iridescence, "iridescenceThicknessMinimum");
        let maximum = get_f64(iridescence, "iridescenceThicknessMaximum");
        let texture = iridescence.get("iridescenceThicknessTexture");
        let Some(texture) = texture else {
            if minimum.is_some() || maximum.is_some() {
                self.log
                    .log("Iridescence thickness range without a texture is not mapped");
            }
            return;
        };

        let uri = tables.uri(texture);
        let image = self.add_mtlx_image(
            doc,
            "image_iridescence_thickness",
            &uri,
            MTLX_GLTF_IRIDESCENCE_THICKNESS,
            "float",
            None,
        );
        self.read_image_properties(doc, &image, texture, tables);
        if let Some(node) = doc.node_mut(&image) {
            for (name, value) in [("thicknessMin", minimum), ("thicknessMax", maximum)] {
                let Some(value) = value else {
                    continue;
                };
                if let Some(input) = node.add_input_from_nodedef(name) {
                    input.set_value(&Value::Float(value));
                }
            }
        }
        self.connect_shader_input(doc, shader, "iridescence_thickness", &image, None);
    }

    /// Read a `<name>Factor` / `<name>Texture` pair into a single float input.
    #[allow(clippy::too_many_arguments)]
    fn read_optional_float(
        &mut self,
        doc: &mut Document,
        shader: &str,
        extension: &JsonValue,
        factor_key: &str,
        texture_key: &str,
        image_name: &str,
        input_name: &str,
        tables: &TextureTables,
    ) {
        let factor = get_f64(extension, factor_key);
        let texture = extension.get(texture_key);
        if factor.is_none() && texture.is_none() {
            return;
        }
        self.read_input(
            doc,
            shader,
            FloatInput {
                texture,
                values: vec![factor],
                image_name,
                category: MTLX_GLTF_IMAGE,
                node_type: "float",
                inputs: &[input_name],
            },
            tables,
        );
    }

    /// Connect shader inputs to a new image node, or set constant values
    /// when there is no texture. Returns the image node name.
    fn read_input(
        &mut self,
        doc: &mut Document,
        shader: &str,
        input: FloatInput,
        tables: &TextureTables,
    ) -> Option<String> {
        if let Some(info) = input.texture {
            let uri = tables.uri(info);
            let image = self.add_mtlx_image(doc, input.image_name, &uri, input.category, input.node_type, None);
            self.read_image_properties(doc, &image, info, tables);
            for name in input.inputs {
                self.connect_shader_input(doc, shader, name, &image, None);
            }
            return Some(image);
        }

        if input.values.len() == input.inputs.len() {
            for (name, value) in input.inputs.iter().zip(&input.values) {
                if let Some(value) = value {
                    self.set_shader_value(doc, shader, name, Value::Float(*value));
                }
            }
        }
        None
    }

    /// Connect color and alpha inputs to a new `gltf_colorimage`, or set the
    /// constant color when there is no texture.
    fn read_color_input(&mut self, doc: &mut Document, shader: &str, input: ColorInput, tables: &TextureTables) {
        let mut assigned = false;

        if let Some(info) = input.texture {
            let uri = tables.uri(info);
            let image = self.add_mtlx_image(
                doc,
                input.image_name,
                &uri,
                MTLX_GLTF_COLOR_IMAGE,
                MULTI_OUTPUT_TYPE,
                Some(MTLX_DEFAULT_COLORSPACE),
            );
            self.read_image_properties(doc, &image, info, tables);
            self.connect_shader_input(doc, shader, input.color_input, &image, Some("outcolor"));
            if let Some(alpha) = input.alpha_input {
                self.connect_shader_input(doc, shader, alpha, &image, Some("outa"));
            }
            assigned = true;
        }

        let Some(color) = input.color.filter(|c| c.len() >= 3) else {
            return;
        };
        if assigned {
            return;
        }

        match doc
            .node_mut(shader)
            .and_then(|s| s.add_input_from_nodedef(input.color_input))
        {
            Some(color_input) => {
                color_input.set_value(&Value::Color3([color[0], color[1], color[2]]));
                color_input.set_attribute(MTLX_COLOR_SPACE_ATTRIBUTE, MTLX_DEFAULT_COLORSPACE);
            }
            None => self
                .log
                .log(format!("Failed to add color input: {}", input.color_input)),
        }

        if let (Some(alpha), Some(value)) = (input.alpha_input, color.get(3)) {
            self.set_shader_value(doc, shader, alpha, Value::Float(*value));
        }
    }

    /// Add an image node reading `file`. Returns the (unique) node name.
    pub(super) fn add_mtlx_image(
        &mut self,
        doc: &mut Document,
        name: &str,
        file: &str,
        category: &str,
        node_type: &str,
        colorspace: Option<&str>,
    ) -> String {
        let name = doc.create_valid_child_name(name);
        let node = doc.add_node(category, &name, node_type);
        if node.node_def().is_none() {
            self.log.log(format!(
                "Failed to create image node. Category, name, type: {} {} {}",
                category, name, node_type
            ));
            return name;
        }

        match node.add_input_from_nodedef("file") {
            Some(file_input) => {
                file_input.set_type(FILENAME_TYPE);
                file_input.set_value_string(file);
                if let Some(colorspace) = colorspace {
                    file_input.set_attribute(MTLX_COLOR_SPACE_ATTRIBUTE, colorspace);
                }
            }
            None => self
                .log
                .log(format!("-- failed to create file input for name: {}", file)),
        }
        name
    }

    /// Add a `texcoord` node reading `uv_index` and connect it to the image.
    pub(super) fn add_texcoord_node(&mut self, doc: &mut Document, image: &str, uv_index: i64) -> String {
        let name = doc.create_valid_child_name("texcoord");
        let texcoord = doc.add_node("texcoord", &name, "vector2");
        if let Some(index) = texcoord.add_input_from_nodedef("index") {
            index.set_value(&Value::Integer(uv_index));
        }
        match doc
            .node_mut(image)
            .and_then(|n| n.add_input_from_nodedef("texcoord"))
        {
            Some(input) => input.set_node_name(&name),
            None => self
                .log
                .log(format!("Failed to add texcoord input to image: {}", image)),
        }
        name
    }

    /// Copy texture transform, UV set and sampler settings onto an image node.
    pub(super) fn read_image_properties(
        &mut self,
        doc: &mut Document,
        image: &str,
        info: &JsonValue,
        tables: &TextureTables,
    ) {
        let mut texcoord = info.get("texCoord").and_then(JsonValue::as_i64);

        let Some(node) = doc.node_mut(image) else {
            return;
        };

        if let Some(transform) = info
            .get("extensions")
            .and_then(|e| e.get("KHR_texture_transform"))
        {
            // Rotation is counter clockwise radians in glTF, degrees in MaterialX
            if let Some(rotation) = get_f64(transform, "rotation") {
                set_input_string(node, "rotate", &format_float(rotation * TO_DEGREE));
            }
            if let Some(offset) = transform.get("offset").and_then(json_floats) {
                set_input_string(node, "offset", &format_floats(&offset));
            }
            if let Some(scale) = transform.get("scale").and_then(json_floats) {
                set_input_string(node, "scale", &format_floats(&scale));
            }
            if let Some(uv) = transform.get("texCoord").and_then(JsonValue::as_i64) {
                texcoord = Some(uv);
            }
        }

        if let Some(sampler) = tables.sampler(info) {
            // Only one filter type exists; the minification filter wins
            let filter = ["minFilter", "magFilter"]
                .iter()
                .filter_map(|key| sampler.get(*key).and_then(JsonValue::as_u64))
                .find_map(filter_type);
            if let Some(filter) = filter {
                set_input_string(node, "filtertype", filter);
            }

            for (key, input_name) in [("wrapS", "uaddressmode"), ("wrapT", "vaddressmode")] {
                let Some(code) = sampler.get(key).and_then(JsonValue::as_u64) else {
                    continue;
                };
                match address_mode(code) {
                    Some(mode) => {
                        if !set_input_string(node, input_name, mode) {
                            self.log.log(format!("Failed to add {} input", input_name));
                        }
                    }
                    None => self
                        .log
                        .log(format!("Unknown sampler wrap mode {} on {}", code, image)),
                }
            }
        }

        if let Some(uv) = texcoord.filter(|uv| *uv != 0) {
            self.add_texcoord_node(doc, image, uv);
        }
    }

    fn set_shader_value(&mut self, doc: &mut Document, shader: &str, input: &str, value: Value) {
        match doc
            .node_mut(shader)
            .and_then(|s| s.add_input_from_nodedef(input))
        {
            Some(shader_input) => shader_input.set_value(&value),
            None => self.log.log(format!("Failed to add input: {}", input)),
        }
    }

    fn connect_shader_input(
        &mut self,
        doc: &mut Document,
        shader: &str,
        input: &str,
        node_name: &str,
        output: Option<&str>,
    ) {
        match doc
            .node_mut(shader)
            .and_then(|s| s.add_input_from_nodedef(input))
        {
            Some(shader_input) => {
                shader_input.set_node_name(node_name);
                if let Some(output) = output {
                    shader_input.set_attribute(MTLX_OUTPUT_ATTRIBUTE, output);
                }
            }
            None => self.log.log(format!("Failed to add input: {}", input)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{GltfToMtlxOptions, GltfToMtlxReader};
    use super::*;
    use serde_json::json;

    fn convert(gltf: JsonValue) -> Document {
        let mut reader = GltfToMtlxReader::new(GltfToMtlxOptions::default());
        let mut doc = Document::new();
        reader.gltf_to_materialx(&mut doc, &gltf).unwrap();
        doc
    }

    #[test]
    fn test_no_materials() {
        let mut reader = GltfToMtlxReader::new(GltfToMtlxOptions::default());
        let mut doc = Document::new();
        let err = reader
            .gltf_to_materialx(&mut doc, &json!({ "asset": { "version": "2.0" } }))
            .unwrap_err();
        assert_eq!(err.to_string(), "No materials found to convert");
    }

    #[test]
    fn test_constant_factors() {
        let doc = convert(json!({
            "materials": [{
                "name": "Gold",
                "pbrMetallicRoughness": {
                    "baseColorFactor": [1.0, 0.8, 0.2, 0.5],
                    "metallicFactor": 1.0,
                    "roughnessFactor": 0.25
                },
                "alphaMode": "BLEND",
                "alphaCutoff": 0.5
            }]
        }));

        let shader = doc.node("Gold").unwrap();
        assert_eq!(shader.category, "gltf_pbr");
        assert_eq!(shader.attribute("nodedef"), Some("ND_gltf_pbr_surfaceshader"));
        let base = shader.input("base_color").unwrap();
        assert_eq!(base.value_string(), Some("1, 0.8, 0.2"));
        assert_eq!(base.attribute("colorspace"), Some("srgb_texture"));
        assert_eq!(shader.input_value("alpha"), Some(Value::Float(0.5)));
        assert_eq!(shader.input_value("roughness"), Some(Value::Float(0.25)));
        assert_eq!(shader.input_value("alpha_mode"), Some(Value::Integer(2)));
        assert!(shader.input("alpha_cutoff").is_none());
        assert_eq!(
            shader.input("emissive").unwrap().value_string(),
            Some("0, 0, 0")
        );

        let material = doc.node("MAT_Gold").unwrap();
        assert_eq!(material.category, "surfacematerial");
        assert_eq!(
            material.input("surfaceshader").unwrap().attribute("nodename"),
            Some("Gold")
        );
        assert_eq!(doc.root.children[0].doc_string(), " Generated shader: Gold ");
        assert_eq!(doc.root.children[2].doc_string(), " Generated material: MAT_Gold ");
    }

    #[test]
    fn test_default_names_are_unique() {
        let doc = convert(json!({ "materials": [{}, {}] }));
        assert!(doc.node("SHD_0").is_some());
        assert!(doc.node("MAT_0").is_some());
        assert!(doc.node("SHD_1").is_some());
        assert!(doc.node("MAT_1").is_some());
    }

    #[test]
    fn test_base_color_texture_with_sampler() {
        let doc = convert(json!({
            "materials": [{
                "name": "Wood",
                "pbrMetallicRoughness": {
                    "baseColorTexture": {
                        "index": 0,
                        "texCoord": 1,
                        "extensions": {
                            "KHR_texture_transform": {
                                "offset": [0.5, 0.25],
                                "scale": [2.0, 2.0]
                            }
                        }
                    }
                }
            }],
            "textures": [{ "source": 0, "sampler": 0 }],
            "images": [{ "uri": "wood.png" }],
            "samplers": [{ "magFilter": 9729, "minFilter": 9728, "wrapS": 33071, "wrapT": 33648 }]
        }));

        let shader = doc.node("Wood").unwrap();
        let base = shader.input("base_color").unwrap();
        assert_eq!(base.attribute("nodename"), Some("image_base_color"));
        assert_eq!(base.attribute("output"), Some("outcolor"));
        assert!(base.value_string().is_none());
        assert_eq!(shader.input("alpha").unwrap().attribute("output"), Some("outa"));

        let image = doc.node("image_base_color").unwrap();
        assert_eq!(image.category, "gltf_colorimage");
        assert_eq!(image.type_string(), "multioutput");
        let file = image.input("file").unwrap();
        assert_eq!(file.value_string(), Some("wood.png"));
        assert_eq!(file.attribute("colorspace"), Some("srgb_texture"));
        assert_eq!(image.input("offset").unwrap().value_string(), Some("0.5, 0.25"));
        assert_eq!(image.input("scale").unwrap().value_string(), Some("2, 2"));
        assert_eq!(image.input("filtertype").unwrap().value_string(), Some("closest"));
        assert_eq!(image.input("uaddressmode").unwrap().value_string(), Some("clamp"));
        assert_eq!(image.input("vaddressmode").unwrap().value_string(), Some("mirror"));
        assert_eq!(image.input("texcoord").unwrap().attribute("nodename"), Some("texcoord"));

        let texcoord = doc.node("texcoord").unwrap();
        assert_eq!(texcoord.input_value("index"), Some(Value::Integer(1)));
    }

    #[test]
    fn test_orm_texture_routes_through_extract() {
        let doc = convert(json!({
            "materials": [{
                "name": "Metal",
                "pbrMetallicRoughness": { "metallicRoughnessTexture": { "index": 0 } }
            }],
            "textures": [{ "source": 0 }],
            "images": [{ "uri": "orm.png" }]
        }));

        let shader = doc.node("Metal").unwrap();
        let image = doc.node("image_orm").unwrap();
        assert_eq!(image.type_string(), "vector3");

        for (input, index) in [("occlusion", 0), ("roughness", 1), ("metallic", 2)] {
            let extract_name = shader.input(input).unwrap().attribute("nodename").unwrap();
            let extract = doc.node(extract_name).unwrap();
            assert_eq!(extract.category, "extract");
            assert_eq!(extract.input("in").unwrap().attribute("nodename"), Some("image_orm"));
            assert_eq!(extract.input_value("index"), Some(Value::Integer(index)));
        }
    }

    #[test]
    fn test_unlit_material() {
        let doc = convert(json!({
            "materials": [{
                "name": "Flat",
                "extensions": { "KHR_materials_unlit": {} },
                "pbrMetallicRoughness": { "baseColorFactor": [0.1, 0.2, 0.3, 1.0] }
            }]
        }));
        let shader = doc.node("Flat").unwrap();
        assert_eq!(shader.category, "surface_unlit");
        assert_eq!(
            shader.input("emission_color").unwrap().value_string(),
            Some("0.1, 0.2, 0.3")
        );
        assert_eq!(shader.input_value("opacity"), Some(Value::Float(1.0)));
        assert!(shader.input("emissive").is_none());
    }

    #[test]
    fn test_extensions() {
        let doc = convert(json!({
            "materials": [{
                "name": "Glass",
                "extensions": {
                    "KHR_materials_ior": { "ior": 1.4 },
                    "KHR_materials_transmission": { "transmissionFactor": 1.0 },
                    "KHR_materials_specular": { "specularFactor": 0.5, "specularColorFactor": [1.0, 0.5, 0.5] },
                    "KHR_materials_volume": { "thicknessFactor": 0.1, "attenuationColor": [0.9, 0.9, 1.0], "attenuationDistance": 2.0 },
                    "KHR_materials_clearcoat": { "clearcoatFactor": 0.75, "clearcoatNormalTexture": { "index": 0 } },
                    "KHR_materials_sheen": { "sheenColorFactor": [0.2, 0.2, 0.2], "sheenRoughnessFactor": 0.3 },
                    "KHR_materials_emissive_strength": { "emissiveStrength": 5.0 },
                    "KHR_materials_iridescence": {
                        "iridescenceFactor": 1.0,
                        "iridescenceIor": 1.8,
                        "iridescenceThicknessMaximum": 500.0,
                        "iridescenceThicknessTexture": { "index": 0 }
                    }
                }
            }],
            "textures": [{ "source": 0 }],
            "images": [{ "uri": "detail.png" }]
        }));

        let shader = doc.node("Glass").unwrap();
        let value = |name: &str| shader.input_value(name).unwrap();
        assert_eq!(value("ior"), Value::Float(1.4));
        assert_eq!(value("transmission"), Value::Float(1.0));
        assert_eq!(value("specular"), Value::Float(0.5));
        assert_eq!(value("specular_color"), Value::Color3([1.0, 0.5, 0.5]));
        assert_eq!(value("thickness"), Value::Float(0.1));
        assert_eq!(value("attenuation_color"), Value::Color3([0.9, 0.9, 1.0]));
        assert_eq!(value("attenuation_distance"), Value::Float(2.0));
        assert_eq!(value("clearcoat"), Value::Float(0.75));
        assert_eq!(value("sheen_color"), Value::Color3([0.2, 0.2, 0.2]));
        assert_eq!(value("sheen_roughness"), Value::Float(0.3));
        assert_eq!(value("emissive_strength"), Value::Float(5.0));
        assert_eq!(value("iridescence"), Value::Float(1.0));
        assert_eq!(value("iridescence_ior"), Value::Float(1.8));

        let normal = shader.input("clearcoat_normal").unwrap();
        let normal_image = doc.node(normal.attribute("nodename").unwrap()).unwrap();
        assert_eq!(normal_image.category, "gltf_normalmap");

        let thickness = shader.input("iridescence_thickness").unwrap();
        let thickness_image = doc.node(thickness.attribute("nodename").unwrap()).unwrap();
        assert_eq!(thickness_image.category, "gltf_iridescence_thickness");
        assert_eq!(thickness_image.input_value("thicknessMax"), Some(Value::Float(500.0)));
        assert!(thickness_image.input("thicknessMin").is_none());
    }

    #[test]
    fn test_add_all_inputs() {
        let mut reader = GltfToMtlxReader::new(GltfToMtlxOptions {
            add_all_inputs: true,
            ..Default::default()
        });
        let mut doc = Document::new();
        reader
            .gltf_to_materialx(&mut doc, &json!({ "materials": [{ "name": "m" }] }))
            .unwrap();
        let shader = doc.node("m").unwrap();
        assert!(shader.input("ior").is_some());
        assert!(shader.input("sheen_color").is_some());
        assert!(shader.input("normal").is_none());
        assert!(shader.input("tangent").is_none());
    }
}
