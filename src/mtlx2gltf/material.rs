//! glTF material, texture, image and sampler writing.

use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::Path;

use crate::globals::*;
use crate::mtlx::{Document, Element, NodeRef, Value};
use crate::util::{json_array_entry, json_object_entry, posix_path};

use super::MtlxToGltfWriter;

pub(super) const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";
pub(super) const KHR_PROCEDURALS: &str = "KHR_procedurals";

/// Material output tables, detached from the glTF JSON while writing.
#[derive(Debug, Default)]
pub(super) struct GltfTables {
    pub materials: Vec<JsonValue>,
    pub textures: Vec<JsonValue>,
    pub images: Vec<JsonValue>,
    pub samplers: Vec<JsonValue>,
    pub extensions_used: Vec<String>,
    pub procedurals: Vec<JsonValue>,
    /// Procedural indices by element path, per exported node graph
    pub graphs: HashMap<String, HashMap<String, usize>>,
}

fn take_array(gltf: &mut Map<String, JsonValue>, key: &str) -> Vec<JsonValue> {
    match gltf.remove(key) {
        Some(JsonValue::Array(items)) => items,
        _ => Vec::new(),
    }
}

impl GltfTables {
    /// Detach the tables from `gltf`.
    ///
    /// With `reset_materials` existing materials are dropped along with their
    /// textures, images, samplers and material extension declarations.
    fn take(gltf: &mut Map<String, JsonValue>, reset_materials: bool) -> Self {
        let mut tables = Self {
            materials: take_array(gltf, "materials"),
            textures: take_array(gltf, "textures"),
            images: take_array(gltf, "images"),
            samplers: take_array(gltf, "samplers"),
            extensions_used: take_array(gltf, "extensionsUsed")
                .into_iter()
                .filter_map(|e| e.as_str().map(String::from))
                .collect(),
            procedurals: gltf
                .get_mut("extensions")
                .and_then(|e| e.get_mut(KHR_PROCEDURALS))
                .and_then(JsonValue::as_object_mut)
                .and_then(|p| p.remove("procedurals"))
                .and_then(|p| match p {
                    JsonValue::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            graphs: HashMap::new(),
        };

        if reset_materials {
            tables.materials.clear();
            tables.textures.clear();
            tables.images.clear();
            tables.samplers.clear();
            tables.procedurals.clear();
            tables
                .extensions_used
                .retain(|e| !e.starts_with("KHR_materials_") && e != KHR_TEXTURE_TRANSFORM && e != KHR_PROCEDURALS);
        }
        tables
    }

    /// Store the tables back, dropping empty ones.
    fn restore(self, gltf: &mut Map<String, JsonValue>) {
        if !self.extensions_used.is_empty() {
            gltf.insert("extensionsUsed".into(), json!(self.extensions_used));
        }
        gltf.insert("materials".into(), JsonValue::Array(self.materials));
        for (key, items) in [
            ("textures", self.textures),
            ("images", self.images),
            ("samplers", self.samplers),
        ] {
            if !items.is_empty() {
                gltf.insert(key.into(), JsonValue::Array(items));
            }
        }
        if !self.procedurals.is_empty() {
            let extension = json_object_entry(json_object_entry(gltf, "extensions"), KHR_PROCEDURALS);
            extension.insert("procedurals".into(), JsonValue::Array(self.procedurals));
        } else if let Some(extensions) = gltf.get_mut("extensions").and_then(JsonValue::as_object_mut) {
            let empty = extensions
                .get(KHR_PROCEDURALS)
                .and_then(JsonValue::as_object)
                .is_some_and(Map::is_empty);
            if empty {
                extensions.remove(KHR_PROCEDURALS);
            }
        }
    }

    pub(super) fn use_extension(&mut self, name: &str) {
        if !self.extensions_used.iter().any(|e| e == name) {
            self.extensions_used.push(name.to_string());
        }
    }

    /// Add an image and a texture sourcing it. Returns the texture index.
    pub(super) fn add_texture(&mut self, name: &str, uri: &str) -> usize {
        self.images.push(json!({
            "name": name,
            "uri": posix_path(Path::new(uri)),
        }));
        self.textures.push(json!({
            "name": name,
            "source": self.images.len() - 1,
        }));
        self.textures.len() - 1
    }

    /// Index of an equal sampler, adding it when new.
    fn sampler_index(&mut self, sampler: JsonValue) -> usize {
        match self.samplers.iter().position(|s| *s == sampler) {
            Some(index) => index,
            None => {
                self.samplers.push(sampler);
                self.samplers.len() - 1
            }
        }
    }
}

fn wrap_code(mode: Option<&str>) -> u32 {
    match mode {
        Some("clamp") => 33071,
        Some("mirror") => 33648,
        _ => 10497,
    }
}

fn min_filter_code(filter: &str) -> Option<u32> {
    match filter {
        "closest" => Some(9728),
        "linear" => Some(9986),
        "cubic" => Some(9729),
        _ => None,
    }
}

fn alpha_mode_name(mode: i64) -> Option<&'static str> {
    match mode {
        0 => Some("OPAQUE"),
        1 => Some("MASK"),
        2 => Some("BLEND"),
        _ => None,
    }
}

fn insert_extension(
    extensions: &mut Map<String, JsonValue>,
    tables: &mut GltfTables,
    name: &str,
    extension: Map<String, JsonValue>,
) {
    if extension.is_empty() {
        return;
    }
    tables.use_extension(name);
    extensions.insert(name.to_string(), JsonValue::Object(extension));
}

/// A shader together with the textures feeding it.
#[derive(Clone, Copy)]
pub(super) struct ShaderContext<'a> {
    pub doc: &'a Document,
    pub shader: NodeRef<'a>,
}

impl<'a> ShaderContext<'a> {
    /// Image node and resolved file feeding `input`.
    pub(super) fn image_source(&self, input: &str) -> Option<(NodeRef<'a>, String)> {
        let image = self.doc.connected_node_of(self.shader, input)?;
        let file = self.doc.image_file(image)?;
        Some((image, file))
    }

    /// Image feeding `input`, read past a `normalmap` node.
    fn normal_source(&self, input: &str) -> Option<(NodeRef<'a>, String)> {
        let mut node = self.doc.connected_node_of(self.shader, input)?;
        if node.category() == "normalmap" {
            node = self.doc.connected_node_of(node, "in")?;
        }
        let file = self.doc.image_file(node)?;
        Some((node, file))
    }

    fn value(&self, input: &str) -> Option<Value> {
        self.shader.node.input_value(input)
    }

    fn is_default(&self, input: &str, value: &Value) -> bool {
        self.shader.node.default_input_value(input).as_ref() == Some(value)
    }
}

impl MtlxToGltfWriter {
    /// Write the materials of `doc` into glTF JSON.
    ///
    /// Existing materials are dropped when `reset_materials` is set. Returns
    /// the number of materials written.
    pub fn materialx_to_gltf(
        &mut self,
        doc: &Document,
        gltf: &mut Map<String, JsonValue>,
        reset_materials: bool,
    ) -> usize {
        // Unlit materials come first, then gltf_pbr
        let mut shaders: Vec<NodeRef> = Vec::new();
        for category in [MTLX_UNLIT_CATEGORY, MTLX_GLTF_PBR_CATEGORY] {
            for material in doc.material_nodes() {
                for shader in doc.shader_nodes(material) {
                    if shader.category() == category
                        && !shaders.iter().any(|s| s.name_path() == shader.name_path())
                    {
                        shaders.push(shader);
                    }
                }
            }
        }
        if shaders.is_empty() {
            self.log.log("No gltf_pbr or surface_unlit shaders found");
            return 0;
        }

        let asset = json_object_entry(gltf, "asset");
        asset.insert(
            "generator".into(),
            JsonValue::from(format!("MaterialX {} to glTF 2.0 generator", doc.version())),
        );
        asset.insert("version".into(), JsonValue::from("2.0"));
        if let Some(copyright) = &self.options.copyright {
            asset.insert("copyright".into(), JsonValue::from(copyright.as_str()));
        }

        let mut tables = GltfTables::take(gltf, reset_materials);
        for shader in &shaders {
            let ctx = ShaderContext { doc, shader: *shader };
            let material = if shader.category() == MTLX_UNLIT_CATEGORY {
                self.write_unlit_material(ctx, &mut tables)
            } else {
                self.write_pbr_material(ctx, &mut tables)
            };
            tables.materials.push(JsonValue::Object(material));
        }
        tables.restore(gltf);

        shaders.len()
    }

    fn write_unlit_material(&mut self, ctx: ShaderContext, tables: &mut GltfTables) -> Map<String, JsonValue> {
        let name = ctx.shader.name_path();
        self.log.log(format!("- Convert MaterialX unlit node to glTF: {}", name));

        let mut material = Map::new();
        material.insert("name".into(), JsonValue::from(name));

        let mut pbr = Map::new();
        self.write_base_color(ctx, tables, "emission_color", "opacity", &mut pbr);
        material.insert("pbrMetallicRoughness".into(), JsonValue::Object(pbr));

        tables.use_extension("KHR_materials_unlit");
        material.insert("extensions".into(), json!({ "KHR_materials_unlit": {} }));
        material
    }

    fn write_pbr_material(&mut self, ctx: ShaderContext, tables: &mut GltfTables) -> Map<String, JsonValue> {
        let name = ctx.shader.name_path();
        self.log.log(format!("- Convert MaterialX node to glTF: {}", name));

        let mut material = Map::new();
        let mut extensions = Map::new();
        material.insert("name".into(), JsonValue::from(name));

        let mut pbr = Map::new();
        self.write_base_color(ctx, tables, "base_color", "alpha", &mut pbr);
        self.write_orm(ctx, tables, &mut pbr, &mut material);
        material.insert("pbrMetallicRoughness".into(), JsonValue::Object(pbr));

        if let Some((image, file)) = ctx.normal_source("normal") {
            let info = self.write_texture_info(ctx.doc, tables, image, &file);
            material.insert("normalTexture".into(), JsonValue::Object(info));
        }

        let mut transmission = Map::new();
        self.write_float_input(ctx, tables, "transmission", Some("transmissionTexture"), "transmissionFactor", &mut transmission);
        insert_extension(&mut extensions, tables, "KHR_materials_transmission", transmission);

        let mut specular = Map::new();
        let procedural_graph = ctx
            .doc
            .connected_node_of(ctx.shader, "specular_color")
            .and_then(|n| n.graph)
            .filter(|_| self.options.create_procedural_textures);
        match procedural_graph {
            Some(graph) => {
                if let Some(info) = self.write_procedural_texture_info(ctx, tables, "specular_color", graph) {
                    specular.insert("specularColorTexture".into(), JsonValue::Object(info));
                }
            }
            None => self.write_color3_input(ctx, tables, "specular_color", Some("specularColorTexture"), "specularColorFactor", &mut specular),
        }
        self.write_float_input(ctx, tables, "specular", Some("specularTexture"), "specularFactor", &mut specular);
        insert_extension(&mut extensions, tables, "KHR_materials_specular", specular);

        self.write_color3_input(ctx, tables, "emissive", Some("emissiveTexture"), "emissiveFactor", &mut material);

        let mut strength = Map::new();
        self.write_float_input(ctx, tables, "emissive_strength", None, "emissiveStrength", &mut strength);
        insert_extension(&mut extensions, tables, "KHR_materials_emissive_strength", strength);

        let mut ior = Map::new();
        self.write_float_input(ctx, tables, "ior", None, "ior", &mut ior);
        insert_extension(&mut extensions, tables, "KHR_materials_ior", ior);

        let mut sheen = Map::new();
        self.write_color3_input(ctx, tables, "sheen_color", Some("sheenColorTexture"), "sheenColorFactor", &mut sheen);
        self.write_float_input(ctx, tables, "sheen_roughness", Some("sheenRoughnessTexture"), "sheenRoughnessFactor", &mut sheen);
        insert_extension(&mut extensions, tables, "KHR_materials_sheen", sheen);

        let mut clearcoat = Map::new();
        self.write_float_input(ctx, tables, "clearcoat", Some("clearcoatTexture"), "clearcoatFactor", &mut clearcoat);
        self.write_float_input(
            ctx,
            tables,
            "clearcoat_roughness",
            Some("clearcoatRoughnessTexture"),
            "clearcoatRoughnessFactor",
            &mut clearcoat,
        );
        if let Some((image, file)) = ctx.normal_source("clearcoat_normal") {
            let info = self.write_texture_info(ctx.doc, tables, image, &file);
            clearcoat.insert("clearcoatNormalTexture".into(), JsonValue::Object(info));
        }
        insert_extension(&mut extensions, tables, "KHR_materials_clearcoat", clearcoat);

        let mut volume = Map::new();
        self.write_float_input(ctx, tables, "thickness", Some("thicknessTexture"), "thicknessFactor", &mut volume);
        self.write_color3_input(ctx, tables, "attenuation_color", None, "attenuationColor", &mut volume);
        self.write_float_input(ctx, tables, "attenuation_distance", None, "attenuationDistance", &mut volume);
        insert_extension(&mut extensions, tables, "KHR_materials_volume", volume);

        let alpha_mode = ctx.value("alpha_mode");
        let write_alpha_mode = alpha_mode
            .as_ref()
            .is_some_and(|mode| self.options.write_default_inputs || !ctx.is_default("alpha_mode", mode));
        let mode_name = alpha_mode
            .as_ref()
            .and_then(Value::as_integer)
            .and_then(alpha_mode_name)
            .filter(|_| write_alpha_mode);
        if let Some(mode_name) = mode_name {
            material.insert("alphaMode".into(), JsonValue::from(mode_name));
        }
        if alpha_mode.and_then(|v| v.as_integer()) == Some(1) {
            self.write_float_input(ctx, tables, "alpha_cutoff", None, "alphaCutoff", &mut material);
        }

        let iridescence = self.write_iridescence(ctx, tables);
        insert_extension(&mut extensions, tables, "KHR_materials_iridescence", iridescence);

        if !extensions.is_empty() {
            material.insert("extensions".into(), JsonValue::Object(extensions));
        }
        material
    }

    fn write_iridescence(&mut self, ctx: ShaderContext, tables: &mut GltfTables) -> Map<String, JsonValue> {
        let mut iridescence = Map::new();
        self.write_float_input(ctx, tables, "iridescence", Some("iridescenceTexture"), "iridescenceFactor", &mut iridescence);
        self.write_float_input(ctx, tables, "iridescence_ior", None, "iridescenceIor", &mut iridescence);

        if let Some((thickness, file)) = ctx.image_source("iridescence_thickness") {
            let info = self.write_texture_info(ctx.doc, tables, thickness, &file);
            iridescence.insert("iridescenceThicknessTexture".into(), JsonValue::Object(info));
            for (input, key) in [
                ("thicknessMin", "iridescenceThicknessMinimum"),
                ("thicknessMax", "iridescenceThicknessMaximum"),
            ] {
                if let Some(value) = thickness
                    .node
                    .input(input)
                    .and_then(Element::value)
                    .and_then(|v| v.as_float())
                {
                    iridescence.insert(key.into(), JsonValue::from(value));
                }
            }
        }
        iridescence
    }

    /// Base color texture or factor, with alpha from `alpha_input`.
    fn write_base_color(
        &mut self,
        ctx: ShaderContext,
        tables: &mut GltfTables,
        color_input: &str,
        alpha_input: &str,
        pbr: &mut Map<String, JsonValue>,
    ) {
        if self.options.create_procedural_textures {
            if let Some(graph) = ctx
                .doc
                .connected_node_of(ctx.shader, color_input)
                .and_then(|n| n.graph)
            {
                self.log
                    .log(format!("- Generate KHR procedurals for graph: {}", graph.name));
                if let Some(info) = self.write_procedural_texture_info(ctx, tables, color_input, graph) {
                    pbr.insert("baseColorTexture".into(), JsonValue::Object(info));
                }
                return;
            }
        }

        if let Some((image, file)) = ctx.image_source(color_input) {
            let info = self.write_texture_info(ctx.doc, tables, image, &file);
            pbr.insert("baseColorTexture".into(), JsonValue::Object(info));
            return;
        }

        let color = ctx.value(color_input);
        let alpha = ctx.value(alpha_input);
        let differs = self.options.write_default_inputs
            || color.as_ref().is_some_and(|c| !ctx.is_default(color_input, c))
            || alpha.as_ref().is_some_and(|a| !ctx.is_default(alpha_input, a));
        if !differs {
            return;
        }

        let rgb = color.and_then(|c| c.as_color3()).unwrap_or([1.0; 3]);
        let a = alpha.and_then(|a| a.as_float()).unwrap_or(1.0);
        pbr.insert("baseColorFactor".into(), json!([rgb[0], rgb[1], rgb[2], a]));
    }

    /// Write a float input as a texture reference or a constant.
    ///
    /// Constants matching the definition default are skipped unless default
    /// inputs are requested.
    pub(super) fn write_float_input(
        &mut self,
        ctx: ShaderContext,
        tables: &mut GltfTables,
        input: &str,
        texture_key: Option<&str>,
        value_key: &str,
        target: &mut Map<String, JsonValue>,
    ) {
        if let Some(texture_key) = texture_key {
            if let Some((image, file)) = ctx.image_source(input) {
                let info = self.write_texture_info(ctx.doc, tables, image, &file);
                target.insert(texture_key.into(), JsonValue::Object(info));
                return;
            }
        }

        let Some(value) = ctx.value(input) else {
            return;
        };
        if !self.options.write_default_inputs && ctx.is_default(input, &value) {
            return;
        }
        if let Some(value) = value.as_float() {
            target.insert(value_key.into(), JsonValue::from(value));
        }
    }

    /// Write a color3 input as a texture reference (with unit factor) or a
    /// constant color.
    pub(super) fn write_color3_input(
        &mut self,
        ctx: ShaderContext,
        tables: &mut GltfTables,
        input: &str,
        texture_key: Option<&str>,
        value_key: &str,
        target: &mut Map<String, JsonValue>,
    ) {
        if let Some(texture_key) = texture_key {
            if let Some((image, file)) = ctx.image_source(input) {
                let info = self.write_texture_info(ctx.doc, tables, image, &file);
                target.insert(texture_key.into(), JsonValue::Object(info));
                target.insert(value_key.into(), json!([1.0, 1.0, 1.0]));
                return;
            }
        }

        let Some(value) = ctx.value(input) else {
            return;
        };
        if !self.options.write_default_inputs && ctx.is_default(input, &value) {
            return;
        }
        if let Some(color) = value.as_color3() {
            target.insert(value_key.into(), json!(color));
        }
    }

    /// Add texture, image and sampler entries for an image node and return
    /// the texture info object referencing them.
    pub(super) fn write_texture_info(
        &mut self,
        doc: &Document,
        tables: &mut GltfTables,
        image: NodeRef,
        file: &str,
    ) -> Map<String, JsonValue> {
        let index = tables.add_texture(&image.name_path(), file);
        let mut info = Map::new();
        info.insert("index".into(), JsonValue::from(index));
        self.write_image_properties(doc, tables, image, index, Some(&mut info));
        info
    }

    /// Write UV set, texture transform and sampler settings of an image node.
    ///
    /// The sampler goes on texture `texture`, the rest on `info` when given.
    pub(super) fn write_image_properties(
        &mut self,
        doc: &Document,
        tables: &mut GltfTables,
        image: NodeRef,
        texture: usize,
        info: Option<&mut Map<String, JsonValue>>,
    ) {
        let node = image.node;

        if let Some(info) = info {
            let uv_index = doc
                .connected_node_of(image, "texcoord")
                .and_then(|texcoord| texcoord.node.input_value("index"))
                .and_then(|v| v.as_integer())
                .filter(|index| *index != 0);
            if let Some(uv_index) = uv_index {
                info.insert("texCoord".into(), JsonValue::from(uv_index));
            }

            let explicit = |name: &str| node.input(name).and_then(Element::value);
            let offset = explicit("offset").map(|v| v.as_floats());
            let rotate = explicit("rotate").and_then(|v| v.as_float());
            let scale = explicit("scale").map(|v| v.as_floats());

            if offset.is_some() || rotate.is_some() || scale.is_some() {
                let mut transform = Map::new();
                if let Some(offset) = offset.filter(|o| o.len() >= 2) {
                    transform.insert("offset".into(), json!([offset[0], offset[1]]));
                }
                if let Some(rotate) = rotate {
                    // Degrees in MaterialX, radians in glTF
                    transform.insert("rotation".into(), JsonValue::from(rotate * TO_RADIAN));
                }
                if let Some(scale) = scale.filter(|s| s.len() >= 2) {
                    transform.insert("scale".into(), json!([scale[0], scale[1]]));
                }
                if let Some(uv_index) = uv_index {
                    transform.insert("texCoord".into(), JsonValue::from(uv_index));
                }
                json_object_entry(info, "extensions")
                    .insert(KHR_TEXTURE_TRANSFORM.into(), JsonValue::Object(transform));
                tables.use_extension(KHR_TEXTURE_TRANSFORM);
            }
        }

        // Explicit inputs, else the image definition defaults
        let string_input = |name: &str| match node.input(name) {
            Some(input) => input
                .value_string()
                .filter(|s| !s.is_empty())
                .map(String::from),
            None => node
                .default_input_value(name)
                .and_then(|v| v.as_str().map(String::from)),
        };
        let uaddress = string_input("uaddressmode");
        let vaddress = string_input("vaddressmode");
        let filter = string_input("filtertype");

        let mut sampler = Map::new();
        sampler.insert("wrapS".into(), JsonValue::from(wrap_code(uaddress.as_deref())));
        sampler.insert("wrapT".into(), JsonValue::from(wrap_code(vaddress.as_deref())));
        if let Some(min_filter) = filter.as_deref().and_then(min_filter_code) {
            // Only one filter type exists so magnification is fixed
            sampler.insert("magFilter".into(), JsonValue::from(9729));
            sampler.insert("minFilter".into(), JsonValue::from(min_filter));
        }
        let sampler_index = tables.sampler_index(JsonValue::Object(sampler));
        if let Some(JsonValue::Object(texture)) = tables.textures.get_mut(texture) {
            texture.insert("sampler".into(), JsonValue::from(sampler_index));
        }
    }
}

/// Names of all materials in a glTF JSON object, by index.
pub(super) fn material_names(gltf: &Map<String, JsonValue>) -> Vec<Option<String>> {
    gltf.get("materials")
        .and_then(JsonValue::as_array)
        .map(|materials| {
            materials
                .iter()
                .map(|m| m.get("name").and_then(JsonValue::as_str).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Make sure `extensionsUsed` lists `name`.
pub(super) fn register_extension(gltf: &mut Map<String, JsonValue>, name: &str) {
    let used = json_array_entry(gltf, "extensionsUsed");
    if !used.iter().any(|e| e.as_str() == Some(name)) {
        used.push(JsonValue::from(name));
    }
}
