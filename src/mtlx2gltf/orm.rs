//! Occlusion, roughness and metallic texture export.
//!
//! glTF packs roughness into the green and metallic into the blue channel of
//! one `metallicRoughnessTexture`. MaterialX graphs usually read each from
//! a channel of the same image through `extract` nodes, in which case the
//! image is referenced as is. Separate metallic and roughness images are
//! merged into a new image.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};

use crate::mtlx::NodeRef;

use super::material::{GltfTables, ShaderContext};
use super::MtlxToGltfWriter;

const EXTRACT_CATEGORY: &str = "extract";

/// The image feeding one of the packed channels.
struct ChannelSource<'a> {
    image: NodeRef<'a>,
    /// File found through the search path
    path: PathBuf,
}

impl MtlxToGltfWriter {
    fn channel_source<'a>(&self, ctx: ShaderContext<'a>, input: &str) -> Option<ChannelSource<'a>> {
        let mut node = ctx.doc.connected_node_of(ctx.shader, input)?;
        if node.category() == EXTRACT_CATEGORY {
            node = ctx.doc.connected_node_of(node, "in")?;
        }
        let file = ctx.doc.image_file(node)?;
        Some(ChannelSource {
            image: node,
            path: self.options.search_path.find(&file),
        })
    }

    /// Constant factor of `input`, `None` when connected or a skipped default.
    fn orm_factor(&self, ctx: ShaderContext, input: &str) -> Option<f64> {
        let value = match ctx.shader.node.input(input) {
            Some(input) => input.value()?,
            None if self.options.write_default_inputs => ctx.shader.node.default_input_value(input)?,
            None => return None,
        };
        if !self.options.write_default_inputs && ctx.shader.node.default_input_value(input).as_ref() == Some(&value) {
            return None;
        }
        value.as_float()
    }

    /// Write metallic and roughness factors and the packed textures.
    pub(super) fn write_orm(
        &mut self,
        ctx: ShaderContext,
        tables: &mut GltfTables,
        pbr: &mut Map<String, JsonValue>,
        material: &mut Map<String, JsonValue>,
    ) {
        let mut metallic_factor = self.orm_factor(ctx, "metallic");
        let mut roughness_factor = self.orm_factor(ctx, "roughness");

        let metallic = self.channel_source(ctx, "metallic");
        let roughness = self.channel_source(ctx, "roughness");
        let occlusion = self.channel_source(ctx, "occlusion");
        let path_of = |source: &Option<ChannelSource>| source.as_ref().map(|s| s.path.clone());
        let mut occlusion_shared = false;

        if path_of(&metallic) == path_of(&roughness) {
            if let Some(source) = &metallic {
                let file = source.path.to_string_lossy().into_owned();
                let shared = path_of(&occlusion) == path_of(&metallic);
                occlusion_shared = shared;
                if shared {
                    self.log.log(format!("- Append single ORM texture: {}", file));
                } else {
                    self.log
                        .log(format!("- Append single metallic-roughness texture: {}", file));
                }
                let info = self.write_texture_info(ctx.doc, tables, source.image, &file);
                if shared {
                    // Occlusion reads the red channel of the same texture
                    let mut occlusion_info = Map::new();
                    occlusion_info.insert("index".into(), info["index"].clone());
                    material.insert("occlusionTexture".into(), JsonValue::Object(occlusion_info));
                }
                pbr.insert("metallicRoughnessTexture".into(), JsonValue::Object(info));
            }
        } else if let Some(merge_source) = metallic.as_ref().or(roughness.as_ref()) {
            let output = combined_path(&merge_source.path);
            let merged = merge_metallic_roughness(
                metallic.as_ref().map(|m| m.path.as_path()),
                roughness.as_ref().map(|r| r.path.as_path()),
                metallic_factor.unwrap_or(1.0),
                roughness_factor.unwrap_or(1.0),
                &output,
            );
            match merged {
                Ok(used) => {
                    if used.metallic {
                        metallic_factor = Some(1.0);
                    }
                    if used.roughness {
                        roughness_factor = Some(1.0);
                    }
                    let uri = output
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    self.log
                        .log(format!("- Merged metallic-roughness to single texture: {}", uri));
                    let info = self.write_texture_info(ctx.doc, tables, merge_source.image, &uri);
                    pbr.insert("metallicRoughnessTexture".into(), JsonValue::Object(info));
                }
                Err(err) => self
                    .log
                    .warn(format!("- Failed to merge metallic-roughness images: {:#}", err)),
            }
        }

        if let Some(source) = occlusion.filter(|_| !occlusion_shared) {
            let file = source.path.to_string_lossy().into_owned();
            self.log.log(format!("- Append single occlusion texture: {}", file));
            let info = self.write_texture_info(ctx.doc, tables, source.image, &file);
            material.insert("occlusionTexture".into(), JsonValue::Object(info));
        }

        if let Some(factor) = metallic_factor {
            pbr.insert("metallicFactor".into(), JsonValue::from(factor));
        }
        if let Some(factor) = roughness_factor {
            pbr.insert("roughnessFactor".into(), JsonValue::from(factor));
        }
    }
}

/// `<dir>/<stem>_combined.png` next to `path`.
fn combined_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}_combined.png", stem))
}

/// Which channels of a merged image came from images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MergedChannels {
    metallic: bool,
    roughness: bool,
}

fn load_red_channel(path: Option<&Path>) -> Option<RgbImage> {
    let path = path?;
    match image::open(path) {
        Ok(img) => Some(img.to_rgb8()),
        Err(err) => {
            log::warn!("Failed to load image {}: {}", path.display(), err);
            None
        }
    }
}

fn sample_red(img: &RgbImage, x: u32, y: u32, width: u32, height: u32) -> u8 {
    let sx = (x as u64 * img.width() as u64 / width as u64) as u32;
    let sy = (y as u64 * img.height() as u64 / height as u64) as u32;
    img.get_pixel(sx.min(img.width() - 1), sy.min(img.height() - 1))[0]
}

fn unit_to_byte(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Merge roughness (green) and metallic (blue) images into an RGB image.
///
/// The output has the largest extent of the inputs. Channels without an
/// image are filled with the given uniform factor.
fn merge_metallic_roughness(
    metallic: Option<&Path>,
    roughness: Option<&Path>,
    metallic_factor: f64,
    roughness_factor: f64,
    output: &Path,
) -> Result<MergedChannels> {
    let metallic = load_red_channel(metallic);
    let roughness = load_red_channel(roughness);

    let (width, height) = [&metallic, &roughness]
        .into_iter()
        .flatten()
        .fold((0, 0), |(w, h), img| (w.max(img.width()), h.max(img.height())));
    if width == 0 || height == 0 {
        anyhow::bail!("No metallic or roughness image could be loaded");
    }

    let uniform_metallic = unit_to_byte(metallic_factor);
    let uniform_roughness = unit_to_byte(roughness_factor);
    let merged = RgbImage::from_fn(width, height, |x, y| {
        let g = roughness
            .as_ref()
            .map_or(uniform_roughness, |img| sample_red(img, x, y, width, height));
        let b = metallic
            .as_ref()
            .map_or(uniform_metallic, |img| sample_red(img, x, y, width, height));
        Rgb([0, g, b])
    });
    merged
        .save(output)
        .with_context(|| format!("Failed to save merged image: {}", output.display()))?;

    Ok(MergedChannels {
        metallic: metallic.is_some(),
        roughness: roughness.is_some(),
    })
}
