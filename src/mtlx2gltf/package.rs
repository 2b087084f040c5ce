//! Binary glTF packaging.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Value as JsonValue};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::util::{json_array_entry, GLB_MAGIC};

use super::MtlxToGltfWriter;

const DATA_URI_PREFIX: &str = "data:";

/// Resources embedded by [`MtlxToGltfWriter::package_glb`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageReport {
    /// Image URIs converted to data URIs
    pub images: Vec<String>,
    /// Buffer URIs merged into the binary chunk
    pub buffers: Vec<String>,
}

fn mime_type(uri: &str) -> &'static str {
    let extension = Path::new(uri)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ktx2" => "image/ktx2",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (_, data) = uri
        .split_once(";base64,")
        .with_context(|| format!("Unsupported data URI: {:.40}", uri))?;
    STANDARD.decode(data).context("Invalid base64 data URI")
}

fn align_to_four(bytes: &mut Vec<u8>) {
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
}

impl MtlxToGltfWriter {
    fn resolve_resource(&self, uri: &str, base_dir: &Path) -> PathBuf {
        let found = self.options.search_path.find(uri);
        if found.exists() {
            found
        } else {
            base_dir.join(uri)
        }
    }

    /// Package a `.gltf` file with its images and buffers into a `.glb` file.
    ///
    /// Images become base64 data URIs in the JSON chunk. Buffers are merged
    /// into the binary chunk and buffer views re-targeted to it.
    pub fn package_glb(&mut self, gltf_path: &Path, glb_path: &Path) -> Result<PackageReport> {
        let bytes =
            std::fs::read(gltf_path).with_context(|| format!("Failed to read glTF file: {}", gltf_path.display()))?;
        let (json, glb_bin) = if bytes.starts_with(GLB_MAGIC) {
            let glb = gltf::Glb::from_slice(&bytes).context("Invalid GLB container")?;
            let json: JsonValue = serde_json::from_slice(&glb.json).context("Invalid JSON chunk in GLB container")?;
            (json, glb.bin.map(Cow::into_owned))
        } else {
            let json: JsonValue = serde_json::from_slice(&bytes).context("Invalid glTF JSON")?;
            (json, None)
        };
        let JsonValue::Object(mut gltf) = json else {
            anyhow::bail!("glTF file is not a JSON object: {}", gltf_path.display());
        };
        let base_dir = gltf_path.parent().unwrap_or(Path::new("")).to_path_buf();

        let mut report = PackageReport::default();
        self.embed_images(&mut gltf, &base_dir, &mut report);
        let bin = self.merge_buffers(&mut gltf, &base_dir, glb_bin, &mut report)?;

        let json = serde_json::to_vec(&JsonValue::Object(gltf)).context("Failed to serialize glTF JSON")?;
        let glb = gltf::Glb {
            header: gltf::binary::Header {
                magic: *GLB_MAGIC,
                version: 2,
                // Computed when writing
                length: 0,
            },
            json: Cow::Owned(json),
            bin: bin.map(Cow::Owned),
        };
        let data = glb.to_vec().context("Failed to encode GLB")?;
        std::fs::write(glb_path, data).with_context(|| format!("Failed to write GLB file: {}", glb_path.display()))?;

        self.log.log(format!(
            "- Packaged {} images and {} buffers into: {}",
            report.images.len(),
            report.buffers.len(),
            glb_path.display()
        ));
        Ok(report)
    }

    fn embed_images(&mut self, gltf: &mut Map<String, JsonValue>, base_dir: &Path, report: &mut PackageReport) {
        let Some(images) = gltf.get_mut("images").and_then(JsonValue::as_array_mut) else {
            return;
        };
        for image in images.iter_mut().filter_map(JsonValue::as_object_mut) {
            let Some(uri) = image.get("uri").and_then(JsonValue::as_str).map(String::from) else {
                continue;
            };
            if uri.starts_with(DATA_URI_PREFIX) {
                continue;
            }
            let path = self.resolve_resource(&uri, base_dir);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let data_uri = format!("data:{};base64,{}", mime_type(&uri), STANDARD.encode(bytes));
                    image.insert("uri".into(), JsonValue::from(data_uri));
                    self.log.log(format!("- Embedded image: {}", uri));
                    report.images.push(uri);
                }
                Err(err) => self
                    .log
                    .warn(format!("- Failed to embed image {}: {}", path.display(), err)),
            }
        }
    }

    /// Merge every buffer into one binary blob.
    fn merge_buffers(
        &mut self,
        gltf: &mut Map<String, JsonValue>,
        base_dir: &Path,
        glb_bin: Option<Vec<u8>>,
        report: &mut PackageReport,
    ) -> Result<Option<Vec<u8>>> {
        let buffers = match gltf.remove("buffers") {
            Some(JsonValue::Array(buffers)) if !buffers.is_empty() => buffers,
            _ => return Ok(None),
        };

        let mut glb_bin = glb_bin;
        let mut merged = Vec::new();
        let mut offsets = Vec::with_capacity(buffers.len());
        for buffer in &buffers {
            let data = match buffer.get("uri").and_then(JsonValue::as_str) {
                Some(uri) if uri.starts_with(DATA_URI_PREFIX) => {
                    report.buffers.push(uri.chars().take(32).collect());
                    decode_data_uri(uri)?
                }
                Some(uri) => {
                    let path = self.resolve_resource(uri, base_dir);
                    report.buffers.push(uri.to_string());
                    std::fs::read(&path).with_context(|| format!("Failed to read buffer: {}", path.display()))?
                }
                None => glb_bin.take().context("Buffer without URI and no binary chunk")?,
            };
            let length = buffer
                .get("byteLength")
                .and_then(JsonValue::as_u64)
                .map_or(data.len(), |l| l as usize);
            if data.len() < length {
                anyhow::bail!("Buffer data is shorter than its byteLength ({} < {})", data.len(), length);
            }

            offsets.push(merged.len());
            merged.extend_from_slice(&data[..length]);
            align_to_four(&mut merged);
        }

        if let Some(views) = gltf.get_mut("bufferViews").and_then(JsonValue::as_array_mut) {
            for view in views.iter_mut().filter_map(JsonValue::as_object_mut) {
                let buffer = view.get("buffer").and_then(JsonValue::as_u64).unwrap_or(0) as usize;
                let offset = view.get("byteOffset").and_then(JsonValue::as_u64).unwrap_or(0) as usize;
                let base = offsets.get(buffer).copied().unwrap_or(0);
                view.insert("buffer".into(), JsonValue::from(0));
                view.insert("byteOffset".into(), JsonValue::from(offset + base));
            }
        }

        let mut buffer = Map::new();
        buffer.insert("byteLength".into(), JsonValue::from(merged.len()));
        json_array_entry(gltf, "buffers").push(JsonValue::Object(buffer));
        Ok(Some(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::super::MtlxToGltfOptions;
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_package_glb() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tex.png"), b"\x89PNG fake").unwrap();
        std::fs::write(dir.path().join("a.bin"), [1u8, 2, 3, 4, 5, 6]).unwrap();
        let inline = format!("data:application/octet-stream;base64,{}", STANDARD.encode([9u8, 9, 9, 9]));
        let gltf = json!({
            "asset": { "version": "2.0" },
            "images": [{ "uri": "tex.png" }],
            "buffers": [
                { "uri": "a.bin", "byteLength": 6 },
                { "uri": inline, "byteLength": 4 }
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 2, "byteLength": 4 },
                { "buffer": 1, "byteLength": 4 }
            ]
        });
        let gltf_path = dir.path().join("scene.gltf");
        std::fs::write(&gltf_path, serde_json::to_string(&gltf).unwrap()).unwrap();
        let glb_path = dir.path().join("scene.glb");

        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        let report = writer.package_glb(&gltf_path, &glb_path).unwrap();
        assert_eq!(report.images, vec!["tex.png".to_string()]);
        assert_eq!(report.buffers.len(), 2);
        assert_eq!(report.buffers[0], "a.bin");

        let bytes = std::fs::read(&glb_path).unwrap();
        let glb = gltf::Glb::from_slice(&bytes).unwrap();
        let json: JsonValue = serde_json::from_slice(&glb.json).unwrap();
        let bin = glb.bin.unwrap();
        assert_eq!(&bin[..12], &[1, 2, 3, 4, 5, 6, 0, 0, 9, 9, 9, 9]);

        assert_eq!(json["buffers"], json!([{ "byteLength": 12 }]));
        assert_eq!(json["bufferViews"][0]["byteOffset"], 2);
        assert_eq!(json["bufferViews"][1], json!({ "buffer": 0, "byteLength": 4, "byteOffset": 8 }));
        let uri = json["images"][0]["uri"].as_str().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(STANDARD.decode(&uri[22..]).unwrap(), b"\x89PNG fake");
    }

    #[test]
    fn test_missing_buffer_fails() {
        let dir = TempDir::new().unwrap();
        let gltf_path = dir.path().join("scene.gltf");
        std::fs::write(&gltf_path, r#"{ "buffers": [{ "uri": "missing.bin", "byteLength": 4 }] }"#).unwrap();
        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        assert!(writer.package_glb(&gltf_path, &dir.path().join("scene.glb")).is_err());
    }

    #[test]
    fn test_package_without_buffers() {
        let dir = TempDir::new().unwrap();
        let gltf_path = dir.path().join("materials.gltf");
        std::fs::write(&gltf_path, r#"{ "asset": { "version": "2.0" }, "materials": [{ "name": "a" }] }"#).unwrap();
        let glb_path = dir.path().join("materials.glb");

        let mut writer = MtlxToGltfWriter::new(MtlxToGltfOptions::default());
        let report = writer.package_glb(&gltf_path, &glb_path).unwrap();
        assert_eq!(report, PackageReport::default());

        let bytes = std::fs::read(&glb_path).unwrap();
        assert!(bytes.starts_with(b"glTF"));
        let glb = gltf::Glb::from_slice(&bytes).unwrap();
        assert!(glb.bin.is_none());
        assert!(writer.log().contains("Packaged 0 images"));
    }
}
