//! Shared I/O helpers: file search paths, glTF loading and conversion logs.

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};

/// Binary glTF magic bytes.
pub const GLB_MAGIC: &[u8; 4] = b"glTF";

/// An ordered list of directories used to resolve relative file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSearchPath {
    paths: Vec<PathBuf>,
}

impl FileSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory to search.
    pub fn append(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Resolve a file name.
    ///
    /// Empty and absolute names are returned unchanged, as are names that
    /// exist relative to the working directory. Otherwise the first search
    /// directory containing the file wins. Unresolved names are returned as
    /// given.
    pub fn find(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(file);
        if file.is_empty() || path.is_absolute() || path.exists() {
            return path;
        }
        self.paths
            .iter()
            .map(|dir| dir.join(&path))
            .find(|candidate| candidate.exists())
            .unwrap_or(path)
    }
}

/// Format a path with forward slashes.
pub fn posix_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Load glTF JSON from a `.gltf` file or the JSON chunk of a `.glb` file.
pub fn load_gltf_json(path: &Path) -> Result<JsonValue> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read glTF file: {}", path.display()))?;
    parse_gltf_json(&bytes).with_context(|| format!("Failed to parse glTF file: {}", path.display()))
}

/// Parse glTF JSON from text or binary glTF bytes.
pub fn parse_gltf_json(bytes: &[u8]) -> Result<JsonValue> {
    if bytes.starts_with(GLB_MAGIC) {
        let glb = gltf::Glb::from_slice(bytes).context("Invalid GLB container")?;
        return serde_json::from_slice(&glb.json).context("Invalid JSON chunk in GLB container");
    }
    serde_json::from_slice(bytes).context("Invalid glTF JSON")
}

/// Array member of a JSON object, empty when missing.
pub fn json_array<'a>(json: &'a JsonValue, key: &str) -> &'a [JsonValue] {
    json.get(key)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Mutable object member, created when missing or not an object.
pub fn json_object_entry<'a>(obj: &'a mut Map<String, JsonValue>, key: &str) -> &'a mut Map<String, JsonValue> {
    let entry = obj
        .entry(key.to_string())
        .or_insert_with(|| JsonValue::Object(Map::new()));
    if !entry.is_object() {
        *entry = JsonValue::Object(Map::new());
    }
    match entry {
        JsonValue::Object(map) => map,
        _ => unreachable!("entry was just made an object"),
    }
}

/// Mutable array member, created when missing or not an array.
pub fn json_array_entry<'a>(obj: &'a mut Map<String, JsonValue>, key: &str) -> &'a mut Vec<JsonValue> {
    let entry = obj
        .entry(key.to_string())
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if !entry.is_array() {
        *entry = JsonValue::Array(Vec::new());
    }
    match entry {
        JsonValue::Array(items) => items,
        _ => unreachable!("entry was just made an array"),
    }
}

/// Accumulated conversion messages.
///
/// Every message is also forwarded to the `log` facade: at info level when
/// `verbose`, debug level otherwise.
#[derive(Debug, Clone, Default)]
pub struct ConversionLog {
    messages: Vec<String>,
    verbose: bool,
}

impl ConversionLog {
    pub fn new(verbose: bool) -> Self {
        Self {
            messages: Vec::new(),
            verbose,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Record a message.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.verbose {
            log::info!("{}", message);
        } else {
            log::debug!("{}", message);
        }
        self.messages.push(message);
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// All messages joined by newlines.
    pub fn text(&self) -> String {
        let mut text = self.messages.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_find() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wood.png"), b"x").unwrap();

        let mut search = FileSearchPath::new();
        search.append(dir.path());

        assert_eq!(search.find("wood.png"), dir.path().join("wood.png"));
        assert_eq!(search.find("missing.png"), PathBuf::from("missing.png"));
        assert_eq!(search.find(""), PathBuf::new());
    }

    #[test]
    fn test_parse_gltf_json_text() {
        let json = parse_gltf_json(br#"{"asset": {"version": "2.0"}}"#).unwrap();
        assert_eq!(json["asset"]["version"], "2.0");
        assert!(parse_gltf_json(b"not json").is_err());
    }

    #[test]
    fn test_json_entries() {
        let mut obj = Map::new();
        json_array_entry(&mut obj, "images").push(JsonValue::from(1));
        json_object_entry(&mut obj, "extensions").insert("a".into(), JsonValue::Null);
        assert_eq!(obj["images"], serde_json::json!([1]));
        assert!(obj["extensions"]["a"].is_null());
    }

    #[test]
    fn test_conversion_log() {
        let mut log = ConversionLog::new(false);
        log.log("first");
        log.warn("second");
        assert_eq!(log.text(), "first\nsecond\n");
        log.clear();
        assert!(log.messages().is_empty());
    }
}
