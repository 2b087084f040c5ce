//! MaterialX (.mtlx) document module.
//!
//! MaterialX is an open standard for representing materials and looks in computer graphics.
//! This module provides a generic element tree for MaterialX documents together with XML
//! reading and writing, the node definitions needed for glTF conversion, and connection
//! resolution between nodes, node graphs and materials.
//!
//! # Example
//!
//! ```ignore
//! use materialxgltf::mtlx::parse_mtlx_file;
//! use std::path::Path;
//!
//! let doc = parse_mtlx_file(Path::new("material.mtlx"))?;
//!
//! for material in doc.material_nodes() {
//!     println!("Material: {}", material.name);
//!     for shader in doc.shader_nodes(material) {
//!         if let Some(image) = doc.connected_node_of(shader, "base_color") {
//!             println!("  Base color texture: {:?}", doc.image_file(image));
//!         }
//!     }
//! }
//! ```

pub mod library;
mod parser;
mod types;
mod validate;
mod value;
mod writer;

pub use parser::{parse_mtlx, parse_mtlx_file};
pub use types::*;
pub use value::{format_float, format_floats, Value};
