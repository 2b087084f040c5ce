//! `materialxgltf` converts materials between glTF 2.0 and MaterialX.
//!
//! # Modules
//!
//! - `mtlx` - MaterialX document model, XML reading and writing
//! - `gltf2mtlx` - glTF materials to MaterialX `gltf_pbr` shaders
//! - `mtlx2gltf` - MaterialX `gltf_pbr` shaders to glTF materials, GLB packaging
//! - `util` - search paths, glTF loading and conversion logs
//! - `batch` - parallel conversion of file sets for the command line tools

pub mod batch;
pub mod globals;
pub mod gltf2mtlx;
pub mod mtlx;
pub mod mtlx2gltf;
pub mod util;
