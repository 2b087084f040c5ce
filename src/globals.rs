//! Names and strings shared by both conversion directions.

/// Radians to degrees.
pub const TO_DEGREE: f64 = 180.0 / 3.1415926535;
/// Degrees to radians.
pub const TO_RADIAN: f64 = 3.1415926535 / 180.0;

pub const MTLX_DEFAULT_MATERIAL_NAME: &str = "MAT_0";
pub const MTLX_MATERIAL_PREFIX: &str = "MAT_";
pub const MTLX_DEFAULT_SHADER_NAME: &str = "SHD_0";
pub const MTLX_SHADER_PREFIX: &str = "SHD_";

pub const GLTF_DEFAULT_NODE_PREFIX: &str = "NODE_";
pub const GLTF_DEFAULT_MESH_PREFIX: &str = "MESH_";
/// Primitives are unnamed, so the index is used when a mesh has several.
pub const GLTF_DEFAULT_PRIMITIVE_PREFIX: &str = "PRIMITIVE_";

pub const MTLX_GLTF_PBR_CATEGORY: &str = "gltf_pbr";
pub const MTLX_UNLIT_CATEGORY: &str = "surface_unlit";
pub const MTLX_STANDARD_SURFACE_CATEGORY: &str = "standard_surface";
pub const MTLX_SURFACE_MATERIAL_CATEGORY: &str = "surfacematerial";
pub const MTLX_GLTF_IMAGE: &str = "gltf_image";
pub const MTLX_GLTF_COLOR_IMAGE: &str = "gltf_colorimage";
pub const MTLX_GLTF_NORMALMAP_IMAGE: &str = "gltf_normalmap";
pub const MTLX_GLTF_IRIDESCENCE_THICKNESS: &str = "gltf_iridescence_thickness";
pub const MTLX_DEFAULT_COLORSPACE: &str = "srgb_texture";

pub const MULTI_OUTPUT_TYPE: &str = "multioutput";
pub const SURFACE_SHADER_TYPE: &str = "surfaceshader";
pub const MATERIAL_TYPE: &str = "material";
pub const FILENAME_TYPE: &str = "filename";
pub const MTLX_VEC3_TYPE: &str = "vector3";

pub const MTLX_INTERFACE_NAME_ATTRIBUTE: &str = "interfacename";
pub const MTLX_NODE_NAME_ATTRIBUTE: &str = "nodename";
pub const MTLX_NODEGRAPH_ATTRIBUTE: &str = "nodegraph";
pub const MTLX_OUTPUT_ATTRIBUTE: &str = "output";
pub const MTLX_COLOR_SPACE_ATTRIBUTE: &str = "colorspace";
pub const MTLX_VALUE_ATTRIBUTE: &str = "value";
pub const MTLX_TYPE_ATTRIBUTE: &str = "type";
pub const MTLX_NODEDEF_ATTRIBUTE: &str = "nodedef";
pub const MTLX_FILE_PREFIX_ATTRIBUTE: &str = "fileprefix";

/// Separates category and name of an element key in the JSON hierarchy.
pub const JSON_CATEGORY_NAME_SEPARATOR: &str = ":";
/// Root key of the JSON hierarchy.
pub const MATERIALX_DOCUMENT_ROOT: &str = "materialx";
