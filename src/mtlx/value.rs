//! Typed MaterialX values.
//!
//! MaterialX stores every value as a string attribute alongside a type name.
//! These helpers convert between the two representations and JSON.

use serde_json::Value as JsonValue;

/// A typed MaterialX value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Float(f64),
    /// RGB color
    Color3([f64; 3]),
    /// RGBA color
    Color4([f64; 4]),
    Vector2([f64; 2]),
    Vector3([f64; 3]),
    Vector4([f64; 4]),
    /// Matrices and float arrays
    FloatArray(Vec<f64>),
    /// `string`, `filename` and any type without a numeric form
    String(String),
}

impl Value {
    /// Parse a value string based on its type name.
    pub fn parse(value_str: &str, value_type: &str) -> Option<Value> {
        match value_type {
            "integer" => value_str.trim().parse().ok().map(Value::Integer),
            "boolean" => match value_str.trim() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            "float" => value_str.trim().parse().ok().map(Value::Float),
            "color3" => parse_floats::<3>(value_str).map(Value::Color3),
            "color4" => parse_floats::<4>(value_str).map(Value::Color4),
            "vector2" => parse_floats::<2>(value_str).map(Value::Vector2),
            "vector3" => parse_floats::<3>(value_str).map(Value::Vector3),
            "vector4" => parse_floats::<4>(value_str).map(Value::Vector4),
            "matrix33" | "matrix44" | "floatarray" => {
                let parts = split_floats(value_str)?;
                Some(Value::FloatArray(parts))
            }
            _ => Some(Value::String(value_str.to_string())),
        }
    }

    /// Format the value as a MaterialX value string.
    pub fn to_value_string(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Color3(c) => format_floats(c),
            Value::Color4(c) => format_floats(c),
            Value::Vector2(v) => format_floats(v),
            Value::Vector3(v) => format_floats(v),
            Value::Vector4(v) => format_floats(v),
            Value::FloatArray(v) => format_floats(v),
            Value::String(s) => s.clone(),
        }
    }

    /// The MaterialX type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Float(_) => "float",
            Value::Color3(_) => "color3",
            Value::Color4(_) => "color4",
            Value::Vector2(_) => "vector2",
            Value::Vector3(_) => "vector3",
            Value::Vector4(_) => "vector4",
            Value::FloatArray(_) => "floatarray",
            Value::String(_) => "string",
        }
    }

    /// Convert to float, returning the first component for vectors.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Boolean(_) | Value::String(_) => None,
            other => other.as_floats().first().copied(),
        }
    }

    /// Integer view of the value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Component view of the value.
    pub fn as_floats(&self) -> Vec<f64> {
        match self {
            Value::Integer(i) => vec![*i as f64],
            Value::Float(f) => vec![*f],
            Value::Color3(c) => c.to_vec(),
            Value::Color4(c) => c.to_vec(),
            Value::Vector2(v) => v.to_vec(),
            Value::Vector3(v) => v.to_vec(),
            Value::Vector4(v) => v.to_vec(),
            Value::FloatArray(v) => v.clone(),
            Value::Boolean(_) | Value::String(_) => Vec::new(),
        }
    }

    /// Convert to Color3, expanding a float to grayscale.
    pub fn as_color3(&self) -> Option<[f64; 3]> {
        match self {
            Value::Float(f) => Some([*f, *f, *f]),
            Value::Color3(c) | Value::Vector3(c) => Some(*c),
            Value::Color4(c) | Value::Vector4(c) => Some([c[0], c[1], c[2]]),
            _ => None,
        }
    }

    /// Text view for string-typed values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form: numbers for scalars, arrays for vectors, strings otherwise.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Integer(i) => JsonValue::from(*i),
            Value::Boolean(b) => JsonValue::from(*b),
            Value::Float(f) => JsonValue::from(*f),
            Value::String(s) => JsonValue::from(s.as_str()),
            other => JsonValue::from(other.as_floats()),
        }
    }
}

/// Format a float the way MaterialX writes it: shortest form, no trailing `.0`.
pub fn format_float(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Format a list of floats separated by `, `.
pub fn format_floats(values: &[f64]) -> String {
    values.iter().map(|v| format_float(*v)).collect::<Vec<_>>().join(", ")
}

fn split_floats(value_str: &str) -> Option<Vec<f64>> {
    value_str
        .split(',')
        .map(|s| s.trim().parse::<f64>().ok())
        .collect()
}

fn parse_floats<const N: usize>(value_str: &str) -> Option<[f64; N]> {
    let parts = split_floats(value_str)?;
    if parts.len() < N {
        return None;
    }
    let mut arr = [0.0; N];
    arr.copy_from_slice(&parts[..N]);
    Some(arr)
}
