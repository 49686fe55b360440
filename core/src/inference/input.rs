//! Numeric input buffers arriving through the untyped call boundary.

use serde_json::Value;

use crate::error::{BridgeError, Result};

/// The element representations a caller may deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum InputBuffer {
    /// Integral sequence.
    Int(Vec<i64>),
    /// Double-precision sequence.
    Double(Vec<f64>),
    /// Single-precision sequence.
    Float(Vec<f32>),
}

impl InputBuffer {
    /// Number of elements in the buffer.
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the representation, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Float(_) => "float",
        }
    }

    /// Convert to a flat f32 buffer, preserving order.
    pub fn into_f32(self) -> Vec<f32> {
        match self {
            Self::Int(v) => v.into_iter().map(|x| x as f32).collect(),
            Self::Double(v) => v.into_iter().map(|x| x as f32).collect(),
            Self::Float(v) => v,
        }
    }

    /// Interpret a JSON value as a numeric sequence.
    ///
    /// An array of integers becomes [`InputBuffer::Int`]; an array containing
    /// any non-integral number becomes [`InputBuffer::Double`]. Anything else
    /// is rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = match value {
            Value::Null => return Err(BridgeError::invalid_input("Input is null")),
            Value::Array(items) => items,
            other => {
                return Err(BridgeError::invalid_input(format!(
                    "Unsupported input type: {}",
                    json_type_name(other)
                )))
            }
        };

        let mut ints = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match item.as_i64() {
                Some(x) => ints.push(x),
                None if item.is_number() => return Self::doubles_from_json(items),
                None => {
                    return Err(BridgeError::invalid_input(format!(
                        "Element {} is not a number ({})",
                        idx,
                        json_type_name(item)
                    )))
                }
            }
        }
        Ok(Self::Int(ints))
    }

    fn doubles_from_json(items: &[Value]) -> Result<Self> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                item.as_f64().ok_or_else(|| {
                    BridgeError::invalid_input(format!(
                        "Element {} is not a number ({})",
                        idx,
                        json_type_name(item)
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::Double)
    }
}

impl From<Vec<i64>> for InputBuffer {
    fn from(v: Vec<i64>) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<f64>> for InputBuffer {
    fn from(v: Vec<f64>) -> Self {
        Self::Double(v)
    }
}

impl From<Vec<f32>> for InputBuffer {
    fn from(v: Vec<f32>) -> Self {
        Self::Float(v)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
