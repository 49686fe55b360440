//! Tensors exchanged with the inference engine.

use ndarray::{ArrayD, IxDyn};

use crate::error::{BridgeError, Result};

/// Number of elements in `shape`, or `None` if it overflows `usize`.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1_usize, |acc, &d| acc.checked_mul(d))
}

/// Fixed-shape, contiguous f32 input for one forward pass.
///
/// Owned by the call that builds it and consumed by the engine.
#[derive(Debug, Clone)]
pub struct InputTensor {
    data: ArrayD<f32>,
}

impl InputTensor {
    /// Build a tensor of the given shape from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidInput`] if the buffer length does not
    /// match the product of `shape`.
    pub fn new(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        let expected = element_count(shape).ok_or_else(|| {
            BridgeError::invalid_input(format!("Input shape {:?} is too large", shape))
        })?;
        if values.len() != expected {
            return Err(BridgeError::invalid_input(format!(
                "Input size {} does not match shape {:?} ({} values)",
                values.len(),
                shape,
                expected
            )));
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| BridgeError::invalid_input(format!("Array shape error: {}", e)))?;
        Ok(Self { data })
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Get the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the underlying array.
    pub fn as_array(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Split into an engine-style `i64` shape and the flat buffer.
    pub fn into_parts(self) -> (Vec<i64>, Vec<f32>) {
        let shape = self.data.shape().iter().map(|&s| s as i64).collect();
        let (values, _) = self.data.into_raw_vec_and_offset();
        (shape, values)
    }
}

/// Borrowed view of one float output held by an engine result set.
#[derive(Debug, Clone, Copy)]
pub struct OutputView<'a> {
    /// Shape reported by the engine, if any.
    pub shape: Option<&'a [i64]>,
    /// Backing buffer as exposed by the engine.
    pub data: &'a [f32],
}

impl<'a> OutputView<'a> {
    /// Create a view with known shape.
    pub fn new(shape: &'a [i64], data: &'a [f32]) -> Self {
        Self {
            shape: Some(shape),
            data,
        }
    }

    /// Create a view whose shape the engine did not report.
    pub fn without_shape(data: &'a [f32]) -> Self {
        Self { shape: None, data }
    }

    /// Shape as `usize` dimensions, or `None` if missing or symbolic.
    pub fn dims(&self) -> Option<Vec<usize>> {
        self.shape?
            .iter()
            .map(|&d| usize::try_from(d).ok())
            .collect()
    }

    /// Number of values available in the backing buffer.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Copy the declared number of values out of the engine buffer.
    ///
    /// The element count comes from the reported shape; `fallback_shape` is
    /// used only when no usable shape is available.
    pub fn to_tensor_data(&self, fallback_shape: &[usize]) -> Result<TensorData> {
        let shape = self.dims().unwrap_or_else(|| fallback_shape.to_vec());
        let expected = element_count(&shape).ok_or_else(|| {
            BridgeError::inference(format!("Output shape {:?} is too large", shape))
        })?;

        if self.capacity() < expected {
            return Err(BridgeError::OutputTooSmall {
                capacity: self.capacity(),
                expected,
            });
        }

        let values = self.data[..expected].to_vec();
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| BridgeError::inference(format!("Array shape error: {}", e)))?;
        Ok(TensorData { data })
    }
}

/// Tensor data extracted from an inference result.
#[derive(Debug, Clone)]
pub struct TensorData {
    /// The tensor data as a dynamic-dimensional array.
    pub data: ArrayD<f32>,
}

impl TensorData {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Get the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Get the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flatten into a row-major value sequence.
    pub fn into_values(self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}
