//! Flat parameter layout for models built from named 2-D tensors.
//!
//! This module provides [`ParamLayout`], a fixed-order bijection between an
//! ordered set of named tensors and one flat parameter vector θ (as
//! `ndarray::Array1<f64>`). Each tensor gets an offset and a shape once, at
//! construction; the layout never changes afterwards, so the ordering the
//! estimator reads is the ordering it writes back.
//!
//! ## What this module defines
//! - [`TensorSlot`]: name, shape `(rows, cols)` and offset of one tensor.
//! - [`ParamLayout`]: the ordered slots, plus zero-copy views into a flat
//!   slice and [`ParamLayout::flatten`] to assemble θ from per-slot tensors.
//!
//! ## Conventions
//! - Tensors are stored row-major inside their slot.
//! - Vectors (biases) are registered as `rows × 1` tensors.
//! - Slots are contiguous and non-overlapping: slot `i + 1` starts where
//!   slot `i` ends, and the total length is the sum of slot sizes.
use std::ops::Range;

use ndarray::{ArrayView2, ArrayViewMut2};

use crate::{
    filter::types::ParamVec,
    network::errors::{ModelError, ModelResult},
};

/// One named tensor inside a [`ParamLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSlot {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub offset: usize,
}

impl TensorSlot {
    /// Number of scalars in the tensor.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// `true` for a zero-sized tensor.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Range of flat indices occupied by the tensor.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// Ordered, contiguous layout of named tensors in a flat parameter vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamLayout {
    slots: Vec<TensorSlot>,
    total: usize,
}

impl ParamLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `rows × cols` tensor and return its slot index.
    ///
    /// # Errors
    /// [`ModelError::DuplicateTensor`] if `name` is already registered.
    pub fn push(&mut self, name: impl Into<String>, rows: usize, cols: usize) -> ModelResult<usize> {
        let name = name.into();
        if self.slots.iter().any(|slot| slot.name == name) {
            return Err(ModelError::DuplicateTensor { name });
        }
        let slot = TensorSlot { name, rows, cols, offset: self.total };
        self.total += slot.len();
        self.slots.push(slot);
        Ok(self.slots.len() - 1)
    }

    /// Total number of parameters `P`.
    pub fn total_len(&self) -> usize {
        self.total
    }

    pub fn slots(&self) -> &[TensorSlot] {
        &self.slots
    }

    /// Look up a slot by name.
    ///
    /// # Errors
    /// [`ModelError::UnknownTensor`] if no slot carries `name`.
    pub fn slot(&self, name: &str) -> ModelResult<&TensorSlot> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| ModelError::UnknownTensor { name: name.to_string() })
    }

    /// Check that `len` matches the layout's total length.
    ///
    /// # Errors
    /// [`ModelError::ParameterLengthMismatch`].
    pub fn check_len(&self, len: usize) -> ModelResult<()> {
        if len != self.total {
            return Err(ModelError::ParameterLengthMismatch { expected: self.total, actual: len });
        }
        Ok(())
    }

    /// Read-only `rows × cols` view of slot `index` inside `flat`.
    ///
    /// # Errors
    /// - [`ModelError::ParameterLengthMismatch`] if `flat` has the wrong length.
    /// - [`ModelError::LayoutShape`] if the slot index is out of range.
    pub fn view<'a>(&self, index: usize, flat: &'a [f64]) -> ModelResult<ArrayView2<'a, f64>> {
        self.check_len(flat.len())?;
        let slot = self.slot_at(index)?;
        ArrayView2::from_shape((slot.rows, slot.cols), &flat[slot.range()])
            .map_err(|_| ModelError::LayoutShape { name: slot.name.clone() })
    }

    /// Mutable `rows × cols` view of slot `index` inside `flat`.
    ///
    /// # Errors
    /// Same as [`ParamLayout::view`].
    pub fn view_mut<'a>(
        &self, index: usize, flat: &'a mut [f64],
    ) -> ModelResult<ArrayViewMut2<'a, f64>> {
        self.check_len(flat.len())?;
        let slot = self.slot_at(index)?;
        let name = slot.name.clone();
        ArrayViewMut2::from_shape((slot.rows, slot.cols), &mut flat[slot.range()])
            .map_err(|_| ModelError::LayoutShape { name })
    }

    /// Concatenate `tensors` (one per slot, in slot order) into θ.
    ///
    /// # Errors
    /// - [`ModelError::ParameterLengthMismatch`] if the tensor count differs
    ///   from the slot count.
    /// - [`ModelError::LayoutShape`] if a tensor's shape differs from its slot.
    pub fn flatten(&self, tensors: &[ArrayView2<'_, f64>]) -> ModelResult<ParamVec> {
        if tensors.len() != self.slots.len() {
            return Err(ModelError::ParameterLengthMismatch {
                expected: self.slots.len(),
                actual: tensors.len(),
            });
        }
        let mut theta = ParamVec::zeros(self.total);
        for (slot, tensor) in self.slots.iter().zip(tensors) {
            if tensor.dim() != (slot.rows, slot.cols) {
                return Err(ModelError::LayoutShape { name: slot.name.clone() });
            }
            for (dst, &src) in theta.slice_mut(ndarray::s![slot.range()]).iter_mut().zip(tensor.iter()) {
                *dst = src;
            }
        }
        Ok(theta)
    }

    // ---- Helper methods ----

    fn slot_at(&self, index: usize) -> ModelResult<&TensorSlot> {
        self.slots
            .get(index)
            .ok_or_else(|| ModelError::UnknownTensor { name: format!("#{index}") })
    }
}
