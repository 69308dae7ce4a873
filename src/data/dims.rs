//! Shape arithmetic for the axis-0-fastest layout.
//!
//! Element `(i0, i1, ..., iN-1)` lives at flat offset
//! `i0 + d0 * (i1 + d1 * (i2 + ...))`, so axis 0 has stride 1 and axis `k`
//! has stride `d0 * d1 * ... * d(k-1)`.

use crate::utils::error::BoxError;

/// Total element count, `None` on overflow. An empty shape holds no elements.
pub fn num_elements(dims: &[u32]) -> Option<u32> {
    if dims.is_empty() {
        return Some(0);
    }
    dims.iter().try_fold(1u32, |acc, &d| acc.checked_mul(d))
}

pub fn stride_of(dims: &[u32], axis: usize) -> u32 {
    dims[..axis].iter().product()
}

pub fn compute_strides(dims: &[u32]) -> Vec<u32> {
    let mut strides = Vec::with_capacity(dims.len());
    let mut acc = 1;
    for &d in dims {
        strides.push(acc);
        acc *= d;
    }
    strides
}

/// Flat offset of `indices`, evaluated from the highest axis down.
pub fn offset_of(dims: &[u32], indices: &[u32]) -> u32 {
    debug_assert_eq!(dims.len(), indices.len());
    dims.iter()
        .zip(indices)
        .rev()
        .fold(0, |offset, (&d, &i)| offset * d + i)
}

pub fn checked_offset_of(dims: &[u32], indices: &[u32]) -> Result<u32, BoxError> {
    if indices.len() != dims.len() {
        return Err(BoxError::IllegalArgs(format!(
            "Expected {} indices, got {}",
            dims.len(),
            indices.len()
        )));
    }

    if let Some(axis) = indices.iter().zip(dims).position(|(&i, &d)| i >= d) {
        return Err(BoxError::IllegalArgs(format!(
            "Index {} out of range for axis {} of length {}",
            indices[axis], axis, dims[axis]
        )));
    }

    Ok(offset_of(dims, indices))
}

/// Inverse of `offset_of`.
pub fn unravel(mut offset: u32, dims: &[u32]) -> Vec<u32> {
    dims.iter()
        .map(|&d| {
            let i = offset % d;
            offset /= d;
            i
        })
        .collect()
}
