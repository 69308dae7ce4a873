use log::trace;

use crate::data::BoxData;
use crate::element::Element;
use crate::utils::error::BoxError;

use super::box_slice::BoxSlice;

/// Walks one axis of a box under a slice.
///
/// Positions are signed byte offsets from the start of the data buffer.
/// `stride_bytes` already includes the slice step, so `next` is a single add
/// and `end` is the exact position one step past the last selected element.
#[derive(Clone, Debug)]
pub struct BoxCursor<'a> {
    owner: &'a BoxData,
    begin: isize,
    end: isize,
    stride_bytes: isize,
    dim_index: usize,
}

impl<'a> BoxCursor<'a> {
    pub(crate) fn new(
        owner: &'a BoxData,
        base: isize,
        dim_index: usize,
        slice: BoxSlice,
    ) -> Result<Self, BoxError> {
        if owner.rank() == 0 {
            return Err(BoxError::Expired);
        }
        let len = owner.dim(dim_index).ok_or_else(|| {
            BoxError::IllegalArgs(format!(
                "Axis {} out of range for rank {}",
                dim_index,
                owner.rank()
            ))
        })?;

        let range = slice.resolve(len)?;
        let width = owner.element_type().byte_width() as isize;
        let axis_stride = owner.stride_of(dim_index)? as isize * width;
        let stride_bytes = axis_stride * range.step as isize;
        let begin = base + range.begin as isize * axis_stride;
        let end = begin + range.count as isize * stride_bytes;

        trace!(
            "Cursor on axis {} with {}: begin {} end {} stride {}",
            dim_index, slice, begin, end, stride_bytes
        );

        Ok(Self {
            owner,
            begin,
            end,
            stride_bytes,
            dim_index,
        })
    }

    pub fn owner(&self) -> &'a BoxData {
        self.owner
    }

    pub fn dim_index(&self) -> usize {
        self.dim_index
    }

    pub fn stride_bytes(&self) -> isize {
        self.stride_bytes
    }

    /// Byte offset of the current position.
    pub fn position(&self) -> isize {
        self.begin
    }

    pub fn end(&self) -> isize {
        self.end
    }

    /// Positions left, including the current one.
    pub fn len(&self) -> usize {
        ((self.end - self.begin) / self.stride_bytes).max(0) as usize
    }

    pub fn is_end(&self) -> bool {
        if self.stride_bytes > 0 {
            self.begin >= self.end
        } else {
            self.begin <= self.end
        }
    }

    pub fn is_last_dim(&self) -> bool {
        self.dim_index + 1 == self.owner.rank()
    }

    /// Moves to the next position, returning whether one remains.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        self.begin += self.stride_bytes;
        !self.is_end()
    }

    /// Cursor over the next axis, anchored at the current position.
    pub fn sub(&self, slice: BoxSlice) -> Result<BoxCursor<'a>, BoxError> {
        if self.is_last_dim() {
            return Err(BoxError::IllegalArgs(format!(
                "Axis {} has no sub axis",
                self.dim_index
            )));
        }
        if self.is_end() {
            return Err(past_end());
        }
        BoxCursor::new(self.owner, self.begin, self.dim_index + 1, slice)
    }

    /// Flat element offset of the current position, `None` once the cursor
    /// has left the buffer.
    pub fn offset(&self) -> Option<usize> {
        if self.is_end() {
            return None;
        }
        let start = usize::try_from(self.begin).ok()?;
        Some(start / self.owner.element_type().byte_width())
    }

    pub fn bytes(&self) -> Result<&'a [u8], BoxError> {
        if self.is_end() {
            return Err(past_end());
        }
        let width = self.owner.element_type().byte_width();
        let start = usize::try_from(self.begin).map_err(|_| past_end())?;
        self.owner
            .as_bytes()?
            .get(start..start + width)
            .ok_or_else(past_end)
    }

    pub fn value<T: Element>(&self) -> Result<T, BoxError> {
        self.owner.check_type::<T>()?;
        Ok(T::read_ne(self.bytes()?))
    }
}

fn past_end() -> BoxError {
    BoxError::IllegalArgs("Cursor is past its end".to_string())
}

impl BoxData {
    /// Cursor over `axis` starting from the first element of the buffer.
    pub fn init_cursor(
        &self,
        axis: usize,
        slice: BoxSlice,
    ) -> Result<BoxCursor<'_>, BoxError> {
        BoxCursor::new(self, 0, axis, slice)
    }
}
