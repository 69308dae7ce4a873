use log::trace;

use crate::data::BoxData;
use crate::utils::error::BoxError;

use super::box_slice::BoxSlice;
use super::cursor::BoxCursor;

fn slice_at(slices: &[BoxSlice], axis: usize) -> BoxSlice {
    slices.get(axis).copied().unwrap_or_default()
}

impl BoxData {
    fn check_slices(&self, slices: &[BoxSlice]) -> Result<(), BoxError> {
        if slices.len() > self.rank() {
            return Err(BoxError::IllegalArgs(format!(
                "{} slices given for rank {}",
                slices.len(),
                self.rank()
            )));
        }
        Ok(())
    }

    /// Shape of the selection. Axes without a slice are taken whole.
    pub fn diffs(&self, slices: &[BoxSlice]) -> Result<Vec<u32>, BoxError> {
        self.check_slices(slices)?;

        let mut cursor = self.init_cursor(0, slice_at(slices, 0))?;
        let mut shape = Vec::with_capacity(self.rank());
        shape.push(cursor.len() as u32);

        while !cursor.is_last_dim() {
            cursor = cursor.sub(slice_at(slices, cursor.dim_index() + 1))?;
            shape.push(cursor.len() as u32);
        }
        Ok(shape)
    }

    /// Visits the flat offset of every selected element, axis 0 fastest.
    pub fn for_each<F: FnMut(usize)>(
        &self,
        slices: &[BoxSlice],
        mut f: F,
    ) -> Result<(), BoxError> {
        self.check_slices(slices)?;
        if self.rank() == 0 {
            return Err(BoxError::Expired);
        }

        let width = self.element_type().byte_width();
        self.walk_axis(self.rank() - 1, 0, slices, &mut |position| {
            f(position as usize / width)
        })
    }

    // Outer axes recurse first so the innermost loop runs along axis 0.
    fn walk_axis<F: FnMut(isize)>(
        &self,
        axis: usize,
        base: isize,
        slices: &[BoxSlice],
        f: &mut F,
    ) -> Result<(), BoxError> {
        let mut cursor = BoxCursor::new(self, base, axis, slice_at(slices, axis))?;
        loop {
            if axis == 0 {
                f(cursor.position());
            } else {
                self.walk_axis(axis - 1, cursor.position(), slices, f)?;
            }
            if !cursor.next() {
                return Ok(());
            }
        }
    }

    /// Copies the selection into `dest`, resizing it to `diffs(slices)` on
    /// this box's device.
    pub fn slice_to(&self, dest: &mut BoxData, slices: &[BoxSlice]) -> Result<(), BoxError> {
        let shape = self.diffs(slices)?;
        let src = self.as_bytes()?;
        dest.resize(self.element_type(), self.device(), self.ext(), &shape)?;

        let width = self.element_type().byte_width();
        let dst = dest.as_bytes_mut()?;
        let mut written = 0;

        self.walk_axis(self.rank() - 1, 0, slices, &mut |position| {
            let from = position as usize;
            dst[written..written + width].copy_from_slice(&src[from..from + width]);
            written += width;
        })?;

        trace!("Sliced {:?} to {:?}", self.dims(), shape);
        Ok(())
    }

    pub fn slice(&self, slices: &[BoxSlice]) -> Result<BoxData, BoxError> {
        let mut dest = BoxData::new();
        self.slice_to(&mut dest, slices)?;
        dest.checked_assign_info(self.info());
        Ok(dest)
    }

    /// `slice` with a comma separated list such as `"1:, ::-1"`.
    pub fn slice_text(&self, text: &str) -> Result<BoxData, BoxError> {
        self.slice(&BoxSlice::parse_list(text)?)
    }
}
