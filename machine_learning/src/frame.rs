use std::ops::Range;

use ndarray::{Array2, ArrayView2, ArrayViewMut2, s};

use crate::{MlErr, Result};

/// The subset of a minibatch a forward or backward call operates on.
///
/// Matrices hold one frame per column, so a frame range selects a contiguous span of columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameRange {
    #[default]
    All,
    Span {
        start: usize,
        len: usize,
    },
}

impl FrameRange {
    /// Creates a new `FrameRange` spanning `len` frames starting at `start`.
    pub fn span(start: usize, len: usize) -> Self {
        Self::Span { start, len }
    }

    /// Resolves the column range this frame range covers.
    ///
    /// # Arguments
    /// * `frames` - The amount of frames (columns) in the minibatch.
    ///
    /// # Returns
    /// The column range or `MlErr::FrameOutOfRange` if it doesn't fit in the minibatch.
    pub fn columns(&self, frames: usize) -> Result<Range<usize>> {
        match *self {
            FrameRange::All => Ok(0..frames),
            FrameRange::Span { start, len } if start + len <= frames => Ok(start..start + len),
            FrameRange::Span { start, len } => Err(MlErr::FrameOutOfRange { start, len, frames }),
        }
    }

    /// Views the frames of `m` selected by this range.
    pub fn view<'a>(&self, m: &'a Array2<f32>) -> Result<ArrayView2<'a, f32>> {
        let cols = self.columns(m.ncols())?;
        Ok(m.slice(s![.., cols]))
    }

    /// Mutably views the frames of `m` selected by this range.
    pub fn view_mut<'a>(&self, m: &'a mut Array2<f32>) -> Result<ArrayViewMut2<'a, f32>> {
        let cols = self.columns(m.ncols())?;
        Ok(m.slice_mut(s![.., cols]))
    }
}
