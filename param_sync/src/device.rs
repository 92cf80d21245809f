use crate::{Result, SyncErr};

/// A flat buffer of `f32` values living in the memory of some compute device.
///
/// Copies may be asynchronous, `synchronize` waits until every issued copy has landed.
pub trait DeviceBuffer: Send + Sized + 'static {
    /// Allocates a zeroed buffer of `len` values.
    fn alloc(len: usize) -> Result<Self>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `src` into the buffer starting at `offset`.
    fn copy_from_host(&mut self, offset: usize, src: &[f32]) -> Result<()>;

    /// Copies the buffer starting at `offset` into `dst`.
    fn copy_to_host(&self, offset: usize, dst: &mut [f32]) -> Result<()>;

    /// Copies the whole of `other`, which must be as long as this buffer.
    fn copy_from_device(&mut self, other: &Self) -> Result<()>;

    /// Waits for every pending copy involving this buffer.
    fn synchronize(&self) -> Result<()>;
}

/// A device buffer in plain host memory, every copy completes immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer(Box<[f32]>);

impl HostBuffer {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        if offset + len > self.0.len() {
            return Err(SyncErr::SizeMismatch {
                what: "device copy",
                got: offset + len,
                expected: self.0.len(),
            });
        }

        Ok(())
    }
}

impl DeviceBuffer for HostBuffer {
    fn alloc(len: usize) -> Result<Self> {
        Ok(Self(vec![0.; len].into_boxed_slice()))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn copy_from_host(&mut self, offset: usize, src: &[f32]) -> Result<()> {
        self.check_range(offset, src.len())?;
        self.0[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn copy_to_host(&self, offset: usize, dst: &mut [f32]) -> Result<()> {
        self.check_range(offset, dst.len())?;
        dst.copy_from_slice(&self.0[offset..offset + dst.len()]);
        Ok(())
    }

    fn copy_from_device(&mut self, other: &Self) -> Result<()> {
        if other.len() != self.len() {
            return Err(SyncErr::SizeMismatch {
                what: "device copy",
                got: other.len(),
                expected: self.len(),
            });
        }

        self.0.copy_from_slice(&other.0);
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}
