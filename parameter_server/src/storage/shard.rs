use parking_lot::RwLock;

use super::{Result, StoreErr};

/// A contiguous piece of a table, locked independently of the rest.
#[derive(Debug)]
pub struct ParamShard {
    len: usize,
    values: RwLock<Box<[f32]>>,
}

impl ParamShard {
    /// Creates a new zeroed `ParamShard` of `len` values.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            values: RwLock::new(vec![0.; len].into_boxed_slice()),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Accumulates `weight * values` into the shard.
    ///
    /// # Arguments
    /// * `values` - The update, must be as long as the shard.
    /// * `weight` - The scale of the update.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `values` isn't the same size as this shard.
    pub fn add(&self, values: &[f32], weight: f32) -> Result<()> {
        self.check_len(values.len())?;

        self.values
            .write()
            .iter_mut()
            .zip(values)
            .for_each(|(acc, v)| *acc += weight * v);

        Ok(())
    }

    /// Copies the shard's values into the provided destination buffer.
    ///
    /// # Arguments
    /// * `out` - A mutable slice where the values will be copied.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `out` isn't the same size as this shard.
    pub fn pull(&self, out: &mut [f32]) -> Result<()> {
        self.check_len(out.len())?;
        out.copy_from_slice(&self.values.read());
        Ok(())
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if got != self.len {
            return Err(StoreErr::SizeMismatch {
                what: "shard",
                got,
                expected: self.len,
            });
        }

        Ok(())
    }
}
