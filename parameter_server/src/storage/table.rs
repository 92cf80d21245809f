use rayon::prelude::*;

use super::{ParamShard, Result, StoreErr};

/// A flat table of values split into independently locked shards.
#[derive(Debug)]
pub struct ParamTable {
    id: u32,
    len: usize,
    shards: Box<[ParamShard]>,
}

impl ParamTable {
    /// Creates a new zeroed `ParamTable`.
    ///
    /// # Arguments
    /// * `id` - The identifier of the table.
    /// * `shard_sizes` - The length of every shard, in order.
    pub fn new(id: u32, shard_sizes: &[usize]) -> Self {
        Self {
            id,
            len: shard_sizes.iter().sum(),
            shards: shard_sizes.iter().map(|&len| ParamShard::new(len)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the length of every shard, in order.
    pub fn layout(&self) -> Vec<usize> {
        self.shards.iter().map(ParamShard::len).collect()
    }

    /// Accumulates `weight * values` into the given shard.
    pub fn add(&self, shard: u32, values: &[f32], weight: f32) -> Result<()> {
        let Some(target) = self.shards.get(shard as usize) else {
            return Err(StoreErr::UnknownShard {
                table: self.id,
                shard,
            });
        };

        target.add(values, weight)
    }

    /// Gathers all the shards into `out`, concatenated in order.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `out` isn't the size of the table.
    pub fn load(&self, out: &mut [f32]) -> Result<()> {
        if out.len() != self.len {
            return Err(StoreErr::SizeMismatch {
                what: "table",
                got: out.len(),
                expected: self.len,
            });
        }

        let mut slices = Vec::with_capacity(self.shards.len());
        let mut rest = out;
        for shard in self.shards.iter() {
            let (head, tail) = rest.split_at_mut(shard.len());
            slices.push(head);
            rest = tail;
        }

        self.shards
            .par_iter()
            .zip(slices)
            .try_for_each(|(shard, out)| shard.pull(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_shards_load_in_order() {
        let table = ParamTable::new(0, &[3, 2, 2]);

        table.add(0, &[1., 1., 1.], 1.).unwrap();
        table.add(2, &[3., 4.], 1.).unwrap();

        let mut out = [0.; 7];
        table.load(&mut out).unwrap();
        assert_eq!(out, [1., 1., 1., 0., 0., 3., 4.]);
    }

    #[test]
    fn unknown_shard_is_rejected() {
        let table = ParamTable::new(7, &[1]);

        assert!(matches!(
            table.add(1, &[1.], 1.),
            Err(StoreErr::UnknownShard { table: 7, shard: 1 })
        ));
    }

    #[test]
    fn load_checks_the_output_size() {
        let table = ParamTable::new(0, &[2, 2]);
        assert!(table.load(&mut [0.; 3]).is_err());
    }
}
