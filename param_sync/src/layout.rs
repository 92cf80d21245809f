use std::{num::NonZeroUsize, ops::Range};

/// Where a tensor lives inside the flat parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorSpan {
    pub offset: usize,
    pub len: usize,
}

impl TensorSpan {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// The immutable description of the flat parameter table: the span of every tensor and the
/// contiguous shards the table is split into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    spans: Vec<TensorSpan>,
    shards: Vec<usize>,
    total: usize,
}

impl Layout {
    /// Creates a new `Layout`.
    ///
    /// # Arguments
    /// * `lens` - The amount of values of every tensor, in order.
    /// * `shards` - The amount of shards to split the table into.
    ///
    /// # Returns
    /// A new `Layout` instance.
    pub fn new<I>(lens: I, shards: NonZeroUsize) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut total = 0;
        let spans = lens
            .into_iter()
            .map(|len| {
                let span = TensorSpan { offset: total, len };
                total += len;
                span
            })
            .collect();

        Self {
            spans,
            shards: partition(total, shards),
            total,
        }
    }

    /// The amount of values in the table.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn spans(&self) -> &[TensorSpan] {
        &self.spans
    }

    /// The length of every shard, in order.
    pub fn shard_sizes(&self) -> &[usize] {
        &self.shards
    }

    /// Yields the index range of every shard, in order.
    pub fn shard_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.shards.iter().scan(0, |start, &len| {
            let range = *start..*start + len;
            *start += len;
            Some(range)
        })
    }
}

/// Splits `total` values into `shards` contiguous pieces, the first `total % shards` get one
/// extra value.
fn partition(total: usize, shards: NonZeroUsize) -> Vec<usize> {
    let shards = shards.get();
    let (base, remainder) = (total / shards, total % shards);

    (0..shards)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn offsets_are_cumulative() {
        let layout = Layout::new([3, 0, 5], nz(1));

        assert_eq!(layout.total(), 8);
        assert_eq!(
            layout.spans(),
            [
                TensorSpan { offset: 0, len: 3 },
                TensorSpan { offset: 3, len: 0 },
                TensorSpan { offset: 3, len: 5 },
            ]
        );
    }

    #[test]
    fn first_shards_take_the_remainder() {
        let layout = Layout::new([10], nz(4));

        assert_eq!(layout.shard_sizes(), [3, 3, 2, 2]);
        assert_eq!(
            layout.shard_ranges().collect::<Vec<_>>(),
            vec![0..3, 3..6, 6..8, 8..10]
        );
    }

    #[test]
    fn shards_cover_the_table_exactly() {
        for total in 0..40 {
            for workers in 1..9 {
                let layout = Layout::new([total], nz(workers));
                let sizes = layout.shard_sizes();

                assert_eq!(sizes.len(), workers);
                assert_eq!(sizes.iter().sum::<usize>(), total);

                let max = sizes.iter().max().unwrap();
                let min = sizes.iter().min().unwrap();
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn more_shards_than_values_leaves_empty_shards() {
        let layout = Layout::new([2], nz(3));
        assert_eq!(layout.shard_sizes(), [1, 1, 0]);
    }
}
