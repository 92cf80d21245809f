use ndarray::Array2;

/// A pool of scratch matrices reused across forward and backward passes.
#[derive(Debug, Default)]
pub struct MatrixPool {
    free: Vec<Vec<f32>>,
    allocations: usize,
}

impl MatrixPool {
    /// Creates a new empty `MatrixPool`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a zeroed matrix of the given shape, reusing the smallest released buffer big
    /// enough to hold it.
    pub fn request(&mut self, shape: (usize, usize)) -> Array2<f32> {
        let len = shape.0 * shape.1;

        let best = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, buf)| buf.capacity() >= len)
            .min_by_key(|(_, buf)| buf.capacity())
            .map(|(idx, _)| idx);

        let mut data = match best {
            Some(idx) => self.free.swap_remove(idx),
            None => {
                self.allocations += 1;
                Vec::with_capacity(len)
            }
        };

        data.clear();
        data.resize(len, 0.);

        // SAFETY: `data` was just resized to the amount of elements of `shape`.
        Array2::from_shape_vec(shape, data).unwrap()
    }

    /// Gives a matrix back to the pool.
    pub fn release(&mut self, m: Array2<f32>) {
        let (data, _) = m.into_raw_vec_and_offset();
        self.free.push(data);
    }

    /// The amount of buffers ready to be handed out.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// The amount of buffers this pool had to allocate.
    pub fn allocations(&self) -> usize {
        self.allocations
    }
}
