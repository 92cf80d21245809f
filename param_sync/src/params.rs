use ndarray::{ArrayBase, DataMut, Dimension};

/// A learnable tensor owned by the caller, seen as a flat sequence of `f32` values.
pub trait Parameter {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the values of the tensor into `dst`, which is exactly `len` long.
    fn read_into(&self, dst: &mut [f32]);

    /// Overwrites the values of the tensor with `src`, which is exactly `len` long.
    fn write_from(&mut self, src: &[f32]);
}

impl Parameter for Vec<f32> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn read_into(&self, dst: &mut [f32]) {
        dst.copy_from_slice(self);
    }

    fn write_from(&mut self, src: &[f32]) {
        self.copy_from_slice(src);
    }
}

impl Parameter for Box<[f32]> {
    fn len(&self) -> usize {
        <[f32]>::len(self)
    }

    fn read_into(&self, dst: &mut [f32]) {
        dst.copy_from_slice(self);
    }

    fn write_from(&mut self, src: &[f32]) {
        self.copy_from_slice(src);
    }
}

// Logical order, so any memory layout works.
impl<S, D> Parameter for ArrayBase<S, D>
where
    S: DataMut<Elem = f32>,
    D: Dimension,
{
    fn len(&self) -> usize {
        ArrayBase::len(self)
    }

    fn read_into(&self, dst: &mut [f32]) {
        dst.iter_mut().zip(self.iter()).for_each(|(d, &v)| *d = v);
    }

    fn write_from(&mut self, src: &[f32]) {
        self.iter_mut().zip(src).for_each(|(v, &s)| *v = s);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn arrays_are_read_in_logical_order() {
        let m = array![[1., 2.], [3., 4.]];
        let t = m.t().to_owned();

        let mut out = [0.; 4];
        t.read_into(&mut out);
        assert_eq!(out, [1., 3., 2., 4.]);
    }

    #[test]
    fn arrays_are_written_in_logical_order() {
        let mut m = ndarray::Array2::<f32>::zeros((2, 2));
        m.write_from(&[1., 2., 3., 4.]);
        assert_eq!(m, array![[1., 2.], [3., 4.]]);
    }
}
