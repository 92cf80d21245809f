use ndarray::{Array2, Zip};

use super::{
    Backprop, NodeOps,
    node::check_unary_map,
    softmax::check_reducible,
};
use crate::{FrameRange, MlErr, Result};

/// One-hot encoding of the column-wise maximum, `out[r, c] = 1` iff row `r` holds the
/// maximum of column `c`. Ties resolve to the first row.
///
/// Not differentiable, only valid in evaluation graphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hardmax;

impl Hardmax {
    pub fn new() -> Self {
        Self
    }
}

impl NodeOps for Hardmax {
    fn name(&self) -> &'static str {
        "Hardmax"
    }

    fn validate(&self, input: (usize, usize)) -> Result<(usize, usize)> {
        check_reducible(self.name(), input)
    }

    fn forward(
        &mut self,
        fr: FrameRange,
        input: &Array2<f32>,
        output: &mut Array2<f32>,
    ) -> Result<()> {
        check_unary_map(self.name(), input, output)?;
        check_reducible(self.name(), input.dim())?;

        let x = fr.view(input)?;
        let mut y = fr.view_mut(output)?;

        Zip::from(y.columns_mut())
            .and(x.columns())
            .for_each(|mut y, x| {
                let mut argmax = 0;
                for (row, &v) in x.iter().enumerate() {
                    if v > x[argmax] {
                        argmax = row;
                    }
                }

                y.fill(0.);
                y[argmax] = 1.;
            });

        Ok(())
    }

    fn backward(&mut self, _fr: FrameRange, _args: Backprop<'_>) -> Result<()> {
        Err(MlErr::NotDifferentiable { node: self.name() })
    }

    fn output_used_for_grad(&self) -> bool {
        false
    }

    fn input_used_for_grad(&self) -> bool {
        false
    }

    fn is_differentiable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn one_hot_per_column() {
        let input = array![[0.1, 5.0, -1.0], [0.7, 2.0, -1.0], [0.2, 4.0, -3.0]];
        let mut output = Array2::zeros(input.dim());
        Hardmax::new()
            .forward(FrameRange::All, &input, &mut output)
            .unwrap();

        assert_eq!(output, array![[0., 1., 1.], [1., 0., 0.], [0., 0., 0.]]);
    }

    #[test]
    fn backward_always_fails() {
        let mut node = Hardmax::new();
        let value = array![[1.], [0.]];
        let mut grad_in = Array2::zeros((2, 1));
        let args = Backprop {
            input_value: Some(&value),
            output_value: Some(&value),
            output_grad: &array![[1.], [1.]],
            input_grad: &mut grad_in,
        };

        assert!(matches!(
            node.backward(FrameRange::All, args),
            Err(MlErr::NotDifferentiable { node: "Hardmax" })
        ));
        assert_eq!(grad_in, Array2::<f32>::zeros((2, 1)));
    }
}
