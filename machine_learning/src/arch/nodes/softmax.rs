use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis, Zip};

use super::{
    Backprop, NodeOps,
    node::{check_backprop_shapes, check_unary_map},
};
use crate::{FrameRange, MlErr, Result, arch::MatrixPool};

/// Writes the column-wise log-softmax of `x` into `out`.
///
/// Each column is shifted by its maximum before the log-sum-exp so that large inputs don't
/// overflow.
pub(super) fn log_softmax_into(x: ArrayView2<f32>, mut out: ArrayViewMut2<f32>) {
    Zip::from(out.columns_mut())
        .and(x.columns())
        .for_each(|mut out, x| {
            let max = x.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum = x.iter().map(|&v| (v - max).exp()).sum::<f32>().ln();
            Zip::from(&mut out)
                .and(&x)
                .for_each(|o, &v| *o = (v - max) - log_sum);
        });
}

/// Rejects inputs with no rows, there is nothing to normalize over.
pub(super) fn check_reducible(node: &'static str, input: (usize, usize)) -> Result<(usize, usize)> {
    if input.0 == 0 {
        return Err(MlErr::EmptyInput { node });
    }

    Ok(input)
}

/// The plumbing shared by the softmax family: a temporary row of per-column scalars and a
/// temporary matrix, both drawn from a `MatrixPool` around each backward pass.
#[derive(Debug, Default)]
struct SoftmaxBase {
    column_temp: Option<Array2<f32>>,
    matrix_temp: Option<Array2<f32>>,
}

impl SoftmaxBase {
    fn request(&mut self, pool: &mut MatrixPool, (rows, cols): (usize, usize)) {
        self.column_temp = Some(pool.request((1, cols)));
        self.matrix_temp = Some(pool.request((rows, cols)));
    }

    fn release(&mut self, pool: &mut MatrixPool) {
        if let Some(m) = self.column_temp.take() {
            pool.release(m);
        }

        if let Some(m) = self.matrix_temp.take() {
            pool.release(m);
        }
    }

    /// Returns both temporaries sliced to `fr`.
    fn views(
        &mut self,
        node: &'static str,
        fr: FrameRange,
    ) -> Result<(ArrayViewMut2<'_, f32>, ArrayViewMut2<'_, f32>)> {
        let (Some(column), Some(matrix)) = (&mut self.column_temp, &mut self.matrix_temp) else {
            return Err(MlErr::TempNotRequested { node });
        };

        Ok((fr.view_mut(column)?, fr.view_mut(matrix)?))
    }
}

/// Column-wise softmax, `exp(log_softmax(x))`.
#[derive(Debug, Default)]
pub struct Softmax {
    base: SoftmaxBase,
}

impl Softmax {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeOps for Softmax {
    fn name(&self) -> &'static str {
        "Softmax"
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

        let mut y = fr.view_mut(output)?;
        log_softmax_into(fr.view(input)?, y.view_mut());
        y.mapv_inplace(f32::exp);
        Ok(())
    }

    /// `grad_in += (grad_out - <grad_out, out>) * out`, the Jacobian-vector product of the
    /// softmax without materializing the Jacobian.
    fn backward(&mut self, fr: FrameRange, args: Backprop<'_>) -> Result<()> {
        let name = self.name();
        check_backprop_shapes(name, &args)?;

        let out = fr.view(args.output_value(name)?)?;
        let grad_out = fr.view(args.output_grad)?;
        let grad_in = fr.view_mut(args.input_grad)?;
        let (mut inner, mut diff) = self.base.views(name, fr)?;

        Zip::from(inner.row_mut(0))
            .and(grad_out.columns())
            .and(out.columns())
            .for_each(|dot, g, y| *dot = g.dot(&y));

        Zip::from(&mut diff)
            .and(&grad_out)
            .and_broadcast(&inner)
            .for_each(|d, &g, &dot| *d = g - dot);

        Zip::from(grad_in)
            .and(&diff)
            .and(&out)
            .for_each(|gi, &d, &y| *gi += d * y);

        Ok(())
    }

    fn output_used_for_grad(&self) -> bool {
        true
    }

    fn input_used_for_grad(&self) -> bool {
        false
    }

    fn request_before_backprop(&mut self, pool: &mut MatrixPool, shape: (usize, usize)) {
        self.base.request(pool, shape);
    }

    fn release_after_backprop(&mut self, pool: &mut MatrixPool) {
        self.base.release(pool);
    }
}

/// Column-wise log-softmax.
#[derive(Debug, Default)]
pub struct LogSoftmax {
    base: SoftmaxBase,
}

impl LogSoftmax {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeOps for LogSoftmax {
    fn name(&self) -> &'static str {
        "LogSoftmax"
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

        log_softmax_into(fr.view(input)?, fr.view_mut(output)?);
        Ok(())
    }

    /// `grad_in += grad_out - exp(out) * colsum(grad_out)`.
    fn backward(&mut self, fr: FrameRange, args: Backprop<'_>) -> Result<()> {
        let name = self.name();
        check_backprop_shapes(name, &args)?;

        let out = fr.view(args.output_value(name)?)?;
        let grad_out = fr.view(args.output_grad)?;
        let grad_in = fr.view_mut(args.input_grad)?;
        let (mut sums, mut softmax) = self.base.views(name, fr)?;

        sums.row_mut(0).assign(&grad_out.sum_axis(Axis(0)));

        Zip::from(&mut softmax)
            .and(&out)
            .and_broadcast(&sums)
            .for_each(|s, &y, &sum| *s = y.exp() * sum);

        Zip::from(grad_in)
            .and(&grad_out)
            .and(&softmax)
            .for_each(|gi, &g, &s| *gi += g - s);

        Ok(())
    }

    fn output_used_for_grad(&self) -> bool {
        true
    }

    fn input_used_for_grad(&self) -> bool {
        false
    }

    fn request_before_backprop(&mut self, pool: &mut MatrixPool, shape: (usize, usize)) {
        self.base.request(pool, shape);
    }

    fn release_after_backprop(&mut self, pool: &mut MatrixPool) {
        self.base.release(pool);
    }
}
