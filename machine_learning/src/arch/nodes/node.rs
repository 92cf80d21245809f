use ndarray::Array2;

use crate::{FrameRange, MlErr, Result, arch::MatrixPool};

/// The tensors involved in propagating the gradient of a node back to its input.
///
/// Values a node doesn't use for its gradient may have been released by the memory
/// management layer, in which case they are `None`.
pub struct Backprop<'a> {
    pub input_value: Option<&'a Array2<f32>>,
    pub output_value: Option<&'a Array2<f32>>,
    pub output_grad: &'a Array2<f32>,
    pub input_grad: &'a mut Array2<f32>,
}

impl<'a> Backprop<'a> {
    /// Returns the forward input, failing if it was released.
    pub fn input_value(&self, node: &'static str) -> Result<&'a Array2<f32>> {
        self.input_value.ok_or(MlErr::MissingValue {
            node,
            value: "input",
        })
    }

    /// Returns the forward output, failing if it was released.
    pub fn output_value(&self, node: &'static str) -> Result<&'a Array2<f32>> {
        self.output_value.ok_or(MlErr::MissingValue {
            node,
            value: "output",
        })
    }
}

/// The capability interface of a single input computation node.
pub trait NodeOps {
    /// The name of the node kind, used in errors and logs.
    fn name(&self) -> &'static str;

    /// Validates the node for an input of the given shape.
    ///
    /// # Returns
    /// The shape of the output, the same as the input for elementwise maps.
    fn validate(&self, input: (usize, usize)) -> Result<(usize, usize)> {
        Ok(input)
    }

    /// Computes `output = f(input)` over the frames selected by `fr`.
    fn forward(&mut self, fr: FrameRange, input: &Array2<f32>, output: &mut Array2<f32>)
    -> Result<()>;

    /// Accumulates the gradient of the input over the frames selected by `fr`.
    fn backward(&mut self, fr: FrameRange, args: Backprop<'_>) -> Result<()>;

    /// Whether the forward output is read while computing the input gradient.
    fn output_used_for_grad(&self) -> bool;

    /// Whether the forward input is read while computing the input gradient.
    fn input_used_for_grad(&self) -> bool;

    /// Whether the node can take part in a training pass at all.
    fn is_differentiable(&self) -> bool {
        true
    }

    /// Requests the temporary matrices needed by `backward` from `pool`.
    fn request_before_backprop(&mut self, _pool: &mut MatrixPool, _shape: (usize, usize)) {}

    /// Returns the temporary matrices requested by `request_before_backprop` to `pool`.
    fn release_after_backprop(&mut self, _pool: &mut MatrixPool) {}
}

/// Checks that `output` can hold the elementwise map of `input`.
pub(super) fn check_unary_map(
    node: &'static str,
    input: &Array2<f32>,
    output: &Array2<f32>,
) -> Result<()> {
    if input.dim() != output.dim() {
        return Err(MlErr::ShapeMismatch {
            node,
            input: input.dim(),
            output: output.dim(),
        });
    }

    Ok(())
}

/// Checks that every tensor taking part in a backward pass has the same shape.
pub(super) fn check_backprop_shapes(node: &'static str, args: &Backprop<'_>) -> Result<()> {
    let expected = args.output_grad.dim();
    let others = [
        Some(&*args.input_grad),
        args.input_value,
        args.output_value,
    ];

    for m in others.into_iter().flatten() {
        if m.dim() != expected {
            return Err(MlErr::ShapeMismatch {
                node,
                input: m.dim(),
                output: expected,
            });
        }
    }

    Ok(())
}
