use ndarray::{Array2, Zip};

use super::{
    Backprop, NodeOps,
    node::{check_backprop_shapes, check_unary_map},
};
use crate::{FrameRange, Result};

/// The elementwise functions a `UnaryNode` can apply, each paired with its derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Sigmoid,
    Tanh,
    RectifiedLinear,
    Log,
    Exp,
    Cosine,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Sigmoid => "Sigmoid",
            UnaryOp::Tanh => "Tanh",
            UnaryOp::RectifiedLinear => "RectifiedLinear",
            UnaryOp::Log => "Log",
            UnaryOp::Exp => "Exp",
            UnaryOp::Cosine => "Cosine",
        }
    }

    /// Whether the derivative is expressed in terms of the forward output instead of the input.
    ///
    /// Computing it from the output lets the input be released right after the forward pass.
    pub fn gradient_from_output(self) -> bool {
        !matches!(self, UnaryOp::Cosine)
    }

    /// The forward function.
    pub fn forward(self, x: f32) -> f32 {
        match self {
            UnaryOp::Sigmoid if x >= 0. => 1. / (1. + (-x).exp()),
            UnaryOp::Sigmoid => {
                let e = x.exp();
                e / (1. + e)
            }
            UnaryOp::Tanh => x.tanh(),
            UnaryOp::RectifiedLinear => x.max(0.),
            UnaryOp::Log => x.ln(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Cosine => x.cos(),
        }
    }

    /// The derivative of the forward function.
    ///
    /// # Arguments
    /// * `value` - The forward output, or the forward input when `gradient_from_output` is false.
    pub fn derivative(self, value: f32) -> f32 {
        match self {
            UnaryOp::Sigmoid => value * (1. - value),
            UnaryOp::Tanh => 1. - value * value,
            UnaryOp::RectifiedLinear if value > 0. => 1.,
            UnaryOp::RectifiedLinear => 0.,
            // d/dx ln(x) = 1/x = e^-y
            UnaryOp::Log => (-value).exp(),
            UnaryOp::Exp => value,
            UnaryOp::Cosine => -value.sin(),
        }
    }
}

/// A node applying a single `UnaryOp` elementwise.
#[derive(Debug, Clone, Copy)]
pub struct UnaryNode {
    op: UnaryOp,
}

impl UnaryNode {
    /// Creates a new `UnaryNode`.
    ///
    /// # Arguments
    /// * `op` - The elementwise function to apply.
    ///
    /// # Returns
    /// A new `UnaryNode` instance.
    pub fn new(op: UnaryOp) -> Self {
        Self { op }
    }

    pub fn op(&self) -> UnaryOp {
        self.op
    }
}

impl NodeOps for UnaryNode {
    fn name(&self) -> &'static str {
        self.op.name()
    }

    fn forward(
        &mut self,
        fr: FrameRange,
        input: &Array2<f32>,
        output: &mut Array2<f32>,
    ) -> Result<()> {
        check_unary_map(self.name(), input, output)?;

        let op = self.op;
        let x = fr.view(input)?;
        let y = fr.view_mut(output)?;

        Zip::from(y).and(x).par_for_each(|y, &x| *y = op.forward(x));
        Ok(())
    }

    fn backward(&mut self, fr: FrameRange, args: Backprop<'_>) -> Result<()> {
        let name = self.name();
        check_backprop_shapes(name, &args)?;

        let op = self.op;
        let value = if op.gradient_from_output() {
            args.output_value(name)?
        } else {
            args.input_value(name)?
        };

        let value = fr.view(value)?;
        let output_grad = fr.view(args.output_grad)?;
        let input_grad = fr.view_mut(args.input_grad)?;

        Zip::from(input_grad)
            .and(output_grad)
            .and(value)
            .par_for_each(|gi, &go, &v| *gi += go * op.derivative(v));

        Ok(())
    }

    fn output_used_for_grad(&self) -> bool {
        self.op.gradient_from_output()
    }

    fn input_used_for_grad(&self) -> bool {
        !self.op.gradient_from_output()
    }
}
