use ndarray::Array2;

use super::{Backprop, Hardmax, LogSoftmax, NodeOps, Softmax, UnaryNode, UnaryOp};
use crate::{FrameRange, Result, arch::MatrixPool};

/// Every nonlinearity node kind, dispatched through `NodeOps`.
#[derive(Debug)]
pub enum Nonlinearity {
    Unary(UnaryNode),
    Softmax(Softmax),
    LogSoftmax(LogSoftmax),
    Hardmax(Hardmax),
}

impl Nonlinearity {
    pub fn sigmoid() -> Self {
        Self::Unary(UnaryNode::new(UnaryOp::Sigmoid))
    }

    pub fn tanh() -> Self {
        Self::Unary(UnaryNode::new(UnaryOp::Tanh))
    }

    pub fn relu() -> Self {
        Self::Unary(UnaryNode::new(UnaryOp::RectifiedLinear))
    }

    pub fn log() -> Self {
        Self::Unary(UnaryNode::new(UnaryOp::Log))
    }

    pub fn exp() -> Self {
        Self::Unary(UnaryNode::new(UnaryOp::Exp))
    }

    pub fn cosine() -> Self {
        Self::Unary(UnaryNode::new(UnaryOp::Cosine))
    }

    pub fn softmax() -> Self {
        Self::Softmax(Softmax::new())
    }

    pub fn log_softmax() -> Self {
        Self::LogSoftmax(LogSoftmax::new())
    }

    pub fn hardmax() -> Self {
        Self::Hardmax(Hardmax::new())
    }

    fn as_node(&self) -> &dyn NodeOps {
        match self {
            Self::Unary(n) => n,
            Self::Softmax(n) => n,
            Self::LogSoftmax(n) => n,
            Self::Hardmax(n) => n,
        }
    }

    fn as_node_mut(&mut self) -> &mut dyn NodeOps {
        match self {
            Self::Unary(n) => n,
            Self::Softmax(n) => n,
            Self::LogSoftmax(n) => n,
            Self::Hardmax(n) => n,
        }
    }
}

impl NodeOps for Nonlinearity {
    fn name(&self) -> &'static str {
        self.as_node().name()
    }

    fn validate(&self, input: (usize, usize)) -> Result<(usize, usize)> {
        self.as_node().validate(input)
    }

    fn forward(
        &mut self,
        fr: FrameRange,
        input: &Array2<f32>,
        output: &mut Array2<f32>,
    ) -> Result<()> {
        self.as_node_mut().forward(fr, input, output)
    }

    fn backward(&mut self, fr: FrameRange, args: Backprop<'_>) -> Result<()> {
        self.as_node_mut().backward(fr, args)
    }

    fn output_used_for_grad(&self) -> bool {
        self.as_node().output_used_for_grad()
    }

    fn input_used_for_grad(&self) -> bool {
        self.as_node().input_used_for_grad()
    }

    fn is_differentiable(&self) -> bool {
        self.as_node().is_differentiable()
    }

    fn request_before_backprop(&mut self, pool: &mut MatrixPool, shape: (usize, usize)) {
        self.as_node_mut().request_before_backprop(pool, shape);
    }

    fn release_after_backprop(&mut self, pool: &mut MatrixPool) {
        self.as_node_mut().release_after_backprop(pool);
    }
}
