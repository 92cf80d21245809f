use log::debug;
use ndarray::Array2;

use super::{
    MatrixPool,
    nodes::{Backprop, NodeOps, Nonlinearity},
};
use crate::{FrameRange, MlErr, Result};

/// An ordered chain of nonlinearities: information flows forward when computing an output and
/// backward when computing the gradient of the input.
///
/// Only the intermediate values some node reads during backprop are retained, the rest go back
/// to the pool as soon as the next node has consumed them.
#[derive(Debug, Default)]
pub struct Chain {
    nodes: Vec<Nonlinearity>,
    values: Vec<Option<Array2<f32>>>,
    shapes: Vec<(usize, usize)>,
    pool: MatrixPool,
}

impl Chain {
    /// Creates a new `Chain`.
    ///
    /// # Arguments
    /// * `nodes` - The nodes the chain is composed of, in evaluation order.
    ///
    /// # Returns
    /// A new `Chain` instance.
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = Nonlinearity>,
    {
        let nodes: Vec<_> = nodes.into_iter().collect();
        let values = (0..=nodes.len()).map(|_| None).collect();

        Self {
            nodes,
            values,
            shapes: Vec::new(),
            pool: MatrixPool::new(),
        }
    }

    pub fn nodes(&self) -> &[Nonlinearity] {
        &self.nodes
    }

    pub fn pool(&self) -> &MatrixPool {
        &self.pool
    }

    /// Validates every node for an input of the given shape.
    ///
    /// # Returns
    /// The shape of every value in the chain, from the input to the output.
    pub fn validate(&self, input: (usize, usize)) -> Result<Vec<(usize, usize)>> {
        let mut shapes = Vec::with_capacity(self.nodes.len() + 1);
        shapes.push(input);

        let mut shape = input;
        for node in &self.nodes {
            shape = node.validate(shape)?;
            shapes.push(shape);
        }

        Ok(shapes)
    }

    /// Rejects chains with a node that can't propagate a gradient.
    pub fn validate_for_training(&self) -> Result<()> {
        match self.nodes.iter().find(|node| !node.is_differentiable()) {
            Some(node) => Err(MlErr::NotDifferentiable { node: node.name() }),
            None => Ok(()),
        }
    }

    /// Computes which values must outlive the forward pass.
    ///
    /// Value `j` is the input of node `j` and the output of node `j - 1`, the last value is
    /// the output of the chain and is always kept.
    pub fn retained(&self) -> Vec<bool> {
        let n = self.nodes.len();

        (0..=n)
            .map(|j| {
                j == n
                    || self.nodes[j].input_used_for_grad()
                    || (j > 0 && self.nodes[j - 1].output_used_for_grad())
            })
            .collect()
    }

    /// Makes a forward pass through the chain.
    ///
    /// # Arguments
    /// * `fr` - The frames to compute.
    /// * `input` - The input of the first node.
    ///
    /// # Returns
    /// The output of the last node or an error if occurred.
    pub fn forward(&mut self, fr: FrameRange, input: Array2<f32>) -> Result<&Array2<f32>> {
        let shapes = self.validate(input.dim())?;
        let retained = self.retained();
        self.release_values();

        debug!(
            nodes = self.nodes.len(),
            retained = retained.iter().filter(|&&kept| kept).count();
            "chain forward"
        );

        let mut current = input;
        for (i, node) in self.nodes.iter_mut().enumerate() {
            let mut output = self.pool.request(shapes[i + 1]);
            node.forward(fr, &current, &mut output)?;

            if retained[i] {
                self.values[i] = Some(current);
            } else {
                self.pool.release(current);
            }

            current = output;
        }

        self.shapes = shapes;
        let n = self.nodes.len();
        Ok(self.values[n].insert(current))
    }

    /// Propagates `output_grad` back through the chain.
    ///
    /// # Arguments
    /// * `fr` - The frames to compute, the same given to the last `forward`.
    /// * `output_grad` - The gradient of the loss with respect to the chain's output.
    ///
    /// # Returns
    /// The gradient of the loss with respect to the chain's input or an error if occurred.
    pub fn backward(&mut self, fr: FrameRange, output_grad: &Array2<f32>) -> Result<Array2<f32>> {
        self.validate_for_training()?;

        let n = self.nodes.len();
        let Some(output) = &self.values[n] else {
            return Err(MlErr::MissingValue {
                node: "Chain",
                value: "output",
            });
        };

        if output.dim() != output_grad.dim() {
            return Err(MlErr::ShapeMismatch {
                node: "Chain",
                input: output_grad.dim(),
                output: output.dim(),
            });
        }

        debug!(nodes = n; "chain backward");

        let mut grad = self.pool.request(output_grad.dim());
        grad.assign(output_grad);

        for i in (0..n).rev() {
            let node = &mut self.nodes[i];
            let mut input_grad = self.pool.request(self.shapes[i]);

            node.request_before_backprop(&mut self.pool, self.shapes[i + 1]);
            let res = node.backward(
                fr,
                Backprop {
                    input_value: self.values[i].as_ref(),
                    output_value: self.values[i + 1].as_ref(),
                    output_grad: &grad,
                    input_grad: &mut input_grad,
                },
            );
            node.release_after_backprop(&mut self.pool);
            res?;

            self.pool.release(grad);
            grad = input_grad;
        }

        Ok(grad)
    }

    /// Gives a matrix handed out by `backward` back to the chain's pool.
    pub fn recycle(&mut self, m: Array2<f32>) {
        self.pool.release(m);
    }

    fn release_values(&mut self) {
        for value in self.values.iter_mut().filter_map(Option::take) {
            self.pool.release(value);
        }
    }
}
