mod hardmax;
mod node;
mod nonlinearity;
mod softmax;
mod unary;

pub use hardmax::Hardmax;
pub use node::{Backprop, NodeOps};
pub use nonlinearity::Nonlinearity;
pub use softmax::{LogSoftmax, Softmax};
pub use unary::{UnaryNode, UnaryOp};
