mod chain;
pub mod nodes;
mod pool;

pub use chain::Chain;
pub use pool::MatrixPool;
