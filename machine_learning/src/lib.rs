pub mod arch;
pub mod dataset;
pub mod error;
pub mod frame;

pub use error::{MlErr, Result};
pub use frame::FrameRange;
