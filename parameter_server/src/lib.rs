pub mod service;
pub mod storage;

pub use service::StoreServer;
pub use storage::{MemoryStore, ParamStore, Result, StoreErr};
