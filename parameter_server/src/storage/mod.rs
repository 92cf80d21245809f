mod error;
mod memory;
mod shard;
mod store;
mod table;

pub use error::{Result, StoreErr};
pub use memory::MemoryStore;
pub(super) use shard::ParamShard;
pub use store::ParamStore;
pub(super) use table::ParamTable;
