use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use log::{debug, info};
use parking_lot::RwLock;
use tokio::sync::Barrier;

use super::{ParamStore, ParamTable, Result, StoreErr};

/// A parameter store living in the memory of this process.
///
/// Every worker shares the same instance, usually behind an `Arc`.
#[derive(Debug)]
pub struct MemoryStore {
    workers: NonZeroUsize,
    tables: RwLock<HashMap<u32, Arc<ParamTable>>>,
    barrier: Barrier,
}

impl MemoryStore {
    /// Creates a new `MemoryStore`.
    ///
    /// # Arguments
    /// * `workers` - The amount of workers taking part in every barrier.
    ///
    /// # Returns
    /// A new `MemoryStore` instance.
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            tables: RwLock::new(HashMap::new()),
            barrier: Barrier::new(workers.get()),
        }
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Returns the amount of values in `table`.
    pub fn table_len(&self, table: u32) -> Result<usize> {
        Ok(self.table(table)?.len())
    }

    fn table(&self, table: u32) -> Result<Arc<ParamTable>> {
        self.tables
            .read()
            .get(&table)
            .cloned()
            .ok_or(StoreErr::UnknownTable(table))
    }
}

impl ParamStore for MemoryStore {
    async fn create_table(&self, table: u32, shard_sizes: &[usize]) -> Result<()> {
        let mut tables = self.tables.write();

        if let Some(existing) = tables.get(&table) {
            let expected = existing.layout();
            if expected != shard_sizes {
                return Err(StoreErr::LayoutMismatch {
                    table,
                    got: shard_sizes.to_vec(),
                    expected,
                });
            }

            return Ok(());
        }

        let created = ParamTable::new(table, shard_sizes);
        info!(table = table, shards = shard_sizes.len(), len = created.len(); "created table");
        tables.insert(table, Arc::new(created));

        Ok(())
    }

    async fn add(&self, table: u32, shard: u32, values: &[f32], weight: f32) -> Result<()> {
        self.table(table)?.add(shard, values, weight)
    }

    async fn batch_load(&self, table: u32, out: &mut [f32]) -> Result<()> {
        self.table(table)?.load(out)
    }

    async fn barrier(&self) -> Result<()> {
        let res = self.barrier.wait().await;
        if res.is_leader() {
            debug!(workers = self.workers.get(); "barrier released");
        }

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
