use super::Result;

/// The capabilities of a distributed parameter store.
///
/// A store holds flat tables of `f32` values split into shards. Workers push weighted
/// additive updates to individual shards and load whole tables back.
#[trait_variant::make(ParamStore: Send)]
pub trait ParamStoreTemplate {
    /// Creates a zeroed table with the given shard layout.
    ///
    /// Creating a table that already exists with the same layout is a no-op, every worker
    /// calls it before the first exchange.
    ///
    /// # Arguments
    /// * `table` - The identifier of the table.
    /// * `shard_sizes` - The length of every shard, in order.
    async fn create_table(&self, table: u32, shard_sizes: &[usize]) -> Result<()>;

    /// Accumulates `weight * values` into one shard of a table.
    ///
    /// # Arguments
    /// * `table` - The identifier of the table.
    /// * `shard` - The index of the shard.
    /// * `values` - The update, must be as long as the shard.
    /// * `weight` - The scale of the update.
    async fn add(&self, table: u32, shard: u32, values: &[f32], weight: f32) -> Result<()>;

    /// Copies the whole table, shards concatenated in order, into `out`.
    async fn batch_load(&self, table: u32, out: &mut [f32]) -> Result<()>;

    /// Waits until every worker of the store has reached the barrier.
    async fn barrier(&self) -> Result<()>;

    /// Releases the connection to the store, further calls may fail.
    async fn close(&self) -> Result<()>;
}
