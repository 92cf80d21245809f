use std::sync::Arc;

use comms::specs::sync::SyncSpec;
use parameter_server::ParamStore;

use crate::{DeviceBuffer, HostBuffer, ParamSync, Result, SyncConfig};

pub struct SyncBuilder;

impl SyncBuilder {
    /// Builds a host backed `ParamSync` from a `SyncSpec`.
    ///
    /// # Args
    /// * `spec` - The specification of the client.
    /// * `store` - The store to synchronize with.
    ///
    /// # Returns
    /// A `ParamSync` ready to be initialized, or the configuration error found.
    pub fn build<S>(spec: SyncSpec, store: Arc<S>) -> Result<ParamSync<S, HostBuffer>>
    where
        S: ParamStore + Sync + 'static,
    {
        Self::build_on(spec, store)
    }

    /// Builds a `ParamSync` whose mirrors live in the device memory of `B`.
    pub fn build_on<S, B>(spec: SyncSpec, store: Arc<S>) -> Result<ParamSync<S, B>>
    where
        S: ParamStore + Sync + 'static,
        B: DeviceBuffer,
    {
        let config = SyncConfig::new(spec)?;
        Ok(ParamSync::new(config, store))
    }
}
