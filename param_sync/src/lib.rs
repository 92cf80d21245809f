pub mod builder;
pub mod config;
pub mod device;
pub mod error;
mod exchange;
pub mod layout;
pub mod net;
pub mod params;
mod ring;
pub mod sync;
pub mod warmup;

pub use builder::SyncBuilder;
pub use config::{Correction, SyncConfig};
pub use device::{DeviceBuffer, HostBuffer};
pub use error::{Result, SyncErr};
pub use layout::{Layout, TensorSpan};
pub use net::RemoteStore;
pub use params::Parameter;
pub use sync::ParamSync;
pub use warmup::Warmup;
