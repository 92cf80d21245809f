mod server;

pub use server::StoreServer;
