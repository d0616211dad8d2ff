mod client;
mod config;
mod coordinator;
mod diff;
pub mod entities;
mod error;
mod exchange_log;
mod integration;
pub mod mapping;
mod protocol;
mod store;
mod types;

pub use client::{ComapClient, ComapClientBuilder};
pub use config::{
    Config, Options, DEFAULT_API_URL, DEFAULT_AUTH_URL, DEFAULT_CLIENT_ID,
    DEFAULT_PRESENCE_TIMEOUT, DEFAULT_TIME_ZONE, DEFAULT_UPDATE_INTERVAL,
};
pub use coordinator::{Coordinator, CoordinatorBuilder, Write};
pub use entities::{DeviceInfo, Entity, Platform};
pub use error::{Error, Result};
pub use exchange_log::ExchangeLogMode;
pub use integration::Integration;
pub use store::SnapshotStore;
pub use types::*;
