pub mod config;
pub mod error;
pub mod hass;
pub mod mqtt;
pub mod observer;
pub mod vehicle;

pub use config::{Cli, Config};
pub use error::{Error, Result};
pub use observer::VehicleObserver;
