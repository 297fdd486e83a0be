//! The Home Assistant MQTT discovery publishing layer.
//!
//! Each entity owns three topics under `{prefix}/{kind}/{unique_id}/`:
//! a retained `config` document published exactly once at registration,
//! an unretained `state` topic republished on every observed change, and
//! a retained `available` topic carrying "online"/"offline". Switches add
//! a subscribed `command` topic.

mod binary;
mod component;
mod device;
mod discovery;
mod sensor;
mod switch;

pub use binary::Binary;
pub use component::{format_state, Component, EntityKind};
pub use device::Device;
pub use discovery::{DeviceInfo, DiscoveryDocument};
pub use sensor::Sensor;
pub use switch::Switch;
