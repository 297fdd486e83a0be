mod client;
mod router;

pub use client::{MqttClient, MqttMessage, RumqttcClient};
pub use router::{spawn_dispatcher, MessageRouter};

#[cfg(test)]
pub use client::MockMqttClient;
