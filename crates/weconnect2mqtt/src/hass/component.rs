use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::device::Device;
use super::discovery::DiscoveryDocument;
use crate::error::Result;
use crate::mqtt::MqttClient;

/// Discovery subtree the entity lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Sensor,
    BinarySensor,
    Switch,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Sensor => "sensor",
            EntityKind::BinarySensor => "binary_sensor",
            EntityKind::Switch => "switch",
        }
    }
}

/// Shared behavior of every published entity: topic derivation, the
/// availability lifecycle, and config/state publishing.
///
/// Topic strings are a deterministic function of prefix, entity kind and
/// unique id, and never change after construction. `publish_config` must be
/// called exactly once, before the first `publish_state`; Home Assistant's
/// discovery flow relies on that ordering.
pub struct Component<C> {
    client: Arc<Mutex<C>>,
    kind: EntityKind,
    unique_id: String,
    name: String,
    device: Option<Arc<Device>>,
    prefix: String,
    available: bool,
}

impl<C: MqttClient> Component<C> {
    pub fn new(
        client: Arc<Mutex<C>>,
        kind: EntityKind,
        unique_id: impl Into<String>,
        name: impl Into<String>,
        device: Option<Arc<Device>>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            kind,
            unique_id: unique_id.into(),
            name: name.into(),
            device,
            prefix: prefix.into(),
            available: true,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn base_topic(&self) -> String {
        format!("{}/{}/{}", self.prefix, self.kind.as_str(), self.unique_id)
    }

    pub fn config_topic(&self) -> String {
        format!("{}/config", self.base_topic())
    }

    pub fn state_topic(&self) -> String {
        format!("{}/state", self.base_topic())
    }

    pub fn availability_topic(&self) -> String {
        format!("{}/available", self.base_topic())
    }

    /// The discovery document fields common to every entity kind.
    /// Specializations add their own fields before publishing.
    pub fn base_discovery(&self) -> DiscoveryDocument {
        DiscoveryDocument {
            availability_topic: self.availability_topic(),
            name: self.name.clone(),
            state_topic: self.state_topic(),
            unique_id: self.unique_id.clone(),
            device: self.device.as_ref().map(|d| d.to_discovery()),
            device_class: None,
            unit_of_measurement: None,
            command_topic: None,
        }
    }

    /// Publish the retained discovery document.
    pub async fn publish_config(&self, document: &DiscoveryDocument) -> Result<()> {
        let payload = serde_json::to_vec(document)?;
        debug!(unique_id = %self.unique_id, "publishing discovery config");

        let mut client = self.client.lock().await;
        client.publish(&self.config_topic(), &payload, true).await
    }

    /// Set the availability flag and publish it, retained.
    ///
    /// Publishes on every call, even when the value is unchanged; Home
    /// Assistant treats the retained payload as the source of truth.
    pub async fn set_available(&mut self, available: bool) -> Result<()> {
        let payload: &[u8] = if available { b"online" } else { b"offline" };
        self.available = available;

        let mut client = self.client.lock().await;
        client
            .publish(&self.availability_topic(), payload, true)
            .await
    }

    /// Publish a state value, unretained.
    pub async fn publish_state(&self, value: &Value) -> Result<()> {
        let payload = format_state(value);
        debug!(unique_id = %self.unique_id, state = %payload, "publishing state");

        let mut client = self.client.lock().await;
        client
            .publish(&self.state_topic(), payload.as_bytes(), false)
            .await
    }
}

/// Wire encoding of a state value: strings go out bare, other scalars in
/// their natural text form, structured values as JSON.
pub fn format_state(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mqtt::MockMqttClient;

    fn component(client: Arc<Mutex<MockMqttClient>>) -> Component<MockMqttClient> {
        Component::new(
            client,
            EntityKind::Sensor,
            "WVWZZZ_currentSOC_pct",
            "Battery percentage",
            None,
            "homeassistant",
        )
    }

    #[test]
    fn test_topic_derivation() {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let component = component(client);

        assert_eq!(
            component.config_topic(),
            "homeassistant/sensor/WVWZZZ_currentSOC_pct/config"
        );
        assert_eq!(
            component.state_topic(),
            "homeassistant/sensor/WVWZZZ_currentSOC_pct/state"
        );
        assert_eq!(
            component.availability_topic(),
            "homeassistant/sensor/WVWZZZ_currentSOC_pct/available"
        );
    }

    #[tokio::test]
    async fn test_availability_publishes_on_every_write() {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let mut component = component(Arc::clone(&client));

        component.set_available(true).await.unwrap();
        component.set_available(true).await.unwrap();
        component.set_available(false).await.unwrap();

        let mock = client.lock().await;
        let payloads =
            mock.payloads_for("homeassistant/sensor/WVWZZZ_currentSOC_pct/available");
        assert_eq!(payloads, vec!["online", "online", "offline"]);
        // availability is always retained
        assert!(mock.published.iter().all(|(_, _, retain)| *retain));
    }

    #[tokio::test]
    async fn test_state_is_not_retained() {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let component = component(Arc::clone(&client));

        component.publish_state(&json!(82)).await.unwrap();

        let mock = client.lock().await;
        let (topic, payload, retain) = &mock.published[0];
        assert_eq!(topic, "homeassistant/sensor/WVWZZZ_currentSOC_pct/state");
        assert_eq!(payload, b"82");
        assert!(!retain);
    }

    #[tokio::test]
    async fn test_config_is_retained() {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let component = component(Arc::clone(&client));

        let document = component.base_discovery();
        component.publish_config(&document).await.unwrap();

        let mock = client.lock().await;
        let (topic, payload, retain) = &mock.published[0];
        assert_eq!(topic, "homeassistant/sensor/WVWZZZ_currentSOC_pct/config");
        assert!(retain);

        let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(json["unique_id"], "WVWZZZ_currentSOC_pct");
        assert_eq!(json["name"], "Battery percentage");
        assert_eq!(
            json["state_topic"],
            "homeassistant/sensor/WVWZZZ_currentSOC_pct/state"
        );
    }

    #[test]
    fn test_format_state() {
        assert_eq!(format_state(&json!("charging")), "charging");
        assert_eq!(format_state(&json!(82)), "82");
        assert_eq!(format_state(&json!(11.5)), "11.5");
        assert_eq!(format_state(&json!(true)), "true");
        assert_eq!(format_state(&json!({"lat": 52.1})), r#"{"lat":52.1}"#);
        assert_eq!(format_state(&Value::Null), "");
    }
}
