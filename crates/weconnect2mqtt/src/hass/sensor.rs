use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use super::component::{Component, EntityKind};
use super::device::Device;
use crate::error::Result;
use crate::mqtt::MqttClient;

/// Numeric or text sensor entity.
pub struct Sensor<C> {
    component: Component<C>,
    device_class: Option<String>,
    unit_of_measurement: Option<String>,
}

impl<C: MqttClient> Sensor<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<Mutex<C>>,
        unique_id: impl Into<String>,
        name: impl Into<String>,
        device: Option<Arc<Device>>,
        device_class: Option<String>,
        unit_of_measurement: Option<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            component: Component::new(client, EntityKind::Sensor, unique_id, name, device, prefix),
            device_class,
            unit_of_measurement,
        }
    }

    /// Publish the retained discovery document. Called once at registration,
    /// before any state publish.
    pub async fn publish_config(&self) -> Result<()> {
        let mut document = self.component.base_discovery();
        document.device_class = self.device_class.clone();
        document.unit_of_measurement = self.unit_of_measurement.clone();
        self.component.publish_config(&document).await
    }

    pub async fn set_available(&mut self, available: bool) -> Result<()> {
        self.component.set_available(available).await
    }

    pub async fn publish_state(&self, value: &Value) -> Result<()> {
        self.component.publish_state(value).await
    }

    pub fn unique_id(&self) -> &str {
        self.component.unique_id()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mqtt::MockMqttClient;

    #[tokio::test]
    async fn test_discovery_includes_class_and_unit_when_set() {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let sensor = Sensor::new(
            Arc::clone(&client),
            "WVWZZZ_currentSOC_pct",
            "Battery percentage",
            None,
            Some("battery".to_string()),
            Some("%".to_string()),
            "homeassistant",
        );

        sensor.publish_config().await.unwrap();

        let mock = client.lock().await;
        let (_, payload, _) = &mock.published[0];
        let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(json["device_class"], "battery");
        assert_eq!(json["unit_of_measurement"], "%");
    }

    #[tokio::test]
    async fn test_discovery_omits_class_and_unit_when_unset() {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let sensor = Sensor::new(
            Arc::clone(&client),
            "WVWZZZ_vin",
            "VIN",
            None,
            None,
            None,
            "homeassistant",
        );

        sensor.publish_config().await.unwrap();

        let mock = client.lock().await;
        let (_, payload, _) = &mock.published[0];
        let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("device_class"));
        assert!(!object.contains_key("unit_of_measurement"));
    }

    #[tokio::test]
    async fn test_state_published_as_plain_number() {
        let client = Arc::new(Mutex::new(MockMqttClient::new()));
        let sensor = Sensor::new(
            Arc::clone(&client),
            "WVWZZZ_currentSOC_pct",
            "Battery percentage",
            None,
            None,
            None,
            "homeassistant",
        );

        sensor.publish_state(&json!(82)).await.unwrap();

        let mock = client.lock().await;
        assert_eq!(
            mock.payloads_for("homeassistant/sensor/WVWZZZ_currentSOC_pct/state"),
            vec!["82"]
        );
    }
}
