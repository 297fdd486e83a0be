use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use super::component::{Component, EntityKind};
use super::device::Device;
use crate::error::Result;
use crate::mqtt::MqttClient;

/// Boolean sensor entity.
///
/// Raw attribute values are mapped to "ON"/"OFF" by membership in the
/// enable/disable sets; values in neither set fail closed to "OFF" rather
/// than erroring or skipping the publish.
pub struct Binary<C> {
    component: Component<C>,
    device_class: Option<String>,
    enable_values: Vec<Value>,
    disable_values: Vec<Value>,
}

impl<C: MqttClient> Binary<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<Mutex<C>>,
        unique_id: impl Into<String>,
        name: impl Into<String>,
        device: Option<Arc<Device>>,
        device_class: Option<String>,
        enable_values: Vec<Value>,
        disable_values: Vec<Value>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            component: Component::new(
                client,
                EntityKind::BinarySensor,
                unique_id,
                name,
                device,
                prefix,
            ),
            device_class,
            enable_values,
            disable_values,
        }
    }

    pub async fn publish_config(&self) -> Result<()> {
        let mut document = self.component.base_discovery();
        document.device_class = self.device_class.clone();
        self.component.publish_config(&document).await
    }

    pub async fn set_available(&mut self, available: bool) -> Result<()> {
        self.component.set_available(available).await
    }

    /// Map a raw attribute value through the enable/disable sets and publish.
    pub async fn set_state(&self, raw: &Value) -> Result<()> {
        let payload = match raw {
            v if self.enable_values.contains(v) => "ON",
            v if self.disable_values.contains(v) => "OFF",
            // unmatched values fail closed
            _ => "OFF",
        };
        self.component
            .publish_state(&Value::String(payload.to_string()))
            .await
    }

    pub fn unique_id(&self) -> &str {
        self.component.unique_id()
    }
}
