use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::component::{Component, EntityKind};
use super::device::Device;
use crate::error::Result;
use crate::mqtt::{MessageRouter, MqttClient, MqttMessage};

/// Seconds after an inbound command during which unconfirmed backend
/// reports are suppressed.
const COMMAND_GRACE_SECS: u64 = 300;

/// Controllable switch entity.
///
/// Bidirectional: publishes state like a binary sensor and subscribes a
/// command topic for inbound "ON"/"OFF" payloads. A recently issued command
/// is protected from being overwritten by a stale backend report for
/// [`COMMAND_GRACE_SECS`]; this is best-effort de-flicker reconciliation,
/// not an acknowledgment protocol.
pub struct Switch<C: MqttClient> {
    inner: Arc<SwitchInner<C>>,
}

struct SwitchInner<C: MqttClient> {
    component: Mutex<Component<C>>,
    client: Arc<Mutex<C>>,
    command_topic: String,
    device_class: Option<String>,
    enable_values: Vec<Value>,
    disable_values: Vec<Value>,
    /// Epoch seconds of the last inbound command; written from the message
    /// router task while status changes arrive on the poll task.
    last_command_secs: AtomicU64,
}

impl<C: MqttClient + 'static> Switch<C> {
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
        let component = Component::new(
            Arc::clone(&client),
            EntityKind::Switch,
            unique_id,
            name,
            device,
            prefix,
        );
        let command_topic = format!("{}/command", component.base_topic());

        Self {
            inner: Arc::new(SwitchInner {
                component: Mutex::new(component),
                client,
                command_topic,
                device_class,
                enable_values,
                disable_values,
                last_command_secs: AtomicU64::new(0),
            }),
        }
    }

    pub fn command_topic(&self) -> &str {
        &self.inner.command_topic
    }

    pub async fn publish_config(&self) -> Result<()> {
        let component = self.inner.component.lock().await;
        let mut document = component.base_discovery();
        document.device_class = self.inner.device_class.clone();
        document.command_topic = Some(self.inner.command_topic.clone());
        component.publish_config(&document).await
    }

    pub async fn set_available(&self, available: bool) -> Result<()> {
        let mut component = self.inner.component.lock().await;
        component.set_available(available).await
    }

    /// Map a raw attribute value through the enable/disable sets and publish.
    pub async fn set_state(&self, raw: &Value) -> Result<()> {
        let payload = match raw {
            v if self.inner.enable_values.contains(v) => "ON",
            v if self.inner.disable_values.contains(v) => "OFF",
            // unmatched values fail closed
            _ => "OFF",
        };
        let component = self.inner.component.lock().await;
        component
            .publish_state(&Value::String(payload.to_string()))
            .await
    }

    /// Reconcile a backend status change against recent inbound commands.
    ///
    /// More than [`COMMAND_GRACE_SECS`] after the last command the backend is
    /// trusted unconditionally. Within the window, only an event flagged as a
    /// real value change may overwrite the optimistically echoed state.
    pub async fn apply_status_change(&self, raw: &Value, value_changed: bool) -> Result<()> {
        let last = self.inner.last_command_secs.load(Ordering::SeqCst);
        let elapsed = now_secs().saturating_sub(last);
        if elapsed <= COMMAND_GRACE_SECS && !value_changed {
            debug!(
                topic = %self.inner.command_topic,
                elapsed,
                "suppressing unconfirmed status report after recent command"
            );
            return Ok(());
        }
        self.set_state(raw).await
    }

    /// Subscribe the command topic and register the inbound handler.
    ///
    /// `callback` is invoked with the decoded boolean for every accepted
    /// command; the accepted payload is echoed verbatim as the new state.
    /// Payloads other than "ON"/"OFF" are silently ignored.
    pub async fn subscribe_commands<F>(&self, router: &MessageRouter, callback: F) -> Result<()>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        {
            let mut client = self.inner.client.lock().await;
            client.subscribe(&self.inner.command_topic).await?;
        }

        let inner = Arc::clone(&self.inner);
        let callback: Arc<dyn Fn(bool) + Send + Sync> = Arc::new(callback);
        router
            .add_handler(
                &self.inner.command_topic,
                Box::new(move |msg| {
                    let inner = Arc::clone(&inner);
                    let callback = Arc::clone(&callback);
                    Box::pin(async move { handle_command(inner, callback, msg).await })
                }),
            )
            .await;

        Ok(())
    }

    #[cfg(test)]
    fn set_last_command_age(&self, age_secs: u64) {
        self.inner
            .last_command_secs
            .store(now_secs().saturating_sub(age_secs), Ordering::SeqCst);
    }
}

async fn handle_command<C: MqttClient>(
    inner: Arc<SwitchInner<C>>,
    callback: Arc<dyn Fn(bool) + Send + Sync>,
    msg: MqttMessage,
) {
    let Ok(payload) = String::from_utf8(msg.payload) else {
        debug!(topic = %msg.topic, "ignoring non-UTF-8 command payload");
        return;
    };

    let on = match payload.as_str() {
        "ON" => true,
        "OFF" => false,
        other => {
            debug!(topic = %msg.topic, payload = other, "ignoring malformed switch command");
            return;
        }
    };

    inner.last_command_secs.store(now_secs(), Ordering::SeqCst);
    callback(on);

    // Optimistic echo: report the accepted command as the new state without
    // waiting for the backend to confirm it.
    let component = inner.component.lock().await;
    if let Err(e) = component.publish_state(&Value::String(payload)).await {
        warn!("failed to echo switch command as state: {e}");
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
