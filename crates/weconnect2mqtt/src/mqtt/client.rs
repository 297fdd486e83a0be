use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// An inbound message from a subscribed topic.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    #[allow(dead_code)]
    pub retain: bool,
}

/// The MQTT transport boundary.
///
/// Reconnects, QoS handling and publish queueing live behind this trait;
/// the publishing layer only needs publish-with-retain, subscribe, and a
/// way to drain inbound messages. Mockable for tests.
#[async_trait]
pub trait MqttClient: Send + Sync {
    async fn connect(&mut self) -> Result<()>;

    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<()>;

    /// Detach the inbound message stream so it can be consumed without
    /// holding the client. Returns None before `connect` or if the stream
    /// was already taken.
    fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<MqttMessage>>;

    async fn disconnect(&mut self) -> Result<()>;
}

/// rumqttc-backed implementation.
///
/// `connect` spawns a background task driving the rumqttc event loop;
/// inbound publishes are forwarded over an unbounded channel whose
/// receiver `take_inbound` hands out. Connection errors are retried by the
/// background task with a short pause, rumqttc re-establishes the session.
pub struct RumqttcClient {
    options: MqttOptions,
    client: Option<AsyncClient>,
    inbound: Option<mpsc::UnboundedReceiver<MqttMessage>>,
    event_loop_task: Option<JoinHandle<()>>,
}

impl RumqttcClient {
    pub fn new(config: &Config) -> Self {
        let mut options =
            MqttOptions::new(config.client_id.clone(), config.broker.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.mqtt_username, &config.mqtt_password) {
            options.set_credentials(username, password);
        }

        Self {
            options,
            client: None,
            inbound: None,
            event_loop_task: None,
        }
    }

    fn client(&self) -> Result<&AsyncClient> {
        self.client.as_ref().ok_or(Error::NotConnected)
    }
}

/// Drive the event loop, forwarding inbound publishes until the receiver
/// side is dropped.
async fn forward_events(mut event_loop: EventLoop, tx: mpsc::UnboundedSender<MqttMessage>) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let forwarded = tx.send(MqttMessage {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                    retain: publish.retain,
                });
                if forwarded.is_err() {
                    break;
                }
            }
            // connack, pingresp, puback and friends carry nothing we need
            Ok(_) => {}
            Err(e) => {
                warn!("MQTT connection error, retrying: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    info!("MQTT event loop task exiting");
}

#[async_trait]
impl MqttClient for RumqttcClient {
    async fn connect(&mut self) -> Result<()> {
        let (client, event_loop) = AsyncClient::new(self.options.clone(), 10);
        let (tx, rx) = mpsc::unbounded_channel();

        self.event_loop_task = Some(tokio::spawn(forward_events(event_loop, tx)));
        self.client = Some(client);
        self.inbound = Some(rx);

        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.client()?.subscribe(topic, QoS::AtMostOnce).await?;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<()> {
        self.client()?
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await?;
        Ok(())
    }

    fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<MqttMessage>> {
        self.inbound.take()
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.disconnect().await?;
        }
        Ok(())
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop_task.take() {
            task.abort();
        }
    }
}

/// Recording mock for tests.
#[cfg(test)]
#[derive(Debug)]
pub struct MockMqttClient {
    pub subscriptions: Vec<String>,
    /// `(topic, payload, retain)` triples in publish order
    pub published: Vec<(String, Vec<u8>, bool)>,
    pub is_connected: bool,
    inbound_tx: mpsc::UnboundedSender<MqttMessage>,
    inbound_rx: Option<mpsc::UnboundedReceiver<MqttMessage>>,
}

#[cfg(test)]
#[async_trait]
impl MqttClient for MockMqttClient {
    async fn connect(&mut self) -> Result<()> {
        self.is_connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<()> {
        self.published
            .push((topic.to_string(), payload.to_vec(), retain));
        Ok(())
    }

    fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<MqttMessage>> {
        self.inbound_rx.take()
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.is_connected = false;
        Ok(())
    }
}

#[cfg(test)]
impl MockMqttClient {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            subscriptions: Vec::new(),
            published: Vec::new(),
            is_connected: false,
            inbound_tx,
            inbound_rx: Some(inbound_rx),
        }
    }

    /// Feed a message into the inbound stream, as the broker would.
    pub fn inject(&self, msg: MqttMessage) {
        let _ = self.inbound_tx.send(msg);
    }

    /// Payloads published to `topic`, decoded as UTF-8, in publish order.
    pub fn payloads_for(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, p, _)| String::from_utf8_lossy(p).into_owned())
            .collect()
    }
}
