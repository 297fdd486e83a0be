use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::client::{MqttClient, MqttMessage};

type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// An inbound message handler registered for one exact topic.
pub type Handler = Box<dyn Fn(MqttMessage) -> HandlerFuture + Send + Sync>;

/// Routes inbound MQTT messages to per-topic handlers.
///
/// Only command topics are ever subscribed by this crate, so exact topic
/// matching is sufficient; there is no wildcard support.
#[derive(Default)]
pub struct MessageRouter {
    handlers: Mutex<HashMap<String, Handler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for messages arriving on `topic`.
    ///
    /// A later registration for the same topic replaces the earlier one.
    pub async fn add_handler(&self, topic: &str, handler: Handler) {
        let mut handlers = self.handlers.lock().await;
        handlers.insert(topic.to_string(), handler);
    }

    /// Deliver one message to its handler, if any is registered.
    pub async fn dispatch(&self, msg: MqttMessage) {
        let fut = {
            let handlers = self.handlers.lock().await;
            match handlers.get(&msg.topic) {
                Some(handler) => handler(msg),
                None => {
                    debug!("no handler for topic {}", msg.topic);
                    return;
                }
            }
        };
        fut.await;
    }
}

/// Detach the client's inbound stream and feed it through the router.
///
/// The client lock is held only while taking the receiver, so publishes
/// from other tasks never wait on the dispatcher. The returned task ends
/// when the stream closes or it is aborted.
pub fn spawn_dispatcher<C: MqttClient + 'static>(
    router: Arc<MessageRouter>,
    client: Arc<Mutex<C>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut inbound = {
            let mut client = client.lock().await;
            match client.take_inbound() {
                Some(rx) => rx,
                None => {
                    warn!("MQTT client has no inbound stream, dispatcher exiting");
                    return;
                }
            }
        };

        while let Some(msg) = inbound.recv().await {
            router.dispatch(msg).await;
        }
    })
}
