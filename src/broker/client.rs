use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tracing::{error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::BrokerMessage;
use crate::broker::subscription::Subscription;
use crate::broker::topic::{Topic, topic_matches};
use crate::utils::GridError;

/// Client side of the broker connection.
///
/// Exactly one instance is connected per process; handles are cheap clones
/// sharing that connection. Publishing enqueues a send and subscribing
/// registers a local route; neither blocks the caller beyond that.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    inner: Arc<BrokerInner>,
}

#[derive(Debug)]
pub(crate) struct BrokerInner {
    outbound: UnboundedSender<BrokerMessage>,
    topics: Mutex<HashMap<String, Topic>>,
    next_subscription: AtomicU64,
    connected: AtomicBool,
}

impl BrokerInner {
    fn new(outbound: UnboundedSender<BrokerMessage>) -> Self {
        Self {
            outbound,
            topics: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(0),
            connected: AtomicBool::new(true),
        }
    }

    /// Route an inbound message to every subscription whose pattern
    /// matches its topic.
    fn route(&self, message: BrokerMessage) {
        let mut topics = self.topics.lock().unwrap();
        for topic in topics.values_mut() {
            if topic_matches(&topic.name, &message.topic) {
                topic.deliver(&message);
            }
        }
    }

    pub(crate) fn unsubscribe(&self, pattern: &str, id: u64) {
        let mut topics = self.topics.lock().unwrap();
        if let Some(topic) = topics.get_mut(pattern) {
            topic.unsubscribe(id);
            if topic.is_empty() {
                topics.remove(pattern);
            }
        }
    }

    /// Connection loss: flip to inactive and complete every local
    /// subscription by dropping its sender.
    fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.topics.lock().unwrap().clear();
    }
}

impl BrokerClient {
    /// Connect to the broker's WebSocket endpoint and spawn the send and
    /// receive pumps.
    pub async fn connect(url: &str) -> Result<Self, GridError> {
        let (ws_stream, _) = connect_async(url).await?;
        info!("connected to broker at {url}");

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<BrokerMessage>();
        let inner = Arc::new(BrokerInner::new(outbound_tx));

        let writer_inner = inner.clone();
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("failed to serialize broker message: {e}");
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(WsMessage::text(text)).await {
                    error!("broker send failed: {e}");
                    break;
                }
            }
            writer_inner.shutdown();
        });

        let reader_inner = inner.clone();
        tokio::spawn(async move {
            while let Some(Ok(message)) = ws_receiver.next().await {
                if message.is_text() {
                    if let Ok(text) = message.to_text() {
                        match serde_json::from_str::<BrokerMessage>(text) {
                            Ok(parsed) => reader_inner.route(parsed),
                            Err(e) => warn!("ignoring malformed broker frame: {e}"),
                        }
                    }
                }
            }
            warn!("broker connection closed");
            reader_inner.shutdown();
        });

        Ok(Self { inner })
    }

    /// Build a loopback client with no network attached. The returned
    /// [`BrokerStub`] plays the part of the broker: it observes published
    /// messages and injects deliveries.
    pub fn in_memory() -> (Self, BrokerStub) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(BrokerInner::new(outbound_tx));
        let stub = BrokerStub {
            inner: inner.clone(),
            published: Mutex::new(outbound_rx),
        };
        (Self { inner }, stub)
    }

    /// Whether the broker connection is currently established.
    pub fn is_active(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Publish a payload to a topic. Fails if the connection is down; no
    /// retry is attempted here.
    pub fn publish(&self, topic: &str, payload: impl Into<String>) -> Result<(), GridError> {
        if !self.is_active() {
            return Err(GridError::BrokerInactive);
        }
        let message = BrokerMessage {
            topic: topic.to_string(),
            payload: payload.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        self.inner
            .outbound
            .send(message)
            .map_err(|e| GridError::BrokerSend(e.to_string()))
    }

    /// Subscribe to a topic pattern. Returns the cancellation handle and
    /// the receiving end of the subscription's queue; the queue completes
    /// on cancellation or connection loss.
    pub fn subscribe(
        &self,
        pattern: &str,
    ) -> Result<(Subscription, UnboundedReceiver<BrokerMessage>), GridError> {
        if !self.is_active() {
            return Err(GridError::BrokerInactive);
        }
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .topics
            .lock()
            .unwrap()
            .entry(pattern.to_string())
            .or_insert_with(|| Topic::new(pattern))
            .subscribe(id, tx);
        let subscription = Subscription::new(id, pattern.to_string(), Arc::downgrade(&self.inner));
        Ok((subscription, rx))
    }
}

/// The far end of an [`BrokerClient::in_memory`] loopback.
#[derive(Debug)]
pub struct BrokerStub {
    inner: Arc<BrokerInner>,
    published: Mutex<UnboundedReceiver<BrokerMessage>>,
}

impl BrokerStub {
    /// Inject a message as if the broker delivered it.
    pub fn deliver(&self, topic: &str, payload: &str) {
        self.inner.route(BrokerMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
    }

    /// Pop the next message the client has published, if any.
    pub fn try_next_published(&self) -> Option<BrokerMessage> {
        self.published.lock().unwrap().try_recv().ok()
    }

    /// Drop the connection from the broker side.
    pub fn close(&self) {
        self.inner.shutdown();
    }
}
