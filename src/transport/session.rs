use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::warn;
use tungstenite::protocol::Message as WsMessage;

use crate::messages::SimulationSynchronizationEvent;
use crate::transport::message::EventFrame;

pub type SessionId = String;

/// All currently connected sessions.
///
/// Holds only each session's outbound sender, so transport-level broadcast
/// reaches every connection regardless of channel membership.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, UnboundedSender<WsMessage>>>,
}

impl SessionRegistry {
    fn insert(&self, id: SessionId, sender: UnboundedSender<WsMessage>) {
        self.sessions.lock().unwrap().insert(id, sender);
    }

    fn remove(&self, id: &str) {
        self.sessions.lock().unwrap().remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }

    /// Enqueue a message to every session except the sending one.
    fn broadcast_except(&self, sender_id: &str, message: WsMessage) {
        let sessions = self.sessions.lock().unwrap();
        for (id, sender) in sessions.iter() {
            if id != sender_id {
                let _ = sender.send(message.clone());
            }
        }
    }
}

/// One physical client connection.
///
/// Wraps the outbound sender for the socket, a per-event listener registry
/// fed by the read loop, and a disconnect signal that fires exactly once.
/// A session is registered for broadcast from construction until it
/// disconnects.
#[derive(Debug)]
pub struct TransportSession {
    id: SessionId,
    outbound: UnboundedSender<WsMessage>,
    registry: Arc<SessionRegistry>,
    listeners: Mutex<HashMap<SimulationSynchronizationEvent, Vec<UnboundedSender<Value>>>>,
    disconnected: watch::Sender<bool>,
}

impl TransportSession {
    pub fn new(
        id: SessionId,
        outbound: UnboundedSender<WsMessage>,
        registry: Arc<SessionRegistry>,
    ) -> Arc<Self> {
        registry.insert(id.clone(), outbound.clone());
        Arc::new(Self {
            id,
            outbound,
            registry,
            listeners: Mutex::new(HashMap::new()),
            disconnected: watch::Sender::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_disconnected(&self) -> bool {
        *self.disconnected.borrow()
    }

    /// Register a listener for an event. Each call returns a fresh queue
    /// that sees every future occurrence of the event and completes on
    /// disconnect. After disconnect the queue is already completed.
    pub fn listen(&self, event: SimulationSynchronizationEvent) -> UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_disconnected() {
            self.listeners.lock().unwrap().entry(event).or_default().push(tx);
        }
        rx
    }

    /// Deliver an incoming event to every listener registered for it,
    /// pruning listeners whose receiving side is gone.
    pub fn dispatch(&self, event: SimulationSynchronizationEvent, payload: Value) {
        if self.is_disconnected() {
            return;
        }
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(entries) = listeners.get_mut(&event) {
            entries.retain(|tx| tx.send(payload.clone()).is_ok());
        }
    }

    /// Enqueue a frame to this session only. Fire-and-forget; a no-op
    /// after disconnect.
    pub fn send(&self, event: SimulationSynchronizationEvent, payload: Option<Value>) {
        if self.is_disconnected() {
            return;
        }
        if let Some(message) = encode_frame(event, payload) {
            let _ = self.outbound.send(message);
        }
    }

    /// Enqueue a frame to every other connected session.
    pub fn broadcast(&self, event: SimulationSynchronizationEvent, payload: Option<Value>) {
        if self.is_disconnected() {
            return;
        }
        if let Some(message) = encode_frame(event, payload) {
            self.registry.broadcast_except(&self.id, message);
        }
    }

    /// Tear the session down: complete every listener queue and leave the
    /// registry. Idempotent; only the first call has any effect.
    pub fn disconnect(&self) {
        let newly_disconnected = self.disconnected.send_if_modified(|disconnected| {
            if *disconnected {
                false
            } else {
                *disconnected = true;
                true
            }
        });
        if !newly_disconnected {
            return;
        }
        self.listeners.lock().unwrap().clear();
        self.registry.remove(&self.id);
    }

    /// Resolves once the session has disconnected; immediately if it
    /// already has.
    pub async fn on_disconnected(&self) {
        let mut signal = self.disconnected.subscribe();
        // wait_for only errors when the sender is dropped, which cannot
        // happen while `self` is alive
        let _ = signal.wait_for(|disconnected| *disconnected).await;
    }
}

fn encode_frame(
    event: SimulationSynchronizationEvent,
    payload: Option<Value>,
) -> Option<WsMessage> {
    let frame = EventFrame { event, payload };
    match serde_json::to_string(&frame) {
        Ok(json) => Some(WsMessage::text(json)),
        Err(e) => {
            warn!("failed to serialize outbound frame: {e}");
            None
        }
    }
}
