use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::warn;

use crate::channel::{ChannelRegistry, SimulationChannel};
use crate::messages::{SimulationId, SimulationSynchronizationEvent, StatusChange};
use crate::transport::TransportSession;

pub type ParticipantId = String;

/// Capacity of the status multicast. A subscriber that falls this far
/// behind starts skipping updates (RecvError::Lagged).
const STATUS_CHANNEL_CAPACITY: usize = 64;

/// A client that has connected and may join a running simulation.
///
/// Owns its transport session exclusively and belongs to at most one
/// channel at a time; membership is a simulation id resolved through the
/// channel registry, never an owning pointer. Disconnection is terminal:
/// it completes every sequence handed out by this participant, clears the
/// session's listeners, and removes the participant from its channel.
/// After that, every operation is a silent no-op.
pub struct SimulationParticipant {
    id: ParticipantId,
    session: Arc<TransportSession>,
    channels: Arc<ChannelRegistry>,
    current_channel: Mutex<Option<SimulationId>>,
    status_sender: Mutex<Option<broadcast::Sender<StatusChange>>>,
}

impl std::fmt::Debug for SimulationParticipant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationParticipant")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl SimulationParticipant {
    pub fn new(session: Arc<TransportSession>, channels: Arc<ChannelRegistry>) -> Arc<Self> {
        let (status_sender, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);

        let participant = Arc::new(Self {
            id: session.id().to_string(),
            session: session.clone(),
            channels,
            current_channel: Mutex::new(None),
            status_sender: Mutex::new(Some(status_sender.clone())),
        });

        // parse incoming simulation-status events into the status feed
        let mut status_events = session.listen(SimulationSynchronizationEvent::SimulationStatus);
        tokio::spawn(async move {
            while let Some(payload) = status_events.recv().await {
                match serde_json::from_value::<StatusChange>(payload) {
                    Ok(change) => {
                        let _ = status_sender.send(change);
                    }
                    Err(e) => warn!("ignoring malformed status payload: {e}"),
                }
            }
        });

        // disconnection is the single teardown trigger
        let teardown = participant.clone();
        tokio::spawn(async move {
            teardown.session.on_disconnected().await;
            teardown.handle_disconnect();
        });

        participant
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_disconnected(&self) -> bool {
        self.session.is_disconnected()
    }

    /// Record the channel this participant now belongs to. Idempotent for
    /// the same channel; replaces the membership for a different one. The
    /// caller removes the participant from the old channel first.
    pub fn join_channel(&self, channel: &SimulationChannel) {
        if self.is_disconnected() {
            return;
        }
        *self.current_channel.lock().unwrap() = Some(channel.simulation_id().to_string());
    }

    /// The simulation id of the channel this participant belongs to.
    pub fn current_channel(&self) -> Option<SimulationId> {
        self.current_channel.lock().unwrap().clone()
    }

    /// A fresh queue of payloads for `event`. Every call gets its own
    /// independent copy of each future occurrence; the queue completes on
    /// disconnect.
    pub fn listen_for(&self, event: SimulationSynchronizationEvent) -> UnboundedReceiver<Value> {
        self.session.listen(event)
    }

    /// At most one payload for `event`; `None` if the participant
    /// disconnects first.
    pub async fn listen_once(&self, event: SimulationSynchronizationEvent) -> Option<Value> {
        let mut events = self.session.listen(event);
        events.recv().await
    }

    /// Send an event to this participant's own session only.
    pub fn notify_self(&self, event: SimulationSynchronizationEvent, payload: Option<Value>) {
        self.session.send(event, payload);
    }

    /// Send an event to every *other* connected session, regardless of
    /// channel membership. Distinct from channel-scoped fan-out, which is
    /// [`SimulationChannel::broadcast_to_members`].
    pub fn broadcast(&self, event: SimulationSynchronizationEvent, payload: Option<Value>) {
        self.session.broadcast(event, payload);
    }

    /// Status updates reported by this client. The feed is shared and hot:
    /// subscribers see updates from subscription time onward, and the feed
    /// closes on disconnect.
    pub fn status_changes(&self) -> broadcast::Receiver<StatusChange> {
        match self.status_sender.lock().unwrap().as_ref() {
            Some(sender) => sender.subscribe(),
            None => closed_status_receiver(),
        }
    }

    /// Simulation ids this client asks to join, one per join-request
    /// event. Completes on disconnect.
    pub fn request_to_join(&self) -> UnboundedReceiver<SimulationId> {
        let mut events = self
            .session
            .listen(SimulationSynchronizationEvent::SimulationJoinRequest);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(payload) = events.recv().await {
                if let Value::String(simulation_id) = payload {
                    if tx.send(simulation_id).is_err() {
                        break;
                    }
                } else {
                    warn!("ignoring join request with non-string payload");
                }
            }
        });
        rx
    }

    /// Resolves exactly once, when the underlying session disconnects.
    pub async fn on_disconnected(&self) {
        self.session.on_disconnected().await;
    }

    fn handle_disconnect(&self) {
        // dropping the sender closes every status_changes receiver once
        // the parser task has also wound down
        self.status_sender.lock().unwrap().take();
        if let Some(simulation_id) = self.current_channel.lock().unwrap().take() {
            self.channels.remove_member(&simulation_id, &self.id);
        }
    }
}

fn closed_status_receiver() -> broadcast::Receiver<StatusChange> {
    let (sender, receiver) = broadcast::channel(1);
    drop(sender);
    receiver
}
