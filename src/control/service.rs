use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::broker::{BrokerClient, Subscription};
use crate::channel::ChannelRegistry;
use crate::messages::{
    SimulationConfig, SimulationId, SimulationStatus, SimulationSynchronizationEvent, StatusChange,
};
use crate::participant::SimulationParticipant;
use crate::transport::TransportSession;
use crate::utils::GridError;

/// Queue the platform consumes simulation start requests from. The broker
/// replies on the same queue with the assigned simulation id.
pub const START_SIMULATION_TOPIC: &str = "/queue/goss.gridappsd.process.request.simulation";

/// Base topic for per-simulation status logs, scoped as `<topic>.<id>`.
pub const SIMULATION_STATUS_TOPIC: &str = "/topic/goss.gridappsd.simulation.log";

/// Wildcard topic covering output from every running simulation.
pub const SIMULATION_OUTPUT_TOPIC: &str = "/topic/goss.gridappsd.simulation.output.>";

const START_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A start request published to the broker and not yet answered with an id.
#[derive(Debug, Clone)]
struct PendingStart {
    requested_at: i64,
}

/// Process-wide façade over the simulation platform.
///
/// One instance is constructed at process start, holds the broker
/// connection, and is passed around as an `Arc` handle. Observed session
/// states run REQUESTED → STARTED → RUNNING ⇄ PAUSED → STOPPED with ERROR
/// reachable from any non-terminal state; everything past STARTED arrives
/// via status messages and is relayed without validation.
pub struct SimulationControlService {
    broker: BrokerClient,
    channels: Arc<ChannelRegistry>,
    pending_starts: Mutex<VecDeque<PendingStart>>,
    active_simulations: Mutex<HashMap<SimulationId, SimulationStatus>>,
    status_relays: Mutex<HashMap<SimulationId, Subscription>>,
}

impl SimulationControlService {
    pub fn new(broker: BrokerClient) -> Arc<Self> {
        Arc::new(Self {
            broker,
            channels: Arc::new(ChannelRegistry::default()),
            pending_starts: Mutex::new(VecDeque::new()),
            active_simulations: Mutex::new(HashMap::new()),
            status_relays: Mutex::new(HashMap::new()),
        })
    }

    /// Whether the broker connection is currently established.
    pub fn is_active(&self) -> bool {
        self.broker.is_active()
    }

    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    /// Latest status recorded for a simulation, if any.
    pub fn simulation_status(&self, simulation_id: &str) -> Option<SimulationStatus> {
        self.active_simulations
            .lock()
            .unwrap()
            .get(simulation_id)
            .copied()
    }

    /// Publish a start request for the given configuration.
    ///
    /// The authored start time is rewritten to epoch milliseconds; the
    /// platform requires numeric time, not a formatted date. The assigned
    /// simulation id arrives asynchronously; see [`on_simulation_started`].
    ///
    /// [`on_simulation_started`]: Self::on_simulation_started
    pub fn start_simulation(&self, config: &SimulationConfig) -> Result<(), GridError> {
        let payload = build_start_payload(config)?;
        self.pending_starts.lock().unwrap().push_back(PendingStart {
            requested_at: chrono::Utc::now().timestamp_millis(),
        });
        if let Err(e) = self.broker.publish(START_SIMULATION_TOPIC, payload.to_string()) {
            self.pending_starts.lock().unwrap().pop_back();
            return Err(e);
        }
        Ok(())
    }

    /// Invoke `handler` with the simulation id each time the broker
    /// acknowledges a start request. The id also resolves the oldest
    /// pending start into the active-simulation table.
    pub fn on_simulation_started<F>(self: &Arc<Self>, handler: F) -> Result<Subscription, GridError>
    where
        F: FnMut(SimulationId) + Send + 'static,
    {
        let (subscription, mut messages) = self.broker.subscribe(START_SIMULATION_TOPIC)?;
        let service = self.clone();
        let mut handler = handler;
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                service.resolve_pending_start(&message.payload);
                handler(message.payload);
            }
        });
        Ok(subscription)
    }

    /// Invoke `handler` with each raw status line for one simulation, in
    /// delivery order.
    pub fn on_simulation_status_log_received<F>(
        self: &Arc<Self>,
        simulation_id: &str,
        handler: F,
    ) -> Result<Subscription, GridError>
    where
        F: FnMut(String) + Send + 'static,
    {
        let (subscription, mut messages) = self.broker.subscribe(&scoped_status_topic(simulation_id))?;
        let mut handler = handler;
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                handler(message.payload);
            }
        });
        Ok(subscription)
    }

    /// Invoke `handler` with the parsed body of each output message across
    /// all running simulations. A malformed body surfaces the parse error
    /// to the handler for that one message; the subscription continues.
    pub fn on_simulation_output_received<F>(
        self: &Arc<Self>,
        handler: F,
    ) -> Result<Subscription, GridError>
    where
        F: FnMut(Result<Value, GridError>) + Send + 'static,
    {
        let (subscription, mut messages) = self.broker.subscribe(SIMULATION_OUTPUT_TOPIC)?;
        let mut handler = handler;
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                handler(serde_json::from_str::<Value>(&message.payload).map_err(GridError::from));
            }
        });
        Ok(subscription)
    }

    /// Build a participant around a freshly connected session and surface
    /// its typed notifications: join requests resolve or create the
    /// channel and register the member; status changes are recorded.
    pub fn attach_participant(
        self: &Arc<Self>,
        session: Arc<TransportSession>,
    ) -> Arc<SimulationParticipant> {
        let participant = SimulationParticipant::new(session, self.channels.clone());

        let mut join_requests = participant.request_to_join();
        let service = self.clone();
        let joining = participant.clone();
        tokio::spawn(async move {
            while let Some(simulation_id) = join_requests.recv().await {
                service.join_simulation_channel(&joining, &simulation_id);
            }
        });

        let mut status_changes = participant.status_changes();
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                match status_changes.recv().await {
                    Ok(change) => service.record_status(change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("status feed lagged, skipped {skipped} updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        participant
    }

    /// Route engine output to the channel named by the topic's final
    /// segment, as `simulation-output` frames to its members.
    pub fn start_output_relay(self: &Arc<Self>) -> Result<Subscription, GridError> {
        let (subscription, mut messages) = self.broker.subscribe(SIMULATION_OUTPUT_TOPIC)?;
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                let simulation_id = message.topic.rsplit('.').next().unwrap_or("");
                match serde_json::from_str::<Value>(&message.payload) {
                    Ok(output) => {
                        if let Some(channel) = service.channels.get(simulation_id) {
                            channel.broadcast_to_members(
                                SimulationSynchronizationEvent::SimulationOutput,
                                Some(output),
                            );
                        }
                    }
                    Err(e) => warn!("dropping malformed output for {simulation_id}: {e}"),
                }
            }
        });
        Ok(subscription)
    }

    fn join_simulation_channel(
        self: &Arc<Self>,
        participant: &Arc<SimulationParticipant>,
        simulation_id: &str,
    ) {
        // leave the old channel first when switching simulations
        if let Some(previous) = participant.current_channel() {
            if previous != simulation_id {
                self.channels.remove_member(&previous, participant.id());
            }
        }
        let channel = self.channels.get_or_create(simulation_id);
        channel.add_member(participant.clone());
        info!("{} joined simulation {simulation_id}", participant.id());

        if let Err(e) = self.ensure_status_relay(simulation_id) {
            warn!("could not subscribe status relay for {simulation_id}: {e}");
        }
    }

    /// Subscribe the status topic for `simulation_id` once and fan its
    /// messages out to the channel members as `simulation-status` frames.
    fn ensure_status_relay(self: &Arc<Self>, simulation_id: &str) -> Result<(), GridError> {
        let mut relays = self.status_relays.lock().unwrap();
        if relays.contains_key(simulation_id) {
            return Ok(());
        }
        let (subscription, mut messages) = self.broker.subscribe(&scoped_status_topic(simulation_id))?;
        relays.insert(simulation_id.to_string(), subscription);

        let service = self.clone();
        let simulation_id = simulation_id.to_string();
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                if let Some(channel) = service.channels.get(&simulation_id) {
                    channel.broadcast_to_members(
                        SimulationSynchronizationEvent::SimulationStatus,
                        Some(relay_payload(&message.payload)),
                    );
                }
            }
        });
        Ok(())
    }

    fn resolve_pending_start(&self, simulation_id: &str) {
        let resolved = self.pending_starts.lock().unwrap().pop_front();
        if let Some(pending) = resolved {
            let elapsed = chrono::Utc::now().timestamp_millis() - pending.requested_at;
            info!("simulation {simulation_id} started {elapsed}ms after request");
        }
        self.active_simulations
            .lock()
            .unwrap()
            .insert(simulation_id.to_string(), SimulationStatus::Started);
    }

    fn record_status(&self, change: StatusChange) {
        // transparent relay of engine state; transitions are not validated
        self.active_simulations
            .lock()
            .unwrap()
            .insert(change.simulation_id, change.status);
    }
}

fn scoped_status_topic(simulation_id: &str) -> String {
    format!("{SIMULATION_STATUS_TOPIC}.{simulation_id}")
}

/// Status log bodies are usually JSON; plain strings are wrapped so they
/// survive framing.
fn relay_payload(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn build_start_payload(config: &SimulationConfig) -> Result<Value, GridError> {
    let epoch = start_time_to_epoch_millis(&config.simulation_config.start_time)?;
    let mut payload = serde_json::to_value(config)?;
    payload["simulation_config"]["start_time"] = Value::from(epoch);
    Ok(payload)
}

/// Convert an authored start time to epoch milliseconds. Dashes are
/// normalized to slashes before parsing; the instant is interpreted as
/// UTC.
pub(crate) fn start_time_to_epoch_millis(start_time: &str) -> Result<i64, GridError> {
    let normalized = start_time.replace('-', "/");
    let parsed = NaiveDateTime::parse_from_str(&normalized, START_TIME_FORMAT).map_err(|source| {
        GridError::InvalidStartTime {
            value: start_time.to_string(),
            source,
        }
    })?;
    Ok(parsed.and_utc().timestamp_millis())
}
