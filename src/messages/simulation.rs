use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identifier assigned by the broker when a simulation starts.
pub type SimulationId = String;

/// Lifecycle states reported for a running simulation.
///
/// The coordination layer relays these transparently; it never validates
/// transitions between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationStatus {
    Started,
    Running,
    Paused,
    Stopped,
    Error,
}

/// A status update together with the simulation it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: SimulationStatus,
    #[serde(rename = "simulationId")]
    pub simulation_id: SimulationId,
}

/// A human-authored simulation start configuration.
///
/// Only `simulation_config.start_time` is interpreted by this layer; every
/// other field is carried through to the broker unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub simulation_config: SimulationParameters,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The nested `simulation_config` block of a start request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Start instant as authored, e.g. `"2021-06-01 00:00:00"`. Rewritten
    /// to epoch milliseconds before the request is published.
    pub start_time: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
