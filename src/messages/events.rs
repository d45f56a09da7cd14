use serde::{Deserialize, Serialize};

/// Event names used on the client connection.
///
/// This is a closed enumeration: every message crossing the client boundary
/// is tagged with one of these names. Payloads are opaque JSON beyond the
/// shapes the coordination layer itself consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationSynchronizationEvent {
    /// A simulation status update, carrying a [`StatusChange`] payload.
    ///
    /// [`StatusChange`]: super::simulation::StatusChange
    SimulationStatus,
    /// A client signalling intent to join a simulation channel. The payload
    /// is the simulation id as a string.
    SimulationJoinRequest,
    /// Engine output data relayed to channel members.
    SimulationOutput,
    /// Engine-specific control commands issued by a client.
    SimulationControl,
}

impl SimulationSynchronizationEvent {
    /// The wire name of this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimulationStatus => "simulation-status",
            Self::SimulationJoinRequest => "simulation-join-request",
            Self::SimulationOutput => "simulation-output",
            Self::SimulationControl => "simulation-control",
        }
    }
}
