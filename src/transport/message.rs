use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::SimulationSynchronizationEvent;

/// A single message on a client connection, in either direction.
///
/// Every frame carries an event name from the closed enumeration and an
/// optional payload the coordination layer treats as opaque JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: SimulationSynchronizationEvent,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}
