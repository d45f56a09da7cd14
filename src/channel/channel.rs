use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::messages::{SimulationId, SimulationSynchronizationEvent};
use crate::participant::{ParticipantId, SimulationParticipant};

/// One running simulation and the set of participants currently joined.
///
/// The member set is mutated from both the join path and the disconnect
/// path, so every access goes through the mutex.
#[derive(Debug)]
pub struct SimulationChannel {
    simulation_id: SimulationId,
    members: Mutex<HashMap<ParticipantId, Arc<SimulationParticipant>>>,
}

impl SimulationChannel {
    pub fn new(simulation_id: impl Into<SimulationId>) -> Self {
        Self {
            simulation_id: simulation_id.into(),
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn simulation_id(&self) -> &str {
        &self.simulation_id
    }

    /// Add a participant to the member set and record the membership on
    /// the participant. Idempotent for a participant already joined.
    pub fn add_member(&self, participant: Arc<SimulationParticipant>) {
        participant.join_channel(self);
        self.members
            .lock()
            .unwrap()
            .insert(participant.id().to_string(), participant);
    }

    /// Remove a participant from the member set. A no-op for non-members.
    pub fn remove_member(&self, participant_id: &str) {
        self.members.lock().unwrap().remove(participant_id);
    }

    pub fn contains_member(&self, participant_id: &str) -> bool {
        self.members.lock().unwrap().contains_key(participant_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().unwrap().is_empty()
    }

    /// Deliver an event to every current member's session, fire-and-forget.
    ///
    /// The member set is snapshotted at call time: a participant added
    /// afterwards does not receive this event. Each member's deliveries
    /// stay in FIFO order; no order is guaranteed across members.
    pub fn broadcast_to_members(
        &self,
        event: SimulationSynchronizationEvent,
        payload: Option<Value>,
    ) {
        let members: Vec<_> = self.members.lock().unwrap().values().cloned().collect();
        for member in members {
            member.notify_self(event, payload.clone());
        }
    }
}
