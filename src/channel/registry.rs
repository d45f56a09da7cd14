use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::channel::channel::SimulationChannel;
use crate::messages::SimulationId;

/// All live channels, keyed by simulation id.
///
/// A channel exists from the first join for its id until its member set
/// empties; emptiness is the only deletion trigger. Lookups and creation
/// share one lock, so concurrent joins for the same id observe a single
/// channel instance.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<SimulationId, Arc<SimulationChannel>>>,
}

impl ChannelRegistry {
    /// The channel for `simulation_id`, created on first use.
    pub fn get_or_create(&self, simulation_id: &str) -> Arc<SimulationChannel> {
        self.channels
            .lock()
            .unwrap()
            .entry(simulation_id.to_string())
            .or_insert_with(|| Arc::new(SimulationChannel::new(simulation_id)))
            .clone()
    }

    pub fn get(&self, simulation_id: &str) -> Option<Arc<SimulationChannel>> {
        self.channels.lock().unwrap().get(simulation_id).cloned()
    }

    /// Remove a participant from a channel and reclaim the channel once
    /// empty. Already-enqueued deliveries to the member are unaffected.
    pub fn remove_member(&self, simulation_id: &str, participant_id: &str) {
        let mut channels = self.channels.lock().unwrap();
        if let Some(channel) = channels.get(simulation_id) {
            channel.remove_member(participant_id);
            if channel.is_empty() {
                channels.remove(simulation_id);
                debug!("reclaimed empty channel for simulation {simulation_id}");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.lock().unwrap().is_empty()
    }
}
