//! The `messages` module holds the message contracts shared between the
//! coordination layer, the browser clients, and the broker.
//!
//! It defines the closed set of client-facing event names, the simulation
//! status vocabulary, and the start-request configuration model.

pub mod events;
pub mod simulation;

pub use events::SimulationSynchronizationEvent;
pub use simulation::{
    SimulationConfig, SimulationId, SimulationParameters, SimulationStatus, StatusChange,
};
