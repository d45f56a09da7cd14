//! The `control` module is responsible for communicating with the platform
//! to process simulations.
//!
//! It issues start requests to the broker, subscribes to the broker's
//! status and output topics on behalf of active channels, and tracks the
//! mapping from an in-flight start request to the simulation id the broker
//! assigns.

pub mod service;

pub use service::{
    SIMULATION_OUTPUT_TOPIC, SIMULATION_STATUS_TOPIC, START_SIMULATION_TOPIC,
    SimulationControlService,
};
