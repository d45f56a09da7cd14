//! The `participant` module defines the logical identity of one connected
//! client inside the coordination layer.
//!
//! A participant wraps one transport session, surfaces the client's typed
//! event streams, and tears its own membership down when the session
//! disconnects.

pub mod participant;

pub use participant::{ParticipantId, SimulationParticipant};
