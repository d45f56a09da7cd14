//! The `transport` module is responsible for handling network communication
//! with clients, primarily via WebSockets.
//!
//! It defines the framing used between clients and the server, the
//! per-connection session state, and the WebSocket server itself, which
//! accepts connections and forwards client frames into the coordination
//! layer.

pub mod message;
pub mod session;
pub mod websocket;

pub use session::{SessionRegistry, TransportSession};

#[cfg(test)]
mod tests;
