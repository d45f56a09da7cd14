//! The `broker` module wraps publish/subscribe access to the platform's
//! external message broker.
//!
//! Only the broker's observable contract is modelled here: named topics,
//! at-least-once delivery, and per-topic ordering. Messages arriving from
//! the broker connection are routed to every local subscriber whose topic
//! pattern matches.

pub mod client;
pub mod message;
pub mod subscription;
pub mod topic;

pub use client::{BrokerClient, BrokerStub};
pub use subscription::Subscription;

#[cfg(test)]
mod tests;
