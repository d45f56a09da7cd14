//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `gridsync` application.
//!
//! This module centralizes the crate-wide error type and the tracing
//! initialization helper.

pub mod error;
pub mod logging;

pub use error::GridError;
