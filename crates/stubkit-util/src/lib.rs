//! Shared utilities for stubkit.
//!
//! This crate provides common utilities used across the stubkit workspace:
//! - The harness error type
//! - Logging setup with tracing
//! - Collision-resistant resource names

pub mod error;
pub mod log;
pub mod name;

pub use error::{HarnessError, StubResult};
pub use name::make_unique_name;
