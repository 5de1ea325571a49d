//! Shared test utilities for ordarchive integration tests.
//!
//! - `TestHarness`: an `IntakeService` over an in-memory database and an
//!   in-memory blob store whose failures can be switched on
//! - builders for order submissions

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{MemoryStore, TestHarness};
