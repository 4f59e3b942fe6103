//! Shared test utilities for crewplan integration tests.
//!
//! This module provides:
//! - `TestHarness`: an in-memory application plus seeding helpers
//! - Builders for schedule requests and configurations

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{day, TestHarness};
