//! # Courtney's List Common Library
//!
//! Shared code for Courtney's List services including:
//! - Database schema, models and initialization
//! - Match event types and the EventBus
//! - Configuration loading and root folder resolution
//! - SSE helpers
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod uuid_utils;

pub use error::{Error, Result};
