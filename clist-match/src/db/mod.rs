//! Database access for clist-match
//!
//! Thin query functions over the shared SQLite store. Writes that must be
//! atomic take a generic executor so callers can run them inside a transaction.

pub mod match_sessions;
pub mod mentions;
pub mod preview_sessions;
pub mod vendors;
