//! Service modules for the vendor matching workflow

pub mod matcher;

pub use matcher::{CompletionHook, MatchError, MatchSettings, SearchHit, VendorMatcher};
