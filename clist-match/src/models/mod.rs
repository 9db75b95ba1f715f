//! Data models for clist-match

pub mod match_session;

pub use match_session::{
    MatchSession, MatchSessionView, MatchStep, MatchSummary, MentionOutcome, MentionRecord, Notice,
};
