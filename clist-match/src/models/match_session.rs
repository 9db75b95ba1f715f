//! Vendor match workflow state machine
//!
//! A match session walks one admin through a queue of pending vendor mentions.
//! Each mention passes through:
//!
//! CHECKING_MATCH → EXACT_MATCH_FOUND | NO_EXACT_MATCH → (matched | skipped) → next mention
//!
//! After the last mention the session is COMPLETE. CLOSED marks a session the
//! admin dismissed early. There is no backwards navigation.
//!
//! This module holds no I/O; the matcher service drives it.

use chrono::{DateTime, Utc};
use clist_common::db::{PendingVendorMention, Vendor};
use clist_common::events::MatchResolution;
use clist_common::uuid_utils;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Step of the current mention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStep {
    /// Exact-match lookup pending for the current mention
    CheckingMatch,
    /// Vendor with the same name, category and community exists
    ExactMatchFound { vendor: Vendor },
    /// No exact match; search, create or skip
    NoExactMatch,
    /// Every mention has an outcome
    Complete,
    /// Dismissed before completion
    Closed,
}

impl MatchStep {
    pub fn name(&self) -> &'static str {
        match self {
            MatchStep::CheckingMatch => "CHECKING_MATCH",
            MatchStep::ExactMatchFound { .. } => "EXACT_MATCH_FOUND",
            MatchStep::NoExactMatch => "NO_EXACT_MATCH",
            MatchStep::Complete => "COMPLETE",
            MatchStep::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStep::Complete | MatchStep::Closed)
    }
}

/// Terminal outcome of one mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MentionOutcome {
    Matched {
        vendor_id: Uuid,
        resolution: MatchResolution,
    },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionRecord {
    pub mention_id: Uuid,
    #[serde(flatten)]
    pub outcome: MentionOutcome,
}

/// Dismissible notification shown after a failed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub mention_id: Option<Uuid>,
    pub raised_at: DateTime<Utc>,
}

/// Outcome counts for a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub session_id: Uuid,
    pub total: usize,
    pub matched_existing: usize,
    pub matched_created: usize,
    pub matched_copied: usize,
    pub skipped: usize,
    pub unresolved: usize,
}

impl MatchSummary {
    pub fn matched(&self) -> usize {
        self.matched_existing + self.matched_created + self.matched_copied
    }
}

/// One admin's pass over a queue of pending mentions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSession {
    pub session_id: Uuid,

    /// Survey session whose mentions are being matched
    pub preview_session_id: Uuid,

    /// Community every match must land in
    pub community: String,

    /// Loaded once at open; never re-queried
    pub queue: Vec<PendingVendorMention>,

    pub current_index: usize,

    pub step: MatchStep,

    /// Outcomes in queue order, at most one per mention
    pub outcomes: Vec<MentionRecord>,

    pub notice: Option<Notice>,

    pub started_at: DateTime<Utc>,

    pub ended_at: Option<DateTime<Utc>>,
}

impl MatchSession {
    /// New session positioned on the first mention; an empty queue is complete immediately
    pub fn new(preview_session_id: Uuid, community: String, queue: Vec<PendingVendorMention>) -> Self {
        let now = Utc::now();
        let empty = queue.is_empty();

        Self {
            session_id: uuid_utils::generate(),
            preview_session_id,
            community,
            queue,
            current_index: 0,
            step: if empty {
                MatchStep::Complete
            } else {
                MatchStep::CheckingMatch
            },
            outcomes: Vec::new(),
            notice: None,
            started_at: now,
            ended_at: if empty { Some(now) } else { None },
        }
    }

    pub fn current_mention(&self) -> Option<&PendingVendorMention> {
        if self.step.is_terminal() {
            return None;
        }
        self.queue.get(self.current_index)
    }

    /// Set the step of the current mention after the exact-match check
    pub fn enter_step(&mut self, step: MatchStep) {
        if !self.step.is_terminal() {
            self.step = step;
        }
    }

    /// Record the outcome of the current mention
    ///
    /// Returns the mention id, or `None` when there is no current mention or it
    /// already has an outcome.
    pub fn record_outcome(&mut self, outcome: MentionOutcome) -> Option<Uuid> {
        let mention_id = self.current_mention()?.id;

        if self.outcomes.iter().any(|r| r.mention_id == mention_id) {
            return None;
        }

        if let MentionOutcome::Matched { vendor_id, .. } = outcome {
            self.queue[self.current_index].vendor_id = Some(vendor_id);
        }

        self.outcomes.push(MentionRecord {
            mention_id,
            outcome,
        });

        Some(mention_id)
    }

    /// Advance by one mention
    ///
    /// Returns `true` when this call completed the session.
    pub fn move_to_next(&mut self) -> bool {
        if self.step.is_terminal() {
            return false;
        }

        self.notice = None;

        if self.current_index + 1 >= self.queue.len() {
            self.current_index = self.queue.len();
            self.step = MatchStep::Complete;
            self.ended_at = Some(Utc::now());
            true
        } else {
            self.current_index += 1;
            self.step = MatchStep::CheckingMatch;
            false
        }
    }

    pub fn set_notice(&mut self, message: String, mention_id: Option<Uuid>) {
        self.notice = Some(Notice {
            message,
            mention_id,
            raised_at: Utc::now(),
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Dismiss the session; completed sessions stay complete
    pub fn close(&mut self) -> bool {
        if self.step.is_terminal() {
            return false;
        }
        self.step = MatchStep::Closed;
        self.ended_at = Some(Utc::now());
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.step.is_terminal()
    }

    pub fn summary(&self) -> MatchSummary {
        let mut summary = MatchSummary {
            session_id: self.session_id,
            total: self.queue.len(),
            ..Default::default()
        };

        for record in &self.outcomes {
            match record.outcome {
                MentionOutcome::Matched { resolution, .. } => match resolution {
                    MatchResolution::Existing => summary.matched_existing += 1,
                    MatchResolution::Created => summary.matched_created += 1,
                    MatchResolution::Copied => summary.matched_copied += 1,
                },
                MentionOutcome::Skipped => summary.skipped += 1,
            }
        }

        summary.unresolved = summary.total - summary.matched() - summary.skipped;
        summary
    }
}

/// API representation of a match session
#[derive(Debug, Clone, Serialize)]
pub struct MatchSessionView {
    pub session_id: Uuid,
    pub preview_session_id: Uuid,
    pub community: String,
    pub state: &'static str,
    pub current_index: usize,
    pub total: usize,
    pub current_mention: Option<PendingVendorMention>,
    pub exact_match: Option<Vendor>,
    pub notice: Option<Notice>,
    pub outcomes: Vec<MentionRecord>,
    pub summary: MatchSummary,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&MatchSession> for MatchSessionView {
    fn from(session: &MatchSession) -> Self {
        let exact_match = match &session.step {
            MatchStep::ExactMatchFound { vendor } => Some(vendor.clone()),
            _ => None,
        };

        Self {
            session_id: session.session_id,
            preview_session_id: session.preview_session_id,
            community: session.community.clone(),
            state: session.step.name(),
            current_index: session.current_index,
            total: session.queue.len(),
            current_mention: session.current_mention().cloned(),
            exact_match,
            notice: session.notice.clone(),
            outcomes: session.outcomes.clone(),
            summary: session.summary(),
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}
