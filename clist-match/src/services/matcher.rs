//! Vendor matcher
//!
//! Drives match sessions against the store: exact-match checks, search,
//! create/copy/confirm writes, skips and completion.
//!
//! Each session sits behind its own async mutex, so actions on one session run
//! one at a time and a close waits for an in-flight action to finish. Vendor
//! insert and mention update commit in a single transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clist_common::db::{
    get_setting, retry_on_lock, NewVendor, PendingVendorMention, Vendor, MAX_LOCK_WAIT_MS,
    SEARCH_RESULT_LIMIT, SESSION_IDLE_TIMEOUT_SECS,
};
use clist_common::events::{EventBus, MatchEvent, MatchResolution};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::{match_sessions, mentions, preview_sessions, vendors};
use crate::models::{MatchSession, MatchSessionView, MatchStep, MatchSummary, MentionOutcome};

/// Called once when a session reaches COMPLETE
pub type CompletionHook = Arc<dyn Fn(&MatchSummary) + Send + Sync>;

/// Errors from matcher operations
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Match session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Preview session not found: {0}")]
    PreviewSessionNotFound(Uuid),

    #[error("Vendor not found: {0}")]
    VendorNotFound(Uuid),

    #[error("Cannot {action} while session is {state}")]
    InvalidStep {
        action: &'static str,
        state: &'static str,
    },

    /// Rejected before any store call
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Create/copy/match write failed; the mention stays current with a notice
    #[error("{0}")]
    Mutation(String),

    #[error(transparent)]
    Store(#[from] clist_common::Error),
}

impl MatchError {
    fn invalid_step(action: &'static str, step: &MatchStep) -> Self {
        MatchError::InvalidStep {
            action,
            state: step.name(),
        }
    }
}

/// Runtime settings read from the `settings` table
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub search_limit: i64,
    pub max_lock_wait_ms: u64,
    /// Untouched sessions are dropped from memory after this long
    pub session_idle_timeout_secs: u64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            search_limit: 10,
            max_lock_wait_ms: 5000,
            session_idle_timeout_secs: 1800,
        }
    }
}

impl MatchSettings {
    pub async fn load(pool: &SqlitePool) -> clist_common::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            search_limit: get_setting(pool, SEARCH_RESULT_LIMIT, defaults.search_limit).await?,
            max_lock_wait_ms: get_setting(pool, MAX_LOCK_WAIT_MS, defaults.max_lock_wait_ms)
                .await?,
            session_idle_timeout_secs: get_setting(
                pool,
                SESSION_IDLE_TIMEOUT_SECS,
                defaults.session_idle_timeout_secs,
            )
            .await?,
        })
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

/// Search result for the current mention
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub vendor: Vendor,
    /// Selecting a hit outside the session community copies it first
    pub same_community: bool,
}

/// Vendor side of a match; inserts commit together with the mention update
enum MatchWrite {
    Existing(Uuid),
    Create(NewVendor),
    CopyInto { vendor: Vendor, community: String },
}

impl MatchWrite {
    fn resolution(&self) -> MatchResolution {
        match self {
            MatchWrite::Existing(_) => MatchResolution::Existing,
            MatchWrite::Create(_) => MatchResolution::Created,
            MatchWrite::CopyInto { .. } => MatchResolution::Copied,
        }
    }
}

type SessionHandle = Arc<Mutex<MatchSession>>;

/// Registry entry for a session held in memory
struct LiveSession {
    handle: SessionHandle,
    /// Unix millis of the last lookup
    last_used: AtomicI64,
}

impl LiveSession {
    fn new(session: MatchSession) -> Self {
        Self {
            handle: Arc::new(Mutex::new(session)),
            last_used: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    fn touch(&self) -> SessionHandle {
        self.last_used
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.handle.clone()
    }
}

#[derive(Clone)]
pub struct VendorMatcher {
    pool: SqlitePool,
    event_bus: EventBus,
    settings: MatchSettings,
    sessions: Arc<RwLock<HashMap<Uuid, LiveSession>>>,
    on_complete: Option<CompletionHook>,
}

impl VendorMatcher {
    pub fn new(pool: SqlitePool, event_bus: EventBus, settings: MatchSettings) -> Self {
        Self {
            pool,
            event_bus,
            settings,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            on_complete: None,
        }
    }

    pub fn with_completion_hook(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    /// Number of sessions currently held in memory
    pub async fn live_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions untouched for `max_idle` from memory
    ///
    /// Sessions with a request in flight stay. Evicted sessions are restored
    /// from `match_sessions` on their next lookup. Returns the number evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let max_idle_ms = i64::try_from(max_idle.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(max_idle_ms);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|session_id, entry| {
            let idle = entry.last_used.load(Ordering::Relaxed) <= cutoff;
            let in_use = Arc::strong_count(&entry.handle) > 1;
            if idle && !in_use {
                debug!(session_id = %session_id, "Evicting idle match session");
                false
            } else {
                true
            }
        });

        before - sessions.len()
    }

    /// Periodically evict sessions idle longer than `idle_timeout`
    pub fn spawn_idle_sweeper(&self, idle_timeout: Duration) -> JoinHandle<()> {
        let matcher = self.clone();
        let period = idle_timeout.clamp(Duration::from_secs(1), Duration::from_secs(60));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = matcher.evict_idle(idle_timeout).await;
                if evicted > 0 {
                    info!(evicted, "Evicted idle match sessions");
                }
            }
        })
    }

    /// Open a match session for a preview session
    ///
    /// The queue is `mention_ids` in the given order, or every unmatched mention
    /// of the preview session. Repeated ids keep their first position.
    /// Already-matched mentions and mentions from other preview sessions are
    /// left out.
    pub async fn open_session(
        &self,
        preview_session_id: Uuid,
        mention_ids: Option<Vec<Uuid>>,
    ) -> Result<MatchSessionView, MatchError> {
        let community = preview_sessions::get_community(&self.pool, preview_session_id)
            .await?
            .ok_or(MatchError::PreviewSessionNotFound(preview_session_id))?;

        let loaded = match mention_ids {
            Some(ids) => mentions::get_mentions(&self.pool, &ids).await?,
            None => mentions::list_unmatched(&self.pool, preview_session_id).await?,
        };

        let mut seen = HashSet::new();
        let queue: Vec<PendingVendorMention> = loaded
            .into_iter()
            .filter(|mention| {
                if !seen.insert(mention.id) {
                    warn!(mention_id = %mention.id, "Duplicate mention id in queue, skipping");
                    false
                } else if mention.session_id != preview_session_id {
                    warn!(mention_id = %mention.id, "Mention belongs to another preview session, skipping");
                    false
                } else if mention.vendor_id.is_some() {
                    warn!(mention_id = %mention.id, "Mention already matched, skipping");
                    false
                } else {
                    true
                }
            })
            .collect();

        let mut session = MatchSession::new(preview_session_id, community, queue);

        info!(
            session_id = %session.session_id,
            preview_session_id = %preview_session_id,
            community = %session.community,
            queue_len = session.queue.len(),
            "Match session opened"
        );

        self.event_bus.emit_lossy(MatchEvent::MatchSessionOpened {
            session_id: session.session_id,
            community: session.community.clone(),
            queue_len: session.queue.len(),
            timestamp: Utc::now(),
        });

        if session.is_terminal() {
            self.persist(&session).await;
            self.finish(&session).await;
        } else {
            self.check_current(&mut session).await;
            self.persist(&session).await;
            self.sessions
                .write()
                .await
                .insert(session.session_id, LiveSession::new(session.clone()));
        }

        Ok(MatchSessionView::from(&session))
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<MatchSessionView, MatchError> {
        let handle = self.session_handle(session_id).await?;
        let session = handle.lock().await;
        Ok(MatchSessionView::from(&*session))
    }

    /// Accept the exact match for the current mention
    pub async fn confirm_exact(&self, session_id: Uuid) -> Result<MatchSessionView, MatchError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;

        let vendor_id = match &session.step {
            MatchStep::ExactMatchFound { vendor } => vendor.id,
            other => return Err(MatchError::invalid_step("confirm", other)),
        };

        self.commit_match(&mut session, MatchWrite::Existing(vendor_id))
            .await
    }

    /// Search vendors in the current mention's category, across communities
    ///
    /// A blank term returns no hits without querying. Read failures are logged
    /// and reported as no hits.
    pub async fn search(&self, session_id: Uuid, term: &str) -> Result<Vec<SearchHit>, MatchError> {
        let handle = self.session_handle(session_id).await?;
        let session = handle.lock().await;
        let mention = require_no_exact_match(&session, "search")?;

        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let found = match vendors::search_vendors(
            &self.pool,
            term,
            &mention.category,
            self.settings.search_limit,
        )
        .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Vendor search failed, returning no results");
                Vec::new()
            }
        };

        debug!(session_id = %session_id, term, hits = found.len(), "Vendor search");

        Ok(found
            .into_iter()
            .map(|vendor| SearchHit {
                same_community: vendor.community == session.community,
                vendor,
            })
            .collect())
    }

    /// Match the current mention to a search hit
    ///
    /// A vendor from another community is copied into the session community
    /// and the copy is matched.
    pub async fn select_vendor(
        &self,
        session_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<MatchSessionView, MatchError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        let mention = require_no_exact_match(&session, "select a vendor")?;

        let vendor = vendors::get_vendor(&self.pool, vendor_id)
            .await?
            .ok_or(MatchError::VendorNotFound(vendor_id))?;

        if vendor.category != mention.category {
            return Err(MatchError::Validation(format!(
                "Vendor category '{}' does not match mention category '{}'",
                vendor.category, mention.category
            )));
        }

        let write = if vendor.community == session.community {
            MatchWrite::Existing(vendor.id)
        } else {
            MatchWrite::CopyInto {
                community: session.community.clone(),
                vendor,
            }
        };

        self.commit_match(&mut session, write).await
    }

    /// Create a vendor in the session community and match the current mention to it
    pub async fn create_vendor(
        &self,
        session_id: Uuid,
        name: &str,
        phone: Option<&str>,
    ) -> Result<MatchSessionView, MatchError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MatchError::Validation("Vendor name is required".to_string()));
        }
        let contact_info = phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        let mention = require_no_exact_match(&session, "create a vendor")?;

        let new_vendor = NewVendor {
            name: name.to_string(),
            category: mention.category,
            community: session.community.clone(),
            contact_info,
            ..Default::default()
        };

        self.commit_match(&mut session, MatchWrite::Create(new_vendor))
            .await
    }

    /// Leave the current mention unmatched and move on; writes nothing to the store
    pub async fn skip(&self, session_id: Uuid) -> Result<MatchSessionView, MatchError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;

        match &session.step {
            MatchStep::ExactMatchFound { .. } | MatchStep::NoExactMatch => {}
            other => return Err(MatchError::invalid_step("skip", other)),
        }

        let mention_id = session
            .record_outcome(MentionOutcome::Skipped)
            .ok_or_else(|| MatchError::invalid_step("skip", &session.step))?;

        info!(session_id = %session_id, mention_id = %mention_id, "Mention skipped");

        self.event_bus.emit_lossy(MatchEvent::MentionSkipped {
            session_id,
            mention_id,
            timestamp: Utc::now(),
        });

        self.advance(&mut session).await
    }

    pub async fn dismiss_notice(&self, session_id: Uuid) -> Result<MatchSessionView, MatchError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;

        if session.notice.is_some() {
            session.dismiss_notice();
            self.persist(&session).await;
        }

        Ok(MatchSessionView::from(&*session))
    }

    /// Dismiss a session before completion
    ///
    /// Waits for any in-flight action on the session. Closing a completed or
    /// already closed session is a no-op.
    pub async fn close_session(&self, session_id: Uuid) -> Result<MatchSessionView, MatchError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;

        if session.close() {
            self.persist(&session).await;
            self.sessions.write().await.remove(&session_id);

            let summary = session.summary();
            info!(
                session_id = %session_id,
                matched = summary.matched(),
                skipped = summary.skipped,
                unresolved = summary.unresolved,
                "Match session closed"
            );

            self.event_bus.emit_lossy(MatchEvent::MatchSessionClosed {
                session_id,
                timestamp: Utc::now(),
            });
        }

        Ok(MatchSessionView::from(&*session))
    }

    /// Live handle for a session, loading it from the store when not in memory
    async fn session_handle(&self, session_id: Uuid) -> Result<SessionHandle, MatchError> {
        if let Some(entry) = self.sessions.read().await.get(&session_id) {
            return Ok(entry.touch());
        }

        let mut session = match_sessions::load_session(&self.pool, session_id)
            .await?
            .ok_or(MatchError::SessionNotFound(session_id))?;

        if session.is_terminal() {
            return Ok(Arc::new(Mutex::new(session)));
        }

        // Interrupted between advance and the exact-match check
        if session.step == MatchStep::CheckingMatch {
            self.check_current(&mut session).await;
            self.persist(&session).await;
        }

        debug!(session_id = %session_id, "Match session restored from database");

        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .entry(session_id)
            .or_insert_with(|| LiveSession::new(session))
            .touch())
    }

    /// Exact-match lookup for the current mention; lookup failures count as no match
    async fn check_current(&self, session: &mut MatchSession) {
        let Some(mention) = session.current_mention().cloned() else {
            return;
        };

        let step = match vendors::find_exact_match(
            &self.pool,
            &mention.vendor_name,
            &mention.category,
            &session.community,
        )
        .await
        {
            Ok(Some(vendor)) => {
                debug!(mention_id = %mention.id, vendor_id = %vendor.id, "Exact match found");
                MatchStep::ExactMatchFound { vendor }
            }
            Ok(None) => MatchStep::NoExactMatch,
            Err(e) => {
                warn!(
                    mention_id = %mention.id,
                    error = %e,
                    "Exact match lookup failed, treating as no match"
                );
                MatchStep::NoExactMatch
            }
        };

        session.enter_step(step);
    }

    async fn commit_match(
        &self,
        session: &mut MatchSession,
        write: MatchWrite,
    ) -> Result<MatchSessionView, MatchError> {
        let mention_id = session
            .current_mention()
            .map(|m| m.id)
            .ok_or_else(|| MatchError::invalid_step("match", &session.step))?;
        let resolution = write.resolution();

        match self.write_match(mention_id, &write).await {
            Ok(vendor_id) => {
                session.record_outcome(MentionOutcome::Matched {
                    vendor_id,
                    resolution,
                });

                info!(
                    session_id = %session.session_id,
                    mention_id = %mention_id,
                    vendor_id = %vendor_id,
                    resolution = ?resolution,
                    "Mention matched"
                );

                self.event_bus.emit_lossy(MatchEvent::MentionMatched {
                    session_id: session.session_id,
                    mention_id,
                    vendor_id,
                    resolution,
                    timestamp: Utc::now(),
                });

                self.advance(session).await
            }
            Err(e) => {
                let message = e.to_string();

                error!(
                    session_id = %session.session_id,
                    mention_id = %mention_id,
                    error = %message,
                    "Match write failed, mention stays current"
                );

                session.set_notice(message.clone(), Some(mention_id));
                self.persist(session).await;

                self.event_bus.emit_lossy(MatchEvent::MatchActionFailed {
                    session_id: session.session_id,
                    mention_id: Some(mention_id),
                    message: message.clone(),
                    timestamp: Utc::now(),
                });

                Err(match e {
                    clist_common::Error::Conflict(msg) => MatchError::Conflict(msg),
                    _ => MatchError::Mutation(message),
                })
            }
        }
    }

    /// Optional vendor insert plus the mention update, committed together
    async fn write_match(&self, mention_id: Uuid, write: &MatchWrite) -> clist_common::Result<Uuid> {
        retry_on_lock("match_mention", self.settings.max_lock_wait_ms, || async {
            let mut tx = self.pool.begin().await?;

            let vendor_id = match write {
                MatchWrite::Existing(vendor_id) => *vendor_id,
                MatchWrite::Create(new_vendor) => {
                    vendors::insert_vendor(&mut *tx, new_vendor).await?.id
                }
                MatchWrite::CopyInto { vendor, community } => {
                    vendors::copy_to_community(&mut *tx, vendor, community)
                        .await?
                        .id
                }
            };

            mentions::set_vendor_id(&mut *tx, mention_id, vendor_id).await?;
            tx.commit().await?;

            Ok::<Uuid, clist_common::Error>(vendor_id)
        })
        .await
    }

    async fn advance(&self, session: &mut MatchSession) -> Result<MatchSessionView, MatchError> {
        let completed = session.move_to_next();

        if !completed {
            self.check_current(session).await;
        }

        self.persist(session).await;

        if completed {
            self.finish(session).await;
        }

        Ok(MatchSessionView::from(&*session))
    }

    async fn finish(&self, session: &MatchSession) {
        let summary = session.summary();

        info!(
            session_id = %session.session_id,
            total = summary.total,
            matched = summary.matched(),
            skipped = summary.skipped,
            "Match session complete"
        );

        self.event_bus.emit_lossy(MatchEvent::MatchSessionCompleted {
            session_id: session.session_id,
            matched: summary.matched(),
            skipped: summary.skipped,
            timestamp: Utc::now(),
        });

        if let Some(hook) = &self.on_complete {
            hook(&summary);
        }

        self.sessions.write().await.remove(&session.session_id);
    }

    /// Persist after a transition; failures are logged, not surfaced
    async fn persist(&self, session: &MatchSession) {
        if let Err(e) =
            match_sessions::save_session(&self.pool, session, self.settings.max_lock_wait_ms).await
        {
            error!(
                session_id = %session.session_id,
                error = %e,
                "Failed to persist match session"
            );
        }
    }
}

/// Current mention, if the session is waiting on search/create/skip
fn require_no_exact_match(
    session: &MatchSession,
    action: &'static str,
) -> Result<PendingVendorMention, MatchError> {
    match (&session.step, session.current_mention()) {
        (MatchStep::NoExactMatch, Some(mention)) => Ok(mention.clone()),
        (step, _) => Err(MatchError::invalid_step(action, step)),
    }
}
