//! Leaderboard session
//!
//! A session owns one leaderboard identity and three independent state axes:
//! resolution, entry download and score upload. Every request goes through the
//! shared [`CallRegistry`]; results land when the owner pumps it.
//!
//! Completion callbacks hold only a weak reference to the session, so a
//! dropped session never sees late results. Dropping it also abandons every
//! call it still has in flight.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::LeaderboardError;
use crate::calls::{CallRegistry, Completion, IssuedCalls};
use crate::config::LeaderboardConfig;
use crate::domain::{
    CallHandle, CallKind, EventSink, LeaderboardEntry, LeaderboardHandle, LeaderboardIdentity,
    RequestScope, ResolveState, SyncEventKind, UploadMethod, UploadOutcome,
};
use crate::service::{DownloadResult, FindResult, FromPayload, PlatformService, probe_image};

/// Result delivered by [`LeaderboardSession::resolve`]
pub type ResolveResult = Result<LeaderboardHandle, LeaderboardError>;

/// Result delivered by [`LeaderboardSession::download`]
pub type EntriesResult = Result<Vec<LeaderboardEntry>, LeaderboardError>;

/// Entry window state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading,
    EntriesReady,
}

/// Score submission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    #[default]
    Idle,
    Uploading,
    Complete,
}

/// Point-in-time view of a session, for display and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardSnapshot {
    pub identity: LeaderboardIdentity,
    pub download: DownloadState,
    pub upload: UploadState,
    pub entries: Vec<LeaderboardEntry>,
    pub last_upload: Option<UploadOutcome>,
}

#[derive(Debug)]
struct SessionState {
    identity: LeaderboardIdentity,
    resolve_attempt: u64,

    download: DownloadState,
    download_generation: u64,
    /// Last download whose completion has landed; never an in-flight one
    last_download: Option<DownloadResult>,
    entries: Vec<LeaderboardEntry>,

    upload: UploadState,
    uploads_in_flight: usize,
    last_upload: Option<UploadOutcome>,

    issued: IssuedCalls,
}

impl SessionState {
    fn require_resolved(&self) -> Result<LeaderboardHandle, LeaderboardError> {
        let name = || self.identity.name.clone();
        match self.identity.state {
            ResolveState::Resolved => self
                .identity
                .resolved_handle()
                .ok_or_else(|| LeaderboardError::NotResolved(name())),
            ResolveState::Resolving => Err(LeaderboardError::Resolving(name())),
            ResolveState::NotFound => Err(LeaderboardError::NotFound(name())),
            ResolveState::Unresolved => Err(LeaderboardError::NotResolved(name())),
        }
    }

    fn settle_upload_state(&mut self) {
        self.upload = if self.uploads_in_flight > 0 {
            UploadState::Uploading
        } else if self.last_upload.is_some() {
            UploadState::Complete
        } else {
            UploadState::Idle
        };
    }

    fn settle_download_state(&mut self) {
        self.download = if self.last_download.is_some() {
            DownloadState::EntriesReady
        } else {
            DownloadState::Idle
        };
    }
}

struct Shared {
    config: LeaderboardConfig,
    service: Arc<dyn PlatformService>,
    calls: CallRegistry,
    events: EventSink,
    state: Mutex<SessionState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a callback for an issued handle and remember it for teardown
    fn track<T, F>(
        &self,
        state: &mut SessionState,
        handle: CallHandle,
        on_complete: F,
    ) -> Result<(), LeaderboardError>
    where
        T: FromPayload,
        F: FnOnce(T, bool) + Send + 'static,
    {
        self.calls.register(handle, on_complete)?;
        state.issued.track(&self.calls, handle);
        Ok(())
    }

    fn io_failure(&self, name: &str, operation: CallKind) -> LeaderboardError {
        warn!(leaderboard = %name, %operation, "leaderboard request failed");
        self.events.emit(SyncEventKind::IoFailure { operation });
        LeaderboardError::IoFailure(operation)
    }

    fn finish_resolve(&self, attempt: u64, result: FindResult, io_failure: bool) -> ResolveResult {
        let mut state = self.lock();
        if attempt != state.resolve_attempt {
            debug!(leaderboard = %state.identity.name, "ignoring superseded resolve");
            return Err(LeaderboardError::Superseded);
        }
        let name = state.identity.name.clone();

        if io_failure {
            state.identity.state = ResolveState::Unresolved;
            drop(state);
            return Err(self.io_failure(&name, CallKind::FindLeaderboard));
        }

        if !result.found {
            state.identity.handle = None;
            state.identity.state = ResolveState::NotFound;
            drop(state);
            warn!(leaderboard = %name, "leaderboard not found");
            self.events
                .emit(SyncEventKind::LeaderboardNotFound { leaderboard: name.clone() });
            return Err(LeaderboardError::NotFound(name));
        }

        state.identity.handle = Some(result.handle);
        state.identity.state = ResolveState::Resolved;
        drop(state);
        info!(leaderboard = %name, handle = result.handle.0, "leaderboard resolved");
        self.events
            .emit(SyncEventKind::LeaderboardResolved { leaderboard: name });
        Ok(result.handle)
    }

    fn finish_download(
        &self,
        generation: u64,
        result: DownloadResult,
        io_failure: bool,
    ) -> EntriesResult {
        let name = {
            let mut state = self.lock();
            if generation != state.download_generation {
                debug!(
                    leaderboard = %state.identity.name,
                    generation,
                    "ignoring superseded download"
                );
                return Err(LeaderboardError::Superseded);
            }
            if io_failure {
                state.settle_download_state();
                let name = state.identity.name.clone();
                drop(state);
                return Err(self.io_failure(&name, CallKind::DownloadEntries));
            }
            state.last_download = Some(result);
            state.identity.name.clone()
        };

        let entries = self.materialize();
        self.lock().download = DownloadState::EntriesReady;

        info!(leaderboard = %name, count = entries.len(), "entries ready");
        self.events.emit(SyncEventKind::EntriesReady {
            leaderboard: name,
            count: entries.len(),
        });
        Ok(entries)
    }

    fn finish_upload(&self, outcome: UploadOutcome, io_failure: bool) -> UploadOutcome {
        let mut state = self.lock();
        state.uploads_in_flight = state.uploads_in_flight.saturating_sub(1);
        let name = state.identity.name.clone();

        if io_failure {
            state.settle_upload_state();
            drop(state);
            self.io_failure(&name, CallKind::UploadScore);
            return UploadOutcome::default();
        }

        state.last_upload = Some(outcome);
        state.settle_upload_state();
        drop(state);

        info!(
            leaderboard = %name,
            success = outcome.success,
            score = outcome.new_score,
            changed = outcome.changed,
            rank = outcome.new_rank,
            "score uploaded"
        );
        self.events.emit(SyncEventKind::ScoreUploaded {
            leaderboard: name,
            outcome,
        });
        outcome
    }

    /// Walk the last completed download into the entry snapshot
    fn materialize(&self) -> Vec<LeaderboardEntry> {
        let download = {
            let state = self.lock();
            match state.last_download {
                Some(download) => download,
                None => return state.entries.clone(),
            }
        };

        let entries: Vec<LeaderboardEntry> = (0..download.count)
            .filter_map(|index| {
                let Some(raw) = self.service.entry(download.entries, index) else {
                    warn!(index, "downloaded entry is missing");
                    return None;
                };
                let avatar = probe_image(|| self.service.avatar(raw.subject));
                if avatar.is_none() {
                    debug!(subject = %raw.subject, "no avatar for entry");
                }
                Some(LeaderboardEntry {
                    subject: raw.subject,
                    name: raw.name,
                    score: raw.score,
                    avatar,
                })
            })
            .collect();

        self.lock().entries = entries.clone();
        entries
    }
}

/// Live state of one named leaderboard
pub struct LeaderboardSession {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for LeaderboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaderboardSession")
            .field("identity", &self.identity())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl LeaderboardSession {
    /// Create an unresolved session; nothing is requested until [`resolve`](Self::resolve)
    pub fn new(
        name: impl Into<String>,
        config: LeaderboardConfig,
        service: Arc<dyn PlatformService>,
        calls: CallRegistry,
        events: EventSink,
    ) -> Self {
        let state = SessionState {
            identity: LeaderboardIdentity::new(name),
            resolve_attempt: 0,
            download: DownloadState::Idle,
            download_generation: 0,
            last_download: None,
            entries: Vec::new(),
            upload: UploadState::Idle,
            uploads_in_flight: 0,
            last_upload: None,
            issued: IssuedCalls::default(),
        };
        Self {
            shared: Arc::new(Shared {
                config,
                service,
                calls,
                events,
                state: Mutex::new(state),
            }),
        }
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    // ========================================
    // RESOLUTION
    // ========================================

    /// Look up the session's leaderboard by name
    pub fn resolve(&self) -> Completion<ResolveResult> {
        let name = self.name();
        self.resolve_name(&name)
    }

    /// Point the session at `name` and look it up
    ///
    /// Dependent operations are refused until the lookup completes. A newer
    /// resolve supersedes an older one still in flight.
    pub fn resolve_name(&self, name: &str) -> Completion<ResolveResult> {
        let shared = &self.shared;
        let mut state = shared.lock();
        state.resolve_attempt += 1;
        let attempt = state.resolve_attempt;
        state.identity.name = name.to_string();
        state.identity.handle = None;
        state.identity.state = ResolveState::Resolving;

        let handle = shared.service.find_leaderboard(name);
        let (completer, completion) = Completion::pair();
        let weak = self.weak();
        let registered = shared.track(&mut state, handle, move |result: FindResult, io_failure| {
            if let Some(shared) = weak.upgrade() {
                completer.complete(shared.finish_resolve(attempt, result, io_failure));
            }
        });

        if let Err(err) = registered {
            error!(leaderboard = %name, %err, "could not track resolve request");
            state.identity.state = ResolveState::Unresolved;
            return Completion::ready(Err(err));
        }

        debug!(leaderboard = %name, %handle, "resolving leaderboard");
        completion
    }

    // ========================================
    // DOWNLOAD
    // ========================================

    /// Download the configured window
    pub fn download(&self) -> Result<Completion<EntriesResult>, LeaderboardError> {
        let config = &self.shared.config;
        self.download_range(config.range_start, config.range_end, config.scope)
    }

    /// Download an inclusive window of entries
    ///
    /// Requires a resolved identity. When the download lands its entries are
    /// materialized straight away and delivered through the returned completion.
    /// Starting a new download supersedes any still in flight.
    pub fn download_range(
        &self,
        range_start: i32,
        range_end: i32,
        scope: RequestScope,
    ) -> Result<Completion<EntriesResult>, LeaderboardError> {
        let shared = &self.shared;
        let mut state = shared.lock();
        let board = state.require_resolved().inspect_err(|err| {
            warn!(%err, "download refused");
        })?;

        state.download_generation += 1;
        let generation = state.download_generation;
        let handle = shared
            .service
            .download_entries(board, scope, range_start, range_end);

        let (completer, completion) = Completion::pair();
        let weak = self.weak();
        shared.track(&mut state, handle, move |result: DownloadResult, io_failure| {
            if let Some(shared) = weak.upgrade() {
                completer.complete(shared.finish_download(generation, result, io_failure));
            }
        })?;
        state.download = DownloadState::Downloading;

        debug!(
            leaderboard = %state.identity.name,
            %handle,
            range_start,
            range_end,
            %scope,
            "downloading entries"
        );
        Ok(completion)
    }

    /// Rebuild the entry snapshot from the last completed download
    ///
    /// Only data from a download whose completion has been pumped is used; with
    /// none, the current (possibly empty) snapshot is returned unchanged.
    /// Avatars are probed again, so ones that were not ready earlier may appear.
    pub fn materialize_entries(&self) -> Vec<LeaderboardEntry> {
        self.shared.materialize()
    }

    // ========================================
    // UPLOAD
    // ========================================

    /// Submit a score with the configured upload method
    pub fn submit_score(&self, score: i32) -> Result<Completion<UploadOutcome>, LeaderboardError> {
        self.submit_score_with(score, self.shared.config.upload_method)
    }

    /// Submit a score
    ///
    /// Refused without issuing any request unless the identity is resolved. A
    /// transport failure completes with a default outcome (`success == false`).
    pub fn submit_score_with(
        &self,
        score: i32,
        method: UploadMethod,
    ) -> Result<Completion<UploadOutcome>, LeaderboardError> {
        let shared = &self.shared;
        let mut state = shared.lock();
        let board = state.require_resolved().inspect_err(|err| {
            warn!(%err, score, "score submission refused");
        })?;

        let handle = shared.service.upload_score(board, method, score);
        let (completer, completion) = Completion::pair();
        let weak = self.weak();
        shared.track(&mut state, handle, move |outcome: UploadOutcome, io_failure| {
            if let Some(shared) = weak.upgrade() {
                completer.complete(shared.finish_upload(outcome, io_failure));
            }
        })?;
        state.uploads_in_flight += 1;
        state.upload = UploadState::Uploading;

        debug!(leaderboard = %state.identity.name, %handle, score, %method, "uploading score");
        Ok(completion)
    }

    // ========================================
    // STATE
    // ========================================

    pub fn name(&self) -> String {
        self.shared.lock().identity.name.clone()
    }

    pub fn config(&self) -> &LeaderboardConfig {
        &self.shared.config
    }

    pub fn identity(&self) -> LeaderboardIdentity {
        self.shared.lock().identity.clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.lock().identity.is_resolved()
    }

    /// Entries of the last materialized download
    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.shared.lock().entries.clone()
    }

    pub fn last_upload(&self) -> Option<UploadOutcome> {
        self.shared.lock().last_upload
    }

    pub fn download_state(&self) -> DownloadState {
        self.shared.lock().download
    }

    pub fn upload_state(&self) -> UploadState {
        self.shared.lock().upload
    }

    pub fn snapshot(&self) -> LeaderboardSnapshot {
        let state = self.shared.lock();
        LeaderboardSnapshot {
            identity: state.identity.clone(),
            download: state.download,
            upload: state.upload,
            entries: state.entries.clone(),
            last_upload: state.last_upload,
        }
    }

    /// Abandon every call this session still has in flight
    ///
    /// Their completions are dropped unfired. Returns how many were abandoned.
    pub fn shutdown(&self) -> usize {
        let shared = &self.shared;
        let mut state = shared.lock();
        let abandoned = state.issued.abandon_all(&shared.calls);

        if state.identity.state == ResolveState::Resolving {
            state.identity.state = ResolveState::Unresolved;
        }
        state.uploads_in_flight = 0;
        state.settle_upload_state();
        state.settle_download_state();

        if abandoned > 0 {
            info!(leaderboard = %state.identity.name, abandoned, "leaderboard session shut down");
        }
        abandoned
    }
}

impl Drop for LeaderboardSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
