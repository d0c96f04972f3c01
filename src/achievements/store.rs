//! Achievement store
//!
//! Owns the catalog and the dirty-stats flag. Mutations are applied on the
//! service side first and reach the local records through the next refresh,
//! except for `clear_all`, which also resets the records it clears.
//!
//! Flushing is driven from the tick loop via [`AchievementStore::flush_if_dirty`]:
//! a dirty store issues one store request at a time, and every store
//! completion chains a refresh whatever its outcome.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, error, info, warn};

use super::{AchievementCatalog, AchievementError};
use crate::calls::{CallRegistry, Completion, IssuedCalls};
use crate::domain::{
    AchievementField, AchievementRecord, AvatarImage, CallHandle, CallKind, EventSink,
    RefreshSummary, StoreOutcome, SyncEventKind,
};
use crate::service::{FromPayload, PlatformService, StoreResult, UserStatsResult, probe_image};

/// Result delivered by [`AchievementStore::refresh`]
pub type RefreshResult = Result<RefreshSummary, AchievementError>;

#[derive(Debug, Default)]
struct StoreState {
    catalog: AchievementCatalog,
    initialized: bool,
    dirty: bool,
    /// Bumped by every mutation, so a store only clears what it actually flushed
    revision: u64,
    flush_in_flight: bool,
    issued: IssuedCalls,
}

impl StoreState {
    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    fn require(&self, id: &str) -> Result<(), AchievementError> {
        if !self.initialized {
            warn!(id, "achievement catalog not initialized");
            return Err(AchievementError::NotInitialized);
        }
        if self.catalog.position(id).is_none() {
            warn!(id, "unknown achievement; check the platform naming");
            return Err(AchievementError::UnknownAchievement(id.to_string()));
        }
        Ok(())
    }
}

/// Re-read one record from the service's received stats
///
/// Returns `false`, leaving the record untouched, when the service has no
/// unlock flag for it.
fn reconcile(service: &dyn PlatformService, record: &mut AchievementRecord) -> bool {
    let Some(unlocked) = service.achievement_flag(&record.id) else {
        warn!(id = %record.id, "service has no data for achievement; is it registered?");
        return false;
    };

    record.unlocked = unlocked;
    record.name = service.achievement_attribute(&record.id, AchievementField::Name);
    record.description = service.achievement_attribute(&record.id, AchievementField::Description);
    match service.stat(&record.stat_key()) {
        Some(stat) => record.stat = stat,
        None => warn!(key = %record.stat_key(), "service has no value for stat"),
    }

    debug!(
        id = %record.id,
        name = %record.name,
        unlocked = record.unlocked,
        stat = record.stat,
        "achievement reconciled"
    );
    true
}

struct Shared {
    service: Arc<dyn PlatformService>,
    calls: CallRegistry,
    events: EventSink,
    state: Mutex<StoreState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn track<T, F>(
        &self,
        state: &mut StoreState,
        handle: CallHandle,
        on_complete: F,
    ) -> Result<(), AchievementError>
    where
        T: FromPayload,
        F: FnOnce(T, bool) + Send + 'static,
    {
        self.calls.register(handle, on_complete)?;
        state.issued.track(&self.calls, handle);
        Ok(())
    }

    fn refresh(self: &Arc<Self>) -> Completion<RefreshResult> {
        let mut state = self.lock();
        let handle = self.service.request_user_stats();
        let (completer, completion) = Completion::pair();
        let weak = Arc::downgrade(self);
        let registered = self.track(&mut state, handle, move |result: UserStatsResult, io_failure| {
            if let Some(shared) = weak.upgrade() {
                completer.complete(shared.finish_refresh(result, io_failure));
            }
        });

        match registered {
            Ok(()) => {
                debug!(%handle, "requesting user stats");
                completion
            }
            Err(err) => {
                error!(%err, "could not track user stats request");
                Completion::ready(Err(err))
            }
        }
    }

    fn finish_refresh(&self, result: UserStatsResult, io_failure: bool) -> RefreshResult {
        if io_failure {
            warn!("user stats request failed");
            self.events.emit(SyncEventKind::IoFailure {
                operation: CallKind::RequestUserStats,
            });
            return Err(AchievementError::IoFailure(CallKind::RequestUserStats));
        }

        let mut state = self.lock();
        let mut summary = RefreshSummary::default();
        for record in state.catalog.records_mut() {
            if reconcile(self.service.as_ref(), record) {
                summary.updated += 1;
            } else {
                summary.failed.push(record.id.clone());
            }
        }
        drop(state);

        info!(
            user = %result.user,
            game = result.game,
            updated = summary.updated,
            failed = summary.failed.len(),
            "user stats received"
        );
        self.events.emit(SyncEventKind::StatsRefreshed {
            updated: summary.updated,
            failed: summary.failed.len(),
        });
        Ok(summary)
    }

    fn finish_flush(
        self: &Arc<Self>,
        revision: u64,
        result: StoreResult,
        io_failure: bool,
    ) -> StoreOutcome {
        let mut state = self.lock();
        state.flush_in_flight = false;
        let ok = result.ok && !io_failure;
        let cleared_dirty = ok && state.revision == revision;
        if cleared_dirty {
            state.dirty = false;
        }
        let still_dirty = state.dirty;
        drop(state);

        if io_failure {
            warn!("stats store failed; will retry");
            self.events.emit(SyncEventKind::IoFailure {
                operation: CallKind::StoreStats,
            });
        } else if !result.ok {
            warn!("service rejected stats store; will retry");
        } else {
            info!(still_dirty, "stats stored");
        }
        self.events.emit(SyncEventKind::StatsStored { ok });

        let _ = self.refresh();
        StoreOutcome { ok, cleared_dirty }
    }
}

/// The achievement catalog and its synchronization state
pub struct AchievementStore {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AchievementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("AchievementStore")
            .field("records", &state.catalog.len())
            .field("dirty", &state.dirty)
            .field("flush_in_flight", &state.flush_in_flight)
            .finish()
    }
}

impl AchievementStore {
    /// Create a store with an empty, uninitialized catalog
    pub fn new(service: Arc<dyn PlatformService>, calls: CallRegistry, events: EventSink) -> Self {
        Self {
            shared: Arc::new(Shared {
                service,
                calls,
                events,
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    /// Build the catalog for ordinals `0..=count`, replacing any previous one
    pub fn initialize(&self, count: u32) {
        let mut state = self.shared.lock();
        state.catalog = AchievementCatalog::with_count(count);
        state.initialized = true;
        info!(records = state.catalog.len(), "achievement catalog initialized");
    }

    /// Request the service's user stats and reconcile every record on arrival
    ///
    /// Records the service has no data for are left unchanged and listed in
    /// [`RefreshSummary::failed`].
    pub fn refresh(&self) -> Completion<RefreshResult> {
        self.shared.refresh()
    }

    /// Re-read a single record from stats the service already holds
    pub fn check(&self, id: &str) -> Result<AchievementRecord, AchievementError> {
        let mut state = self.shared.lock();
        state.require(id)?;
        let service = self.shared.service.clone();
        let record = state
            .catalog
            .get_mut(id)
            .ok_or_else(|| AchievementError::UnknownAchievement(id.to_string()))?;
        if !reconcile(service.as_ref(), record) {
            return Err(AchievementError::Unavailable(id.to_string()));
        }
        info!(
            id = %record.id,
            name = %record.name,
            description = %record.description,
            stat = record.stat,
            unlocked = record.unlocked,
            "achievement checked"
        );
        Ok(record.clone())
    }

    // ========================================
    // MUTATIONS
    // ========================================

    fn mutate(
        &self,
        id: &str,
        action: &str,
        apply: impl FnOnce(&dyn PlatformService) -> bool,
    ) -> Result<(), AchievementError> {
        let mut state = self.shared.lock();
        state.require(id)?;
        if !apply(self.shared.service.as_ref()) {
            warn!(id, action, "service refused the change");
            return Err(AchievementError::Rejected(id.to_string()));
        }
        state.mark_dirty();
        info!(id, action, "achievement updated");
        Ok(())
    }

    /// Unlock an achievement
    pub fn unlock(&self, id: &str) -> Result<(), AchievementError> {
        self.mutate(id, "unlock", |service| service.set_achievement(id))
    }

    /// Lock an achievement again
    pub fn clear(&self, id: &str) -> Result<(), AchievementError> {
        self.mutate(id, "clear", |service| service.clear_achievement(id))
    }

    /// Set the companion stat of an achievement
    pub fn set_stat(&self, id: &str, value: i32) -> Result<(), AchievementError> {
        let key = crate::domain::stat_key(id);
        self.mutate(id, "set_stat", |service| service.set_stat(&key, value))
    }

    /// Lock every achievement and zero every companion stat
    ///
    /// Records are reset locally as well. Returns how many records the service
    /// accepted both changes for.
    pub fn clear_all(&self) -> Result<usize, AchievementError> {
        let mut state = self.shared.lock();
        if !state.initialized {
            return Err(AchievementError::NotInitialized);
        }

        let service = self.shared.service.clone();
        let mut accepted = 0;
        for record in state.catalog.records_mut() {
            let cleared = service.clear_achievement(&record.id);
            let zeroed = service.set_stat(&record.stat_key(), 0);
            if cleared && zeroed {
                accepted += 1;
            } else {
                warn!(id = %record.id, "service refused to reset achievement");
            }
            record.unlocked = false;
            record.stat = 0;
        }
        state.mark_dirty();

        info!(accepted, "all achievements cleared");
        Ok(accepted)
    }

    /// Report progress towards an achievement; `max == 0` shows it unlocked
    pub fn indicate_progress(
        &self,
        id: &str,
        current: u32,
        max: u32,
    ) -> Result<(), AchievementError> {
        self.shared.lock().require(id)?;
        if !self.shared.service.indicate_progress(id, current, max) {
            return Err(AchievementError::Rejected(id.to_string()));
        }
        debug!(id, current, max, "achievement progress");
        self.shared.events.emit(SyncEventKind::AchievementProgress {
            id: id.to_string(),
            current,
            max,
        });
        Ok(())
    }

    // ========================================
    // READS
    // ========================================

    /// Current companion stat value from the service, or 0 on any miss
    pub fn get_stat(&self, id: &str) -> i32 {
        self.try_get_stat(id).unwrap_or_else(|err| {
            warn!(id, %err, "stat lookup failed; using 0");
            0
        })
    }

    pub fn try_get_stat(&self, id: &str) -> Result<i32, AchievementError> {
        self.shared.lock().require(id)?;
        self.shared
            .service
            .stat(&crate::domain::stat_key(id))
            .ok_or_else(|| AchievementError::Unavailable(id.to_string()))
    }

    /// Best-effort icon lookup, retried once if the image is still loading
    pub fn icon(&self, id: &str) -> Result<Option<AvatarImage>, AchievementError> {
        self.shared.lock().require(id)?;
        let service = &self.shared.service;
        Ok(probe_image(|| service.achievement_icon(id)))
    }

    pub fn record(&self, id: &str) -> Option<AchievementRecord> {
        self.shared.lock().catalog.get(id).cloned()
    }

    /// Copy of every record, in catalog order
    pub fn snapshot(&self) -> Vec<AchievementRecord> {
        self.shared.lock().catalog.records().to_vec()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.lock().initialized
    }

    /// Whether local changes are waiting to be flushed
    pub fn is_dirty(&self) -> bool {
        self.shared.lock().dirty
    }

    pub fn is_flushing(&self) -> bool {
        self.shared.lock().flush_in_flight
    }

    // ========================================
    // FLUSH
    // ========================================

    /// Flush pending changes to the service, if any; call once per tick
    ///
    /// Returns `None` when nothing is dirty or a flush is already in flight.
    /// The dirty flag is cleared only by a successful store that covered every
    /// change made so far; otherwise the next call retries.
    pub fn flush_if_dirty(&self) -> Option<Completion<StoreOutcome>> {
        let shared = &self.shared;
        let mut state = shared.lock();
        if !state.dirty || state.flush_in_flight {
            return None;
        }

        let revision = state.revision;
        let handle = shared.service.store_stats();
        let (completer, completion) = Completion::pair();
        let weak = self.weak();
        let registered = shared.track(&mut state, handle, move |result: StoreResult, io_failure| {
            if let Some(shared) = weak.upgrade() {
                completer.complete(shared.finish_flush(revision, result, io_failure));
            }
        });
        if let Err(err) = registered {
            error!(%err, "could not track stats store");
            return None;
        }

        state.flush_in_flight = true;
        debug!(%handle, revision, "flushing stats");
        Some(completion)
    }

    /// Abandon every call this store still has in flight
    pub fn shutdown(&self) -> usize {
        let shared = &self.shared;
        let mut state = shared.lock();
        let abandoned = state.issued.abandon_all(&shared.calls);
        state.flush_in_flight = false;
        if abandoned > 0 {
            info!(abandoned, "achievement store shut down");
        }
        abandoned
    }
}

impl Drop for AchievementStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SubjectId;
    use crate::service::MemoryService;

    fn store_with(count: u32) -> (Arc<MemoryService>, CallRegistry, AchievementStore) {
        let service = Arc::new(MemoryService::new(SubjectId(1), "me"));
        for ordinal in 0..=count {
            let id = crate::domain::achievement_id(ordinal);
            service.define_achievement(&id, format!("Name {ordinal}"), format!("Desc {ordinal}"));
        }
        let calls = CallRegistry::new();
        let (sink, _rx) = EventSink::channel();
        let store = AchievementStore::new(service.clone(), calls.clone(), sink);
        store.initialize(count);
        (service, calls, store)
    }

    fn refreshed(count: u32) -> (Arc<MemoryService>, CallRegistry, AchievementStore) {
        let (service, calls, store) = store_with(count);
        let _ = store.refresh();
        calls.pump(service.as_ref());
        (service, calls, store)
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_service, _calls, store) = store_with(3);
        store.initialize(3);
        assert_eq!(store.len(), 4);
        assert!(store.snapshot().iter().all(|r| r.name.is_empty()));
    }

    #[test]
    fn test_refresh_fills_records() {
        let (service, calls, store) = store_with(2);
        let mut refresh = store.refresh();
        calls.pump(service.as_ref());

        let summary = refresh.try_take().unwrap().unwrap();
        assert_eq!(summary.updated, 3);
        assert!(summary.failed.is_empty());
        assert_eq!(store.record("ACHIEVEMENT_01").unwrap().name, "Name 1");
    }

    #[test]
    fn test_refresh_skips_records_the_service_lacks() {
        let (service, calls, store) = store_with(1);
        store.initialize(2);
        let mut refresh = store.refresh();
        calls.pump(service.as_ref());

        let summary = refresh.try_take().unwrap().unwrap();
        assert_eq!(summary.failed, vec!["ACHIEVEMENT_02".to_string()]);
        assert_eq!(
            store.record("ACHIEVEMENT_02"),
            Some(AchievementRecord::empty("ACHIEVEMENT_02"))
        );
    }

    #[test]
    fn test_unknown_identity_is_reported() {
        let (_service, _calls, store) = refreshed(1);
        assert!(matches!(
            store.unlock("ACHIEVEMENT_99"),
            Err(AchievementError::UnknownAchievement(_))
        ));
        assert_eq!(store.get_stat("ACHIEVEMENT_99"), 0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_mutation_before_stats_is_rejected() {
        let (_service, _calls, store) = store_with(1);
        assert!(matches!(
            store.unlock("ACHIEVEMENT_00"),
            Err(AchievementError::Rejected(_))
        ));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_flush_clears_dirty_and_chains_refresh() {
        let (service, calls, store) = refreshed(1);
        store.set_stat("ACHIEVEMENT_01", 5).unwrap();
        assert!(store.is_dirty());

        let mut flush = store.flush_if_dirty().unwrap();
        assert!(store.flush_if_dirty().is_none());
        calls.pump(service.as_ref());

        assert_eq!(
            flush.try_take(),
            Some(StoreOutcome {
                ok: true,
                cleared_dirty: true
            })
        );
        assert!(!store.is_dirty());
        assert_eq!(service.committed("ACHIEVEMENT_01"), Some((false, 5)));

        assert_eq!(calls.in_flight(), 1);
        calls.pump(service.as_ref());
        assert_eq!(store.record("ACHIEVEMENT_01").unwrap().stat, 5);
    }

    #[test]
    fn test_rejected_flush_keeps_dirty() {
        let (service, calls, store) = refreshed(0);
        store.unlock("ACHIEVEMENT_00").unwrap();
        service.reject_next_stores(1);

        let mut flush = store.flush_if_dirty().unwrap();
        calls.pump(service.as_ref());
        assert_eq!(
            flush.try_take(),
            Some(StoreOutcome {
                ok: false,
                cleared_dirty: false
            })
        );
        assert!(store.is_dirty());
        assert!(store.flush_if_dirty().is_some());
    }

    #[test]
    fn test_change_during_flush_stays_dirty() {
        let (service, calls, store) = refreshed(1);
        store.unlock("ACHIEVEMENT_00").unwrap();
        let mut flush = store.flush_if_dirty().unwrap();
        store.unlock("ACHIEVEMENT_01").unwrap();
        calls.pump(service.as_ref());

        let outcome = flush.try_take().unwrap();
        assert!(outcome.ok);
        assert!(!outcome.cleared_dirty);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_clear_all_resets_locally() {
        let (service, calls, store) = refreshed(2);
        store.unlock("ACHIEVEMENT_02").unwrap();
        store.set_stat("ACHIEVEMENT_02", 9).unwrap();
        let _ = store.refresh();
        calls.pump(service.as_ref());
        assert!(store.record("ACHIEVEMENT_02").unwrap().unlocked);

        assert_eq!(store.clear_all().unwrap(), 3);
        let record = store.record("ACHIEVEMENT_02").unwrap();
        assert!(!record.unlocked);
        assert_eq!(record.stat, 0);
        assert_eq!(store.get_stat("ACHIEVEMENT_02"), 0);
    }

    #[test]
    fn test_check_reads_single_record() {
        let (service, _calls, store) = refreshed(1);
        service.set_stat("ACHIEVEMENT_01_STAT", 3);
        let record = store.check("ACHIEVEMENT_01").unwrap();
        assert_eq!(record.stat, 3);
        assert_eq!(store.record("ACHIEVEMENT_00").unwrap().stat, 0);
    }

    #[test]
    fn test_icon_retries_once() {
        let (service, _calls, store) = refreshed(0);
        service.set_icon("ACHIEVEMENT_00", AvatarImage::solid(2, 2, [0; 4]), 1);
        assert!(store.icon("ACHIEVEMENT_00").unwrap().is_some());

        service.set_icon("ACHIEVEMENT_00", AvatarImage::solid(2, 2, [0; 4]), 2);
        assert!(store.icon("ACHIEVEMENT_00").unwrap().is_none());
    }

    #[test]
    fn test_drop_abandons_flush() {
        let (service, calls, store) = refreshed(0);
        store.unlock("ACHIEVEMENT_00").unwrap();
        let mut flush = store.flush_if_dirty().unwrap();

        drop(store);
        assert!(flush.is_abandoned());
        assert_eq!(calls.pump(service.as_ref()), 0);
    }
}
