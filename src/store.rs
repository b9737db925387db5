//! Learner progress state: in-memory snapshot, session cache, remote sync.
//!
//! This module owns:
//!   - the single in-memory `ProgressSnapshot` (one learner, one session)
//!   - the `lesson_progress` cache entry (written synchronously on every change)
//!   - the optional remote backend (its calls are the only suspension points)
//!
//! Ordering contract: the optimistic local update and the cache write always
//! complete before a remote call suspends, so every query reflects the latest
//! local intent immediately, never waiting on the network. An in-flight sync
//! abandoned at session teardown is acceptable: the cache keeps the intent and
//! remote writes are idempotent per (learner, lesson), so a later session can
//! replay it.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::api::{ProgressBackend, ProgressPayload};
use crate::cache::SessionCache;
use crate::domain::{LessonId, LessonState, ProgressRecord, ProgressSnapshot};
use crate::protocol::{
    to_out, CompletionReport, InitReport, ProgressOut, SOURCE_CACHE, SOURCE_EMPTY, SOURCE_REMOTE,
};
use crate::util::{clamp_score, parse_rfc3339};

/// Cloneable handle over shared progress state. Construct one per session,
/// inject it into whoever needs progress queries, and drop it at teardown.
/// No ambient globals.
#[derive(Clone)]
pub struct ProgressStore {
    snapshot: Arc<RwLock<ProgressSnapshot>>,
    cache: SessionCache,
    backend: Option<Arc<dyn ProgressBackend>>,
    total_lessons: LessonId,
}

impl ProgressStore {
    /// `backend: None` runs fully offline (cache + empty fallback only).
    pub fn new(
        total_lessons: LessonId,
        cache: SessionCache,
        backend: Option<Arc<dyn ProgressBackend>>,
    ) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(ProgressSnapshot::empty())),
            cache,
            backend,
            total_lessons,
        }
    }

    /// Load the snapshot at session start. Remote first; on any remote
    /// failure fall back to the session cache, then to an empty sheet (only
    /// lesson 1 unlocked). Never fails; fallbacks carry an advisory warning.
    #[instrument(level = "info", skip(self))]
    pub async fn initialize(&self) -> InitReport {
        self.refresh().await
    }

    /// Same path as `initialize`; public so callers can re-sync on demand
    /// (e.g. after a failed completion sync).
    pub async fn refresh(&self) -> InitReport {
        if let Some(backend) = &self.backend {
            match backend.fetch_progress().await {
                Ok(payload) => {
                    let adopted = self.adopt_remote(payload);
                    self.cache.store_progress(&adopted, Utc::now());
                    info!(target: "progress", source = SOURCE_REMOTE, "Adopted server progress");
                    return InitReport {
                        source: SOURCE_REMOTE,
                        warning: None,
                    };
                }
                Err(e) => {
                    error!(target: "progress", error = %e, "Progress fetch failed; falling back to session cache");
                }
            }
        } else {
            warn!(target: "progress", "No remote backend configured; using session cache");
        }

        match self.cache.load_progress() {
            Some(entry) => {
                let mut snap = entry.snapshot;
                // Cached data is ours, but re-derive certification anyway so a
                // hand-edited or stale entry cannot break the invariant.
                snap.recompute_certification(self.total_lessons, Utc::now());
                *self.write() = snap;
                InitReport {
                    source: SOURCE_CACHE,
                    warning: Some(
                        "Could not load progress from server. Showing cached data.".into(),
                    ),
                }
            }
            None => {
                *self.write() = ProgressSnapshot::empty();
                InitReport {
                    source: SOURCE_EMPTY,
                    warning: Some(
                        "Could not load progress from server. Showing offline data.".into(),
                    ),
                }
            }
        }
    }

    /// Record a passed lesson.
    ///
    /// The lesson must be unlocked or already completed (re-completion is a
    /// no-op on the set but refreshes score and timestamp). Anything else is
    /// rejected without touching the snapshot. The optimistic update and the
    /// cache write happen before the sync suspends; on a confirmed write the
    /// server state is re-fetched and adopted, on failure the optimistic
    /// state stays and the report carries a retry warning.
    #[instrument(level = "info", skip(self), fields(%lesson, score))]
    pub async fn mark_complete(&self, lesson: LessonId, score: u32) -> CompletionReport {
        let allowed = {
            let snap = self.read();
            lesson >= 1
                && lesson <= self.total_lessons
                && (snap.is_unlocked(lesson) || snap.is_completed(lesson))
        };
        if !allowed {
            warn!(target: "progress", %lesson, "Rejected completion for a locked or unknown lesson");
            return CompletionReport {
                accepted: false,
                newly_completed: false,
                certification_earned: self.read().certification_earned,
                synced: false,
                warning: Some(format!("Lesson {lesson} is not unlocked yet.")),
            };
        }

        let score = clamp_score(score);
        let now = Utc::now();
        let (newly_completed, current) = {
            let mut snap = self.write();
            let newly = snap.completed.insert(lesson);
            let record = snap.records.entry(lesson).or_default();
            record.score = score;
            record.completed = true;
            record.completed_at = Some(now);
            snap.recompute_certification(self.total_lessons, now);
            (newly, snap.clone())
        };
        self.cache.store_progress(&current, now);
        info!(
            target: "progress",
            %lesson,
            newly_completed,
            certified = current.certification_earned,
            "Applied optimistic completion"
        );

        let Some(backend) = self.backend.clone() else {
            warn!(target: "progress", %lesson, "No remote backend; completion kept locally only");
            return CompletionReport {
                accepted: true,
                newly_completed,
                certification_earned: current.certification_earned,
                synced: false,
                warning: Some(format!("Failed to save lesson {lesson} to server (will retry).")),
            };
        };

        match backend.push_completion(lesson, score).await {
            Ok(true) => {
                // Remote is authoritative once the write is confirmed.
                match backend.fetch_progress().await {
                    Ok(payload) => {
                        let adopted = self.adopt_remote(payload);
                        self.cache.store_progress(&adopted, Utc::now());
                    }
                    Err(e) => {
                        warn!(target: "progress", error = %e, "Post-sync refresh failed; keeping local snapshot");
                    }
                }
                info!(target: "progress", %lesson, "Lesson completion synced");
                CompletionReport {
                    accepted: true,
                    newly_completed,
                    certification_earned: self.read().certification_earned,
                    synced: true,
                    warning: None,
                }
            }
            Ok(false) => {
                error!(target: "progress", %lesson, "Server rejected completion; keeping optimistic local state");
                self.retry_report(lesson, newly_completed)
            }
            Err(e) => {
                error!(target: "progress", %lesson, error = %e, "Completion sync failed; keeping optimistic local state");
                self.retry_report(lesson, newly_completed)
            }
        }
    }

    fn retry_report(&self, lesson: LessonId, newly_completed: bool) -> CompletionReport {
        CompletionReport {
            accepted: true,
            newly_completed,
            certification_earned: self.read().certification_earned,
            synced: false,
            warning: Some(format!("Failed to save lesson {lesson} to server (will retry).")),
        }
    }

    /// Replace the snapshot with a server payload, enforcing local invariants:
    /// ids outside 1..=N are dropped, scores clamped, certification re-derived
    /// from the completed set, and the certification date never moves backward
    /// (the earliest of local/remote/now wins).
    fn adopt_remote(&self, payload: ProgressPayload) -> ProgressSnapshot {
        let previous_date = self.read().certification_date;

        let mut next = ProgressSnapshot::empty();
        for lesson in payload.completed_lessons {
            if (1..=self.total_lessons).contains(&lesson) {
                next.completed.insert(lesson);
            } else {
                warn!(target: "progress", %lesson, "Ignoring out-of-range lesson id from server");
            }
        }
        for (lesson, record) in payload.progress {
            if !(1..=self.total_lessons).contains(&lesson) {
                continue;
            }
            next.records.insert(
                lesson,
                ProgressRecord {
                    score: clamp_score(record.score),
                    completed: record.completed,
                    completed_at: record.completed_at.as_deref().and_then(parse_rfc3339),
                },
            );
        }

        let remote_date = payload.certification_date.as_deref().and_then(parse_rfc3339);
        next.recompute_certification(self.total_lessons, Utc::now());
        if payload.certification_earned != next.certification_earned {
            warn!(
                target: "progress",
                server = payload.certification_earned,
                derived = next.certification_earned,
                "Server certification flag disagrees with the completed set; using the derived value"
            );
        }
        if next.certification_earned {
            let adoption_date = next.certification_date;
            next.certification_date = [previous_date, remote_date, adoption_date]
                .into_iter()
                .flatten()
                .min();
        }

        *self.write() = next.clone();
        next
    }

    // --- Queries: synchronous pure reads over the current snapshot ---

    pub fn is_unlocked(&self, lesson: LessonId) -> bool {
        self.read().is_unlocked(lesson)
    }

    pub fn is_completed(&self, lesson: LessonId) -> bool {
        self.read().is_completed(lesson)
    }

    pub fn lesson_state(&self, lesson: LessonId) -> LessonState {
        self.read().state_of(lesson)
    }

    pub fn progress_percentage(&self) -> u32 {
        self.read().percentage(self.total_lessons)
    }

    pub fn next_lesson(&self) -> Option<LessonId> {
        self.read().next_lesson(self.total_lessons)
    }

    /// Completed lessons, strictly ascending.
    pub fn completed_lessons(&self) -> Vec<LessonId> {
        self.read().completed.iter().copied().collect()
    }

    pub fn record(&self, lesson: LessonId) -> Option<ProgressRecord> {
        self.read().records.get(&lesson).cloned()
    }

    pub fn certification(&self) -> (bool, Option<DateTime<Utc>>) {
        let snap = self.read();
        (snap.certification_earned, snap.certification_date)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.read().clone()
    }

    /// Render-ready summary of the current snapshot.
    pub fn progress_out(&self) -> ProgressOut {
        to_out(&self.read(), self.total_lessons)
    }

    pub fn total_lessons(&self) -> LessonId {
        self.total_lessons
    }

    // A poisoned lock only happens when a holder panicked; the data is plain
    // state, so keep serving it instead of wedging the whole session.
    fn read(&self) -> RwLockReadGuard<'_, ProgressSnapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProgressSnapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RecordPayload;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory stand-in for the remote service. `fetch_result: None` means
    /// the network is down; `push_ok` mirrors the server's accept/reject.
    #[derive(Default)]
    struct FakeBackend {
        fetch_result: Mutex<Option<ProgressPayload>>,
        push_ok: bool,
        pushes: Mutex<Vec<(LessonId, u32)>>,
    }

    impl FakeBackend {
        fn offline() -> Self {
            Self::default()
        }

        fn with_payload(payload: ProgressPayload, push_ok: bool) -> Self {
            Self {
                fetch_result: Mutex::new(Some(payload)),
                push_ok,
                pushes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProgressBackend for FakeBackend {
        async fn fetch_progress(&self) -> Result<ProgressPayload, String> {
            self.fetch_result
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| "connection refused".to_string())
        }

        async fn push_completion(&self, lesson: LessonId, score: u32) -> Result<bool, String> {
            self.pushes.lock().unwrap().push((lesson, score));
            if self.fetch_result.lock().unwrap().is_none() {
                return Err("connection refused".to_string());
            }
            Ok(self.push_ok)
        }
    }

    fn offline_store() -> ProgressStore {
        ProgressStore::new(4, SessionCache::new(), None)
    }

    fn server_payload(completed: &[LessonId]) -> ProgressPayload {
        ProgressPayload {
            completed_lessons: completed.to_vec(),
            progress: completed
                .iter()
                .map(|l| {
                    (
                        *l,
                        RecordPayload {
                            score: 100,
                            completed: true,
                            completed_at: Some("2025-03-01T10:00:00Z".into()),
                        },
                    )
                })
                .collect(),
            certification_earned: false,
            certification_date: None,
        }
    }

    #[tokio::test]
    async fn initialize_adopts_remote_state_and_caches_it() {
        let cache = SessionCache::new();
        let backend = Arc::new(FakeBackend::with_payload(server_payload(&[1, 2]), true));
        let store = ProgressStore::new(4, cache.clone(), Some(backend));

        let report = store.initialize().await;
        assert_eq!(report.source, SOURCE_REMOTE);
        assert!(report.warning.is_none());
        assert_eq!(store.completed_lessons(), vec![1, 2]);
        assert!(store.is_unlocked(3));
        assert!(!store.is_unlocked(4));

        let cached = cache.load_progress().expect("cache was overwritten");
        assert_eq!(
            cached.snapshot.completed.iter().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn fetch_failure_with_cache_falls_back_to_cached_snapshot() {
        let cache = SessionCache::new();
        let mut cached = ProgressSnapshot::empty();
        cached.completed.insert(1);
        cache.store_progress(&cached, Utc::now());

        let store = ProgressStore::new(4, cache, Some(Arc::new(FakeBackend::offline())));
        let report = store.initialize().await;
        assert_eq!(report.source, SOURCE_CACHE);
        assert!(report.warning.as_deref().unwrap().contains("cached data"));
        assert_eq!(store.completed_lessons(), vec![1]);
        assert!(store.is_unlocked(2));
    }

    #[tokio::test]
    async fn fetch_failure_without_cache_starts_empty_with_a_warning() {
        let store = ProgressStore::new(4, SessionCache::new(), Some(Arc::new(FakeBackend::offline())));
        let report = store.initialize().await;
        assert_eq!(report.source, SOURCE_EMPTY);
        assert!(report.warning.is_some());
        assert!(store.completed_lessons().is_empty());
        assert!(store.is_unlocked(1), "lesson 1 is always unlocked");
        assert!(!store.is_unlocked(2));
    }

    #[tokio::test]
    async fn optimistic_update_is_visible_and_cached_despite_sync_failure() {
        let cache = SessionCache::new();
        let store = ProgressStore::new(4, cache.clone(), Some(Arc::new(FakeBackend::offline())));
        store.initialize().await;

        let report = store.mark_complete(1, 100).await;
        assert!(report.accepted);
        assert!(report.newly_completed);
        assert!(!report.synced);
        assert!(report.warning.as_deref().unwrap().contains("will retry"));

        assert!(store.is_completed(1));
        assert!(store.is_unlocked(2), "completing 1 unlocks 2");
        assert_eq!(store.progress_percentage(), 25);

        let cached = cache.load_progress().expect("optimistic state cached");
        assert!(cached.snapshot.is_completed(1));
    }

    #[tokio::test]
    async fn locked_lessons_are_rejected_without_corrupting_the_snapshot() {
        let store = offline_store();
        let report = store.mark_complete(3, 95).await;
        assert!(!report.accepted);
        assert!(report.warning.is_some());
        assert!(store.completed_lessons().is_empty());
        assert_eq!(store.lesson_state(3), LessonState::Locked);

        // Out-of-range ids get the same treatment.
        assert!(!store.mark_complete(0, 100).await.accepted);
        assert!(!store.mark_complete(9, 100).await.accepted);
    }

    #[tokio::test]
    async fn completion_is_idempotent_on_set_membership() {
        let store = offline_store();
        let first = store.mark_complete(1, 90).await;
        let again = store.mark_complete(1, 100).await;

        assert!(first.newly_completed);
        assert!(!again.newly_completed);
        assert_eq!(store.completed_lessons(), vec![1]);
        // Re-completion refreshed the recorded score.
        assert_eq!(store.record(1).map(|r| r.score), Some(100));
    }

    #[tokio::test]
    async fn certification_is_earned_once_and_its_date_is_stable() {
        let store = offline_store();
        for lesson in 1..=4 {
            store.mark_complete(lesson, 100).await;
        }
        let (earned, date) = store.certification();
        assert!(earned);
        let first_date = date.expect("date set when earned");

        store.mark_complete(2, 100).await;
        let (still_earned, date_after) = store.certification();
        assert!(still_earned);
        assert_eq!(date_after, Some(first_date), "date never moves");
    }

    #[tokio::test]
    async fn confirmed_sync_refetches_and_adopts_server_truth() {
        let backend = Arc::new(FakeBackend::with_payload(server_payload(&[1, 2]), true));
        let store = ProgressStore::new(4, SessionCache::new(), Some(backend.clone()));
        store.initialize().await;

        let report = store.mark_complete(3, 80).await;
        assert!(report.synced);
        assert!(report.warning.is_none());
        assert_eq!(backend.pushes.lock().unwrap().as_slice(), &[(3, 80)]);

        // The fake server still reports {1, 2}: after reconciliation the
        // confirmed remote set is authoritative.
        assert_eq!(store.completed_lessons(), vec![1, 2]);
        assert_eq!(store.record(1).map(|r| r.score), Some(100));
    }

    #[tokio::test]
    async fn server_rejection_keeps_optimistic_state() {
        let backend = Arc::new(FakeBackend::with_payload(server_payload(&[]), false));
        let store = ProgressStore::new(4, SessionCache::new(), Some(backend));
        store.initialize().await;

        let report = store.mark_complete(1, 100).await;
        assert!(report.accepted);
        assert!(!report.synced);
        assert!(store.is_completed(1), "optimistic state retained");
    }

    #[tokio::test]
    async fn adoption_filters_out_of_range_ids_and_derives_certification() {
        let mut payload = server_payload(&[1, 2, 3, 4]);
        payload.completed_lessons.push(9);
        payload.certification_earned = false; // server disagrees; set is full
        let backend = Arc::new(FakeBackend::with_payload(payload, true));
        let store = ProgressStore::new(4, SessionCache::new(), Some(backend));
        store.initialize().await;

        assert_eq!(store.completed_lessons(), vec![1, 2, 3, 4]);
        let (earned, date) = store.certification();
        assert!(earned, "derived from the full completed set");
        assert!(date.is_some());
        assert_eq!(store.progress_percentage(), 100);
        assert_eq!(store.next_lesson(), None);
    }
}
