//! QueueService - submit / lease-next / complete の façade
//!
//! # 設計原則
//! - 状態（TaskStore + ResponseRegistry + MetricsCounter）は `QueueState` 1 つにまとめ、
//!   1 本の Mutex で守る
//! - ロック中は await しない・ログを出さない（時刻取得と ID 採番はロック前）
//! - ロックは 1 本だけで、操作同士が呼び合わないのでデッドロックしない

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::Health;
use crate::domain::{
    CompletionAck, CompletionVersion, DedupeKey, LeaseBounds, NewPrompt, PromptEnvelope,
    QueueError, ResponseEnvelope, StoredResponse, Submitted, Task, TaskId, TaskView,
};
use crate::ports::{Clock, IdGenerator, PortError, PromptQueue, SystemClock, UlidGenerator};
use crate::queue::{MetricsSnapshot, QueueState};

/// In-process prompt queue.
pub struct QueueService {
    state: Mutex<QueueState>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    bounds: LeaseBounds,
}

impl QueueService {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, bounds: LeaseBounds) -> Self {
        Self {
            state: Mutex::new(QueueState::new()),
            clock,
            ids,
            bounds,
        }
    }

    /// Production wiring: wall clock + ULID ids.
    pub fn with_system_clock(bounds: LeaseBounds) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Self::new(clock, ids, bounds)
    }

    pub fn bounds(&self) -> LeaseBounds {
        self.bounds
    }

    // State transitions are applied only after validation, so a poisoned lock still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn submit(&self, request: NewPrompt) -> Result<Submitted, QueueError> {
        if request.prompt.trim().is_empty() {
            return Err(QueueError::EmptyPrompt);
        }

        let task_id = TaskId::supplied(request.task_id.as_deref())
            .unwrap_or_else(|| self.ids.generate_task_id());
        let dedupe_key = DedupeKey::resolve(
            DedupeKey::supplied(request.dedupe_key.as_deref()),
            None,
            &task_id,
        );
        let task = Task::new(
            task_id,
            &request.prompt,
            request.metadata,
            dedupe_key,
            self.clock.now(),
        );

        let submitted = {
            let mut state = self.lock();
            let task = state.submit(task)?;
            Submitted {
                task_id: task.task_id.clone(),
                dedupe_key: task.dedupe_key.clone(),
            }
        };

        tracing::info!(
            task_id = %submitted.task_id,
            dedupe_key = %submitted.dedupe_key,
            "prompt enqueued"
        );
        Ok(submitted)
    }

    /// `Ok(None)` when no task is eligible right now.
    pub fn lease_next(&self, lease_secs: Option<u64>) -> Result<Option<PromptEnvelope>, QueueError> {
        let ttl = self.bounds.ttl(lease_secs)?;
        let now = self.clock.now();

        let decision = self.lock().lease_next(now, ttl);
        let Some(decision) = decision else {
            tracing::debug!("no prompt available");
            return Ok(None);
        };

        if decision.reclaimed_expired {
            tracing::info!(task_id = %decision.envelope.task_id, "expired lease reclaimed");
        }
        tracing::info!(
            task_id = %decision.envelope.task_id,
            lease_until = %decision.lease_until.to_rfc3339(),
            "prompt leased"
        );
        Ok(Some(decision.envelope))
    }

    pub fn complete(&self, envelope: ResponseEnvelope) -> Result<CompletionAck, QueueError> {
        let task_id = envelope.task_id.clone();
        let done = self.lock().complete(envelope)?;

        match done.version {
            CompletionVersion::Fresh => {
                tracing::info!(task_id = %task_id, dedupe_key = %done.key, "response stored")
            }
            CompletionVersion::Duplicate => {
                tracing::info!(dedupe_key = %done.key, "duplicate response dropped")
            }
        }
        Ok(CompletionAck::from(done.version))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.lock().metrics.snapshot()
    }

    pub fn health(&self) -> Health {
        Health::alive(self.clock.now())
    }

    pub fn task(&self, task_id: &TaskId) -> Result<TaskView, QueueError> {
        let now = self.clock.now();
        let state = self.lock();
        state.store.get(task_id).map(|t| t.view_at(now))
    }

    pub fn response(&self, key: &DedupeKey) -> Result<StoredResponse, QueueError> {
        self.lock()
            .registry
            .get(key)
            .cloned()
            .ok_or_else(|| QueueError::UnknownResponse(key.clone()))
    }
}

#[async_trait]
impl PromptQueue for QueueService {
    async fn submit(&self, request: NewPrompt) -> Result<Submitted, PortError> {
        Ok(QueueService::submit(self, request)?)
    }

    async fn lease_next(
        &self,
        lease_secs: Option<u64>,
    ) -> Result<Option<PromptEnvelope>, PortError> {
        Ok(QueueService::lease_next(self, lease_secs)?)
    }

    async fn complete(&self, envelope: ResponseEnvelope) -> Result<CompletionAck, PortError> {
        Ok(QueueService::complete(self, envelope)?)
    }

    async fn metrics(&self) -> Result<MetricsSnapshot, PortError> {
        Ok(QueueService::metrics(self))
    }

    async fn health(&self) -> Result<Health, PortError> {
        Ok(QueueService::health(self))
    }

    async fn task(&self, task_id: &TaskId) -> Result<TaskView, PortError> {
        Ok(QueueService::task(self, task_id)?)
    }

    async fn response(&self, key: &DedupeKey) -> Result<StoredResponse, PortError> {
        Ok(QueueService::response(self, key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Metadata;
    use crate::ports::FixedClock;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn service() -> (Arc<FixedClock>, QueueService) {
        let clock = Arc::new(FixedClock::new(t0()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&dyn_clock)));
        let svc = QueueService::new(dyn_clock, ids, LeaseBounds::default());
        (clock, svc)
    }

    #[test]
    fn scenario_submit_returns_id_and_derived_key() {
        let (_, svc) = service();
        let out = svc.submit(NewPrompt::new("hello")).unwrap();

        assert!(!out.task_id.as_str().is_empty());
        assert_eq!(out.dedupe_key, DedupeKey::derive(&out.task_id));
        assert_eq!(svc.metrics().enqueued, 1);
        assert_eq!(svc.task(&out.task_id).unwrap().prompt, "hello");
    }

    #[test]
    fn scenario_lease_then_empty_then_expired_release() {
        let (clock, svc) = service();
        let out = svc.submit(NewPrompt::new("hello")).unwrap();

        let env = svc.lease_next(Some(10)).unwrap().unwrap();
        assert_eq!(env.task_id, out.task_id);
        assert_eq!(env.prompt, "hello");
        assert_eq!(env.dedupe_key, out.dedupe_key);

        // still leased
        assert!(svc.lease_next(Some(10)).unwrap().is_none());
        assert_eq!(svc.metrics().leases_expired, 0);

        clock.advance(TimeDelta::seconds(11));
        let again = svc.lease_next(Some(10)).unwrap().unwrap();
        assert_eq!(again.task_id, out.task_id);

        let m = svc.metrics();
        assert!(m.leases_expired >= 1);
        assert_eq!(m.fetched, 2);
    }

    #[test]
    fn scenario_complete_is_idempotent() {
        let (_, svc) = service();
        let out = svc.submit(NewPrompt::new("hello")).unwrap();
        svc.lease_next(Some(10)).unwrap().unwrap();

        let report = ResponseEnvelope::new(out.task_id.clone(), "answer").with_dedupe_key("k1");
        let first = svc.complete(report.clone()).unwrap();
        let second = svc.complete(report).unwrap();

        assert_eq!(first, CompletionAck { ok: true, version: CompletionVersion::Fresh });
        assert_eq!(second, CompletionAck { ok: true, version: CompletionVersion::Duplicate });
        assert_eq!(svc.metrics().posted, 1);

        let stored = svc.response(&DedupeKey::new("k1")).unwrap();
        assert_eq!(stored.content, "answer");
        assert!(svc.task(&out.task_id).unwrap().completed);
        assert!(svc.lease_next(None).unwrap().is_none());
    }

    #[test]
    fn scenario_complete_unknown_task() {
        let (_, svc) = service();
        let err = svc
            .complete(ResponseEnvelope::new(TaskId::new("missing"), "x"))
            .unwrap_err();
        assert_eq!(err, QueueError::UnknownTask(TaskId::new("missing")));
        assert_eq!(svc.metrics().posted, 0);
    }

    #[test]
    fn scenario_empty_prompt_is_rejected() {
        let (_, svc) = service();
        assert_eq!(svc.submit(NewPrompt::new("")).unwrap_err(), QueueError::EmptyPrompt);
        assert_eq!(svc.submit(NewPrompt::new("  \n ")).unwrap_err(), QueueError::EmptyPrompt);
        assert_eq!(svc.metrics().enqueued, 0);
        assert!(svc.lease_next(None).unwrap().is_none());
    }

    #[test]
    fn out_of_range_ttl_is_rejected_before_touching_state() {
        let (_, svc) = service();
        svc.submit(NewPrompt::new("p")).unwrap();

        assert!(matches!(
            svc.lease_next(Some(5)),
            Err(QueueError::LeaseTtlOutOfRange { requested: 5, .. })
        ));
        assert!(matches!(
            svc.lease_next(Some(601)),
            Err(QueueError::LeaseTtlOutOfRange { requested: 601, .. })
        ));
        assert_eq!(svc.metrics().fetched, 0);
        assert!(svc.lease_next(None).unwrap().is_some());
    }

    #[test]
    fn caller_supplied_ids_and_keys_are_kept() {
        let (_, svc) = service();
        let mut meta = Metadata::new();
        meta.insert("source".into(), serde_json::json!("docs"));

        let out = svc
            .submit(
                NewPrompt::new("  summarize  ")
                    .with_task_id("my-id")
                    .with_dedupe_key("my-key")
                    .with_metadata(meta.clone()),
            )
            .unwrap();
        assert_eq!(out.task_id, TaskId::new("my-id"));
        assert_eq!(out.dedupe_key, DedupeKey::new("my-key"));

        let env = svc.lease_next(None).unwrap().unwrap();
        assert_eq!(env.prompt, "summarize");
        assert_eq!(env.metadata, meta);

        // completion without a key resolves to the task's stored key
        svc.complete(ResponseEnvelope::new(TaskId::new("my-id"), "done")).unwrap();
        assert_eq!(svc.response(&DedupeKey::new("my-key")).unwrap().content, "done");
    }

    #[test]
    fn taken_task_id_is_a_conflict() {
        let (_, svc) = service();
        svc.submit(NewPrompt::new("a").with_task_id("same")).unwrap();
        let err = svc.submit(NewPrompt::new("b").with_task_id("same")).unwrap_err();
        assert_eq!(err, QueueError::DuplicateTaskId(TaskId::new("same")));
        assert_eq!(svc.metrics().enqueued, 1);
    }

    #[test]
    fn fifo_among_ready_tasks() {
        let (_, svc) = service();
        let a = svc.submit(NewPrompt::new("A")).unwrap();
        let b = svc.submit(NewPrompt::new("B")).unwrap();

        assert_eq!(svc.lease_next(None).unwrap().unwrap().task_id, a.task_id);
        assert_eq!(svc.lease_next(None).unwrap().unwrap().task_id, b.task_id);
        assert!(svc.lease_next(None).unwrap().is_none());
    }

    #[test]
    fn task_view_reports_lease_state() {
        let (clock, svc) = service();
        let out = svc.submit(NewPrompt::new("p")).unwrap();
        assert!(!svc.task(&out.task_id).unwrap().leased);

        svc.lease_next(Some(30)).unwrap();
        let view = svc.task(&out.task_id).unwrap();
        assert!(view.leased);
        assert_eq!(view.lease_until, Some(t0() + TimeDelta::seconds(30)));

        clock.advance(TimeDelta::seconds(30));
        let view = svc.task(&out.task_id).unwrap();
        assert!(!view.leased);
        // last lease is kept for diagnostics
        assert_eq!(view.lease_until, Some(t0() + TimeDelta::seconds(30)));
    }

    #[test]
    fn unknown_response_key_is_not_found() {
        let (_, svc) = service();
        let err = svc.response(&DedupeKey::new("nope")).unwrap_err();
        assert_eq!(err, QueueError::UnknownResponse(DedupeKey::new("nope")));
    }

    #[test]
    fn health_reports_clock_time() {
        let (clock, svc) = service();
        clock.advance(TimeDelta::seconds(3));
        let h = svc.health();
        assert!(h.ok);
        assert_eq!(h.time, t0() + TimeDelta::seconds(3));
    }

    #[test]
    fn concurrent_submissions_get_unique_ids() {
        let svc = Arc::new(QueueService::with_system_clock(LeaseBounds::default()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || {
                    (0..100)
                        .map(|i| svc.submit(NewPrompt::new(format!("p{i}"))).unwrap().task_id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<TaskId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 800);
        assert_eq!(svc.metrics().enqueued, 800);
    }

    #[test]
    fn concurrent_leases_never_share_a_task() {
        let svc = Arc::new(QueueService::with_system_clock(LeaseBounds::default()));
        for i in 0..50 {
            svc.submit(NewPrompt::new(format!("p{i}"))).unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || {
                    let mut got = Vec::new();
                    while let Some(env) = svc.lease_next(Some(600)).unwrap() {
                        got.push(env.task_id);
                    }
                    got
                })
            })
            .collect();

        let all: Vec<TaskId> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let unique: HashSet<&TaskId> = all.iter().collect();
        assert_eq!(all.len(), 50);
        assert_eq!(unique.len(), 50);
        assert_eq!(svc.metrics().fetched, 50);
    }

    #[test]
    fn concurrent_completions_observe_exactly_one_fresh() {
        let svc = Arc::new(QueueService::with_system_clock(LeaseBounds::default()));
        let out = svc.submit(NewPrompt::new("p")).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let svc = Arc::clone(&svc);
                let task_id = out.task_id.clone();
                thread::spawn(move || {
                    let report =
                        ResponseEnvelope::new(task_id, format!("answer-{i}")).with_dedupe_key("k");
                    svc.complete(report).unwrap().version
                })
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|v| *v == CompletionVersion::Fresh)
            .count();
        assert_eq!(fresh, 1);
        assert_eq!(svc.metrics().posted, 1);
    }

    #[tokio::test]
    async fn port_delegates_to_service() {
        let (_, svc) = service();
        let queue: Arc<dyn PromptQueue> = Arc::new(svc);

        let out = queue.submit(NewPrompt::new("via port")).await.unwrap();
        let env = queue.lease_next(None).await.unwrap().unwrap();
        assert_eq!(env.task_id, out.task_id);

        let err = queue.submit(NewPrompt::new(" ")).await.unwrap_err();
        assert!(matches!(err, PortError::Queue(QueueError::EmptyPrompt)));

        let ack = queue
            .complete(ResponseEnvelope::new(out.task_id.clone(), "r"))
            .await
            .unwrap();
        assert_eq!(ack.version, CompletionVersion::Fresh);
        assert_eq!(queue.metrics().await.unwrap().posted, 1);
        assert!(queue.health().await.unwrap().ok);
        assert!(queue.task(&out.task_id).await.unwrap().completed);
        assert_eq!(queue.response(&out.dedupe_key).await.unwrap().content, "r");
    }

    /// Subscriber that checks, on every event, whether the queue lock is free.
    struct LockWitness {
        svc: Arc<QueueService>,
        events: Arc<AtomicUsize>,
        held: Arc<AtomicUsize>,
    }

    impl tracing::Subscriber for LockWitness {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }
        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}
        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}
        fn event(&self, _: &tracing::Event<'_>) {
            self.events.fetch_add(1, Ordering::SeqCst);
            if self.svc.state.try_lock().is_err() {
                self.held.fetch_add(1, Ordering::SeqCst);
            }
        }
        fn enter(&self, _: &tracing::span::Id) {}
        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[test]
    fn logging_happens_after_the_lock_is_released() {
        let (clock, svc) = service();
        let svc = Arc::new(svc);
        let events = Arc::new(AtomicUsize::new(0));
        let held = Arc::new(AtomicUsize::new(0));
        let witness = LockWitness {
            svc: Arc::clone(&svc),
            events: Arc::clone(&events),
            held: Arc::clone(&held),
        };

        tracing::subscriber::with_default(witness, || {
            // empty lease, submit, lease, expired re-lease, fresh and duplicate completion
            assert!(svc.lease_next(Some(10)).unwrap().is_none());
            let out = svc.submit(NewPrompt::new("log me")).unwrap();
            svc.lease_next(Some(10)).unwrap().unwrap();
            clock.advance(TimeDelta::seconds(11));
            svc.lease_next(Some(10)).unwrap().unwrap();
            let report = ResponseEnvelope::new(out.task_id.clone(), "r");
            svc.complete(report.clone()).unwrap();
            svc.complete(report).unwrap();
        });

        assert!(events.load(Ordering::SeqCst) >= 6);
        assert_eq!(held.load(Ordering::SeqCst), 0);
    }
}
