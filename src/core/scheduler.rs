//! # Scheduler: admission-controlled compile execution.
//!
//! The [`Scheduler`] owns the admission gate, the set of resources that already
//! compiled once, the event bus and the compiler. One instance is built per
//! process and shared by reference (`Arc<Scheduler>`) with every loader call.
//!
//! ## Architecture
//! ```text
//! schedule(request) / submit(request)
//!     │
//!     ├─► gate.enter(limit) ── slot free ──────────────► Admitted
//!     │          └──────────── full ─► publish CompileQueued
//!     │                                   └─► wait (FIFO wake or poll) ─► Admitted
//!     │
//!     ├─► publish CompileAdmitted
//!     ├─► runner::run_compile()
//!     │       ├─ RecompileStarted (resource compiled before)
//!     │       ├─ compiler.compile_to_string(files, options)
//!     │       ├─ release slot (exactly once)
//!     │       └─ CompileSucceeded / CompileFailed
//!     └─► deliver one Result<String, CompileError>
//! ```
//!
//! ## Rules
//! - At most `limit` compiles run at once, `limit` coming from the request or the config
//! - Every request gets its own result; completions never share a delivery path
//! - Only admission waits; compile failures are terminal
//! - No timeouts: a hung compiler holds its slot until it returns
//! - [`Scheduler::shutdown`] stops admission, waits for running compiles and flushes subscribers
//!
//! ## Example
//! ```rust
//! use std::path::PathBuf;
//! use nimvisor::{
//!     CompileRequest, CompilerFailure, CompilerFn, CompilerOptions, Scheduler, SchedulerConfig,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let compiler = CompilerFn::arc(|files: Vec<PathBuf>, _opts: CompilerOptions| async move {
//!         Ok::<_, CompilerFailure>(format!("// {} file(s)", files.len()))
//!     });
//!     let scheduler = Scheduler::builder(SchedulerConfig::default(), compiler).build();
//!
//!     let req = CompileRequest::new("src/main.nim", vec!["src/main.nim".into()]);
//!     let out = scheduler.schedule(req).await.unwrap();
//!     assert_eq!(out, "// 1 file(s)");
//!     assert!(scheduler.has_compiled("src/main.nim"));
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, oneshot, watch};

use crate::{
    compiler::CompilerRef,
    config::SchedulerConfig,
    core::{
        builder::{Listener, SchedulerBuilder},
        completed::CompletedSet,
        gate::{AdmissionGate, Entry},
        request::{CompileHandle, CompileRequest, RequestState},
        runner,
    },
    error::CompileError,
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
};

/// Admission-controlled compile scheduler.
pub struct Scheduler {
    cfg: SchedulerConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    listener: Mutex<Option<Listener>>,
    gate: Arc<AdmissionGate>,
    completed: CompletedSet,
    compiler: CompilerRef,
}

impl Scheduler {
    /// Returns a builder for a scheduler driving `compiler`.
    pub fn builder(cfg: SchedulerConfig, compiler: CompilerRef) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg, compiler)
    }

    pub(crate) fn new_internal(
        cfg: SchedulerConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        listener: Option<Listener>,
        compiler: CompilerRef,
    ) -> Self {
        let gate = Arc::new(AdmissionGate::new(
            cfg.admission,
            cfg.poll_interval_clamped(),
        ));
        Self {
            cfg,
            bus,
            subs,
            listener: Mutex::new(listener),
            gate,
            completed: CompletedSet::new(),
            compiler,
        }
    }

    /// Compiles `request` once a slot is free and returns its single result.
    pub async fn schedule(&self, request: CompileRequest) -> Result<String, CompileError> {
        let (state, _) = watch::channel(RequestState::Pending);
        let entry = self.enter(&request);
        self.drive(request, entry, &state).await
    }

    /// Queues `request` immediately and runs it in the background.
    ///
    /// Admission order follows call order. Must be called within a tokio runtime.
    pub fn submit(self: &Arc<Self>, request: CompileRequest) -> CompileHandle {
        let (state_tx, state_rx) = watch::channel(RequestState::Pending);
        let (result_tx, result_rx) = oneshot::channel();
        let entry = self.enter(&request);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let res = this.drive(request, entry, &state_tx).await;
            let _ = result_tx.send(res);
        });
        CompileHandle::new(state_rx, result_rx)
    }

    /// Like [`submit`](Self::submit), delivering the result to `callback` exactly once.
    pub fn submit_with_callback<F>(self: &Arc<Self>, request: CompileRequest, callback: F)
    where
        F: FnOnce(Result<String, CompileError>) + Send + 'static,
    {
        let (state, _) = watch::channel(RequestState::Pending);
        let entry = self.enter(&request);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            callback(this.drive(request, entry, &state).await);
        });
    }

    /// Number of compiles currently running.
    pub fn running(&self) -> usize {
        self.gate.running()
    }

    /// Number of requests waiting for a slot (queued or polling).
    pub fn pending(&self) -> usize {
        self.gate.pending()
    }

    /// Whether `resource` compiled successfully at least once.
    pub fn has_compiled(&self, resource: &str) -> bool {
        self.completed.contains(resource)
    }

    /// Number of distinct resources that compiled successfully.
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Fails waiting and future requests with [`CompileError::Closed`].
    ///
    /// Compiles already running finish and deliver normally.
    pub fn close(&self) {
        self.gate.close();
    }

    /// Closes the gate, waits for running compiles, then flushes every subscriber.
    ///
    /// Events published before this returns have been handed to subscribers.
    /// Requests still waiting fail with [`CompileError::Closed`].
    pub async fn shutdown(&self) {
        self.gate.close();
        self.gate.idle().await;

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Listener { stop, handle }) = listener {
            let _ = stop.send(());
            let _ = handle.await;
        }
        self.subs.shutdown().await;
    }

    /// Scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Event bus shared with the runner and loader.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Returns a receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Whether any subscriber is attached.
    pub fn has_subscribers(&self) -> bool {
        !self.subs.is_empty()
    }

    fn limit_for(&self, request: &CompileRequest) -> usize {
        request
            .limit()
            .unwrap_or_else(|| self.cfg.concurrency_limit())
            .max(1)
    }

    fn enter(&self, request: &CompileRequest) -> Result<Entry, CompileError> {
        let limit = self.limit_for(request);
        let entry = self.gate.enter(limit)?;
        if matches!(entry, Entry::Queued(_)) {
            self.bus.publish(
                Event::new(EventKind::CompileQueued)
                    .with_resource(request.resource_arc())
                    .with_gate(self.gate.running(), limit),
            );
        }
        Ok(entry)
    }

    async fn drive(
        &self,
        request: CompileRequest,
        entry: Result<Entry, CompileError>,
        state: &watch::Sender<RequestState>,
    ) -> Result<String, CompileError> {
        let limit = self.limit_for(&request);
        let admitted = match entry {
            Ok(Entry::Admitted(permit)) => Ok(permit),
            Ok(Entry::Queued(pending)) => pending.admitted().await,
            Err(e) => Err(e),
        };
        let permit = match admitted {
            Ok(permit) => permit,
            Err(e) => {
                state.send_replace(RequestState::Failed);
                self.bus.publish(
                    Event::new(EventKind::CompileFailed)
                        .with_resource(request.resource_arc())
                        .with_reason(e.to_string()),
                );
                return Err(e);
            }
        };

        state.send_replace(RequestState::Admitted);
        self.bus.publish(
            Event::new(EventKind::CompileAdmitted)
                .with_resource(request.resource_arc())
                .with_gate(self.gate.running(), limit),
        );

        state.send_replace(RequestState::Running);
        let res = runner::run_compile(
            self.compiler.as_ref(),
            &request,
            permit,
            &self.completed,
            &self.bus,
        )
        .await;

        state.send_replace(if res.is_ok() {
            RequestState::Succeeded
        } else {
            RequestState::Failed
        });
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompilerFailure, CompilerFn, CompilerOptions, config::AdmissionMode};
    use serde_json::{Value, json};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        current: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        finished: Mutex<Vec<String>>,
    }

    /// Compiler that sleeps `delay_ms` and fails when `fail` is set.
    fn recording_compiler(rec: Arc<Recorder>) -> CompilerRef {
        CompilerFn::arc(move |files: Vec<PathBuf>, opts: CompilerOptions| {
            let rec = Arc::clone(&rec);
            async move {
                rec.calls.fetch_add(1, SeqCst);
                let now = rec.current.fetch_add(1, SeqCst) + 1;
                rec.peak.fetch_max(now, SeqCst);

                let ms = opts.extra.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;

                rec.current.fetch_sub(1, SeqCst);
                let name = files[0].display().to_string();
                rec.finished.lock().unwrap().push(name.clone());

                match opts.extra.get("fail").and_then(Value::as_str) {
                    Some(msg) => Err(CompilerFailure::from(msg)),
                    None => Ok(format!("compiled {name}")),
                }
            }
        })
    }

    fn request(name: &str, delay_ms: u64) -> CompileRequest {
        let mut opts = CompilerOptions::default();
        opts.extra.insert("delay_ms".into(), json!(delay_ms));
        CompileRequest::new(name, vec![PathBuf::from(name)]).with_options(opts)
    }

    fn failing(name: &str, msg: &str) -> CompileRequest {
        let mut opts = CompilerOptions::default();
        opts.extra.insert("fail".into(), json!(msg));
        CompileRequest::new(name, vec![PathBuf::from(name)]).with_options(opts)
    }

    fn scheduler(max_concurrent: usize, rec: &Arc<Recorder>) -> Arc<Scheduler> {
        let cfg = SchedulerConfig {
            max_concurrent,
            ..SchedulerConfig::default()
        };
        Scheduler::builder(cfg, recording_compiler(Arc::clone(rec))).build()
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn limit_one_serializes_compiles() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);
        let start = Instant::now();

        let handles = vec![
            sched.submit(request("one.nim", 10)),
            sched.submit(request("two.nim", 5)),
            sched.submit(request("three.nim", 1)),
        ];
        for h in handles {
            assert!(h.result().await.is_ok());
        }

        assert!(start.elapsed() >= Duration::from_millis(16));
        assert_eq!(rec.peak.load(SeqCst), 1);
        assert_eq!(
            *rec.finished.lock().unwrap(),
            vec!["one.nim", "two.nim", "three.nim"]
        );
        assert_eq!(sched.running(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn limit_two_runs_side_by_side() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(2, &rec);
        let start = Instant::now();

        let a = sched.submit(request("a.nim", 10));
        let b = sched.submit(request("b.nim", 5));
        assert_eq!(a.result().await.unwrap(), "compiled a.nim");
        assert_eq!(b.result().await.unwrap(), "compiled b.nim");

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_millis(15));
        assert_eq!(rec.peak.load(SeqCst), 2);
        // b finished first even though it was admitted second
        assert_eq!(*rec.finished.lock().unwrap(), vec!["b.nim", "a.nim"]);
    }

    #[tokio::test(start_paused = true)]
    async fn running_never_exceeds_limit() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(3, &rec);

        let handles: Vec<_> = (0..12u64)
            .map(|i| sched.submit(request(&format!("m{i}.nim"), 1 + (i * 7) % 13)))
            .collect();
        for h in handles {
            h.result().await.unwrap();
        }

        assert_eq!(rec.peak.load(SeqCst), 3);
        assert_eq!(rec.calls.load(SeqCst), 12);
        assert_eq!(sched.running(), 0);
        assert_eq!(sched.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn every_callback_fires_exactly_once() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(2, &rec);
        let counts: Arc<Vec<AtomicUsize>> = Arc::new((0..6).map(|_| AtomicUsize::new(0)).collect());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for i in 0..6usize {
            let req = if i % 3 == 0 {
                failing(&format!("f{i}.nim"), "boom")
            } else {
                request(&format!("s{i}.nim"), 3)
            };
            let counts = Arc::clone(&counts);
            let tx = tx.clone();
            sched.submit_with_callback(req, move |res| {
                counts[i].fetch_add(1, SeqCst);
                let _ = tx.send((i, res.is_ok()));
            });
        }
        drop(tx);

        let mut delivered = Vec::new();
        while let Some(item) = rx.recv().await {
            delivered.push(item);
        }
        delivered.sort();

        assert_eq!(delivered.len(), 6);
        for (i, ok) in delivered {
            assert_eq!(ok, i % 3 != 0, "request {i}");
        }
        assert!(counts.iter().all(|c| c.load(SeqCst) == 1));
        assert_eq!(sched.running(), 0);
    }

    #[tokio::test]
    async fn string_failure_is_normalized() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);

        let err = sched.schedule(failing("bad.nim", "boom")).await.unwrap_err();
        assert_eq!(err.to_string(), "Compiler process exited with error boom");
        assert!(!sched.has_compiled("bad.nim"));
        assert_eq!(sched.running(), 0);
    }

    #[tokio::test]
    async fn failure_releases_the_slot_for_the_next_request() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);

        let bad = sched.submit(failing("bad.nim", "boom"));
        let good = sched.submit(request("good.nim", 0));
        assert!(bad.result().await.is_err());
        assert_eq!(good.result().await.unwrap(), "compiled good.nim");
        assert_eq!(sched.completed_count(), 1);
    }

    #[tokio::test]
    async fn recompile_notice_only_after_first_success() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);
        let mut rx = sched.subscribe();

        sched.schedule(request("main.nim", 0)).await.unwrap();
        let first = drain(&mut rx);
        assert!(!first.iter().any(|e| e.kind == EventKind::RecompileStarted));

        sched.schedule(request("main.nim", 0)).await.unwrap();
        let second = drain(&mut rx);
        let kinds: Vec<_> = second.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::CompileAdmitted,
                EventKind::RecompileStarted,
                EventKind::CompileSucceeded
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queued_request_reports_states() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);
        let mut rx = sched.subscribe();

        let mut first = sched.submit(request("first.nim", 10));
        let second = sched.submit(request("second.nim", 1));
        assert_eq!(second.state(), RequestState::Pending);
        assert_eq!(sched.pending(), 1);

        assert_eq!(first.wait_for(RequestState::Running).await, RequestState::Running);
        assert_eq!(second.state(), RequestState::Pending);

        first.result().await.unwrap();
        second.result().await.unwrap();

        let queued: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::CompileQueued)
            .collect();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].resource.as_deref(), Some("second.nim"));
        assert_eq!(queued[0].running, Some(1));
        assert_eq!(queued[0].limit, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn per_request_limit_overrides_config() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);

        let a = sched.submit(request("a.nim", 10).with_limit(2));
        let b = sched.submit(request("b.nim", 10).with_limit(2));
        a.result().await.unwrap();
        b.result().await.unwrap();
        assert_eq!(rec.peak.load(SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_mode_admits_on_the_next_tick() {
        let rec = Arc::new(Recorder::default());
        let cfg = SchedulerConfig {
            admission: AdmissionMode::Poll,
            ..SchedulerConfig::default()
        };
        let sched = Scheduler::builder(cfg, recording_compiler(Arc::clone(&rec))).build();
        let start = Instant::now();

        let a = sched.submit(request("a.nim", 10));
        let b = sched.submit(request("b.nim", 10));
        a.result().await.unwrap();
        b.result().await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(210));
        assert_eq!(rec.peak.load(SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_mode_reports_waiting_requests() {
        let rec = Arc::new(Recorder::default());
        let cfg = SchedulerConfig {
            admission: AdmissionMode::Poll,
            ..SchedulerConfig::default()
        };
        let sched = Scheduler::builder(cfg, recording_compiler(Arc::clone(&rec))).build();

        let a = sched.submit(request("a.nim", 10));
        let b = sched.submit(request("b.nim", 10));
        assert_eq!(sched.running(), 1);
        assert_eq!(sched.pending(), 1);
        assert_eq!(b.state(), RequestState::Pending);

        a.result().await.unwrap();
        b.result().await.unwrap();
        assert_eq!(sched.pending(), 0);
        assert_eq!(sched.running(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_running_compiles() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);
        let start = Instant::now();

        let running = sched.submit(request("running.nim", 20));
        let waiting = sched.submit(request("waiting.nim", 1));
        sched.shutdown().await;

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(sched.running(), 0);
        assert!(running.result().await.is_ok());
        assert_eq!(waiting.result().await, Err(CompileError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn close_fails_waiting_requests_only() {
        let rec = Arc::new(Recorder::default());
        let sched = scheduler(1, &rec);

        let running = sched.submit(request("running.nim", 10));
        let waiting = sched.submit(request("waiting.nim", 1));
        sched.close();

        assert!(running.result().await.is_ok());
        assert_eq!(waiting.result().await, Err(CompileError::Closed));
        assert_eq!(
            sched.schedule(request("late.nim", 1)).await,
            Err(CompileError::Closed)
        );
        assert_eq!(rec.calls.load(SeqCst), 1);
    }

    #[tokio::test]
    async fn compiler_panic_is_delivered_as_failure() {
        let compiler = CompilerFn::arc(|_files: Vec<PathBuf>, _opts: CompilerOptions| async move {
            if true {
                panic!("nim crashed");
            }
            Ok::<String, CompilerFailure>(String::new())
        });
        let sched = Scheduler::builder(SchedulerConfig::default(), compiler).build();

        let err = sched
            .schedule(CompileRequest::new("x.nim", vec![PathBuf::from("x.nim")]))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Compiler process exited with error compiler panicked: nim crashed"
        );
        assert_eq!(sched.running(), 0);
    }
}
