use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::scheduler::Scheduler;
use crate::{
    compiler::CompilerRef,
    config::SchedulerConfig,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Scheduler`] with optional subscribers.
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    compiler: CompilerRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration and compiler.
    pub fn new(cfg: SchedulerConfig, compiler: CompilerRef) -> Self {
        Self {
            cfg,
            compiler,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive scheduler events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the scheduler.
    ///
    /// Spawns subscriber workers and the bus listener, so this must be called
    /// from within a tokio runtime.
    pub fn build(self) -> Arc<Scheduler> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        let listener = (!subs.is_empty()).then(|| subscriber_listener(&bus, Arc::clone(&subs)));
        Arc::new(Scheduler::new_internal(
            self.cfg,
            bus,
            subs,
            listener,
            self.compiler,
        ))
    }
}

/// Running bus listener and the signal that stops it.
pub(crate) struct Listener {
    pub(crate) stop: oneshot::Sender<()>,
    pub(crate) handle: JoinHandle<()>,
}

/// Forwards bus events to the subscriber set.
///
/// Once `stop` fires (or its sender is dropped), events already buffered on the
/// bus are forwarded and the listener exits.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>) -> Listener {
    let mut rx = bus.subscribe();
    let (stop, mut stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = &mut stopped => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => set.emit(&ev),
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                        }
                    }
                    break;
                }
            }
        }
    });
    Listener { stop, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use crate::{CompileRequest, CompilerFailure, CompilerFn, CompilerOptions};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    struct Forward(mpsc::UnboundedSender<EventKind>);

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, event: &Event) {
            let _ = self.0.send(event.kind);
        }
    }

    #[tokio::test]
    async fn subscribers_receive_scheduler_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let compiler = CompilerFn::arc(|_files: Vec<PathBuf>, _opts: CompilerOptions| async move {
            Ok::<_, CompilerFailure>("out".to_string())
        });
        let sched = SchedulerBuilder::new(SchedulerConfig::default(), compiler)
            .with_subscriber(Arc::new(Forward(tx)))
            .build();
        assert!(sched.has_subscribers());

        sched
            .schedule(CompileRequest::new("a.nim", vec![PathBuf::from("a.nim")]))
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(EventKind::CompileAdmitted));
        assert_eq!(rx.recv().await, Some(EventKind::CompileSucceeded));
    }

    #[tokio::test]
    async fn shutdown_flushes_pending_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let compiler = CompilerFn::arc(|_files: Vec<PathBuf>, _opts: CompilerOptions| async move {
            Ok::<_, CompilerFailure>("out".to_string())
        });
        let sched = SchedulerBuilder::new(SchedulerConfig::default(), compiler)
            .with_subscriber(Arc::new(Forward(tx)))
            .build();

        let req = CompileRequest::new("a.nim", vec![PathBuf::from("a.nim")]);
        sched.schedule(req.clone()).await.unwrap();
        sched.schedule(req).await.unwrap();
        sched.shutdown().await;

        let mut kinds = Vec::new();
        while let Ok(kind) = rx.try_recv() {
            kinds.push(kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::CompileAdmitted,
                EventKind::CompileSucceeded,
                EventKind::CompileAdmitted,
                EventKind::RecompileStarted,
                EventKind::CompileSucceeded,
            ]
        );
        assert!(!sched.has_subscribers());
    }
}
