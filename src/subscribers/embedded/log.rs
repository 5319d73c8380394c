//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//!
//! ## Example output
//! ```text
//! [watch] resource="src/main.nim" dirs=2
//! [queued] resource="src/main.nim" running=1 limit=1
//! [admitted] resource="src/main.nim" running=1 limit=1
//! Started compiling nim..
//! [compiled] resource="src/main.nim" elapsed_ms=840
//! [failed] resource="src/main.nim" err="Compiler process exited with error ..."
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Notice printed when a resource compiles again.
pub const RECOMPILE_NOTICE: &str = "Started compiling nim..";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders an event as one log line.
    pub fn render(e: &Event) -> String {
        let resource = e.resource.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        let running = e.running.unwrap_or(0);
        let limit = e.limit.unwrap_or(0);
        match e.kind {
            EventKind::WatchModeDetected => {
                format!("[watch] resource={resource:?} dirs={reason}")
            }
            EventKind::CompileQueued => {
                format!("[queued] resource={resource:?} running={running} limit={limit}")
            }
            EventKind::CompileAdmitted => {
                format!("[admitted] resource={resource:?} running={running} limit={limit}")
            }
            EventKind::RecompileStarted => RECOMPILE_NOTICE.to_string(),
            EventKind::CompileSucceeded => {
                format!(
                    "[compiled] resource={resource:?} elapsed_ms={}",
                    e.elapsed_ms.unwrap_or(0)
                )
            }
            EventKind::CompileFailed => format!("[failed] resource={resource:?} err={reason:?}"),
            EventKind::SubscriberOverflow => {
                format!("[subscriber-overflow] subscriber={resource} reason={reason}")
            }
            EventKind::SubscriberPanicked => {
                format!("[subscriber-panicked] subscriber={resource} info={reason}")
            }
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::render(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
