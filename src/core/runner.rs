//! # Run one admitted compile.
//!
//! Executes the compiler for an admitted [`CompileRequest`], records success,
//! publishes lifecycle events to [`Bus`] and releases its slot.
//!
//! ## Event flow
//!
//! ```text
//! Recompile:
//!   resource in CompletedSet → publish RecompileStarted
//!
//! Success:
//!   compile_to_string() → Ok(out) → CompletedSet.insert → publish CompileSucceeded → release slot
//!
//! Failure:
//!   compile_to_string() → Err(f)  → normalize(f)         → publish CompileFailed    → release slot
//!
//! Panic:
//!   compile_to_string() panics    → treated as Err(message)
//! ```
//!
//! ## Rules
//! - The slot is released **exactly once**, after the terminal event and before the result is returned
//! - Always publishes **exactly one** terminal event: `CompileSucceeded` or `CompileFailed`
//! - Failures are never retried here

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::time::Instant;

use crate::{
    compiler::Compiler,
    core::{completed::CompletedSet, gate::GatePermit, request::CompileRequest},
    error::{CompileError, CompilerFailure, panic_message},
    events::{Bus, Event, EventKind},
};

/// Runs the compiler for `request` while holding `permit`.
pub(crate) async fn run_compile<C: Compiler + ?Sized>(
    compiler: &C,
    request: &CompileRequest,
    permit: GatePermit,
    completed: &CompletedSet,
    bus: &Bus,
) -> Result<String, CompileError> {
    if completed.contains(request.resource()) {
        bus.publish(Event::new(EventKind::RecompileStarted).with_resource(request.resource_arc()));
    }

    let started = Instant::now();
    let fut = compiler.compile_to_string(request.files(), request.options());
    let res = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(CompilerFailure::Message(format!(
            "compiler panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };
    let elapsed = started.elapsed();

    let res = match res {
        Ok(output) => {
            completed.insert(request.resource_arc());
            bus.publish(
                Event::new(EventKind::CompileSucceeded)
                    .with_resource(request.resource_arc())
                    .with_elapsed(elapsed),
            );
            Ok(output)
        }
        Err(failure) => {
            let err = failure.normalize();
            bus.publish(
                Event::new(EventKind::CompileFailed)
                    .with_resource(request.resource_arc())
                    .with_reason(err.to_string())
                    .with_elapsed(elapsed),
            );
            Err(err)
        }
    };
    drop(permit);
    res
}
