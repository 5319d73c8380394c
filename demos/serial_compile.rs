//! # Example: Serial Compile
//!
//! Three resources requested at once through a limit-1 scheduler. The stub
//! compiler sleeps instead of invoking `nim`, so the demo runs anywhere.
//!
//! The second request for `main.nim` prints the recompile notice.
//!
//! Run with: `cargo run --example serial_compile`

use std::{path::PathBuf, sync::Arc, time::Duration};

use nimvisor::{
    CompilerFailure, CompilerFn, CompilerOptions, Loader, LogWriter, Scheduler, SchedulerConfig,
};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let compiler = CompilerFn::arc(|files: Vec<PathBuf>, _opts: CompilerOptions| async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        if files.iter().any(|f| f.ends_with("broken.nim")) {
            return Err(CompilerFailure::from("broken.nim(3, 5) Error: undeclared identifier"));
        }
        Ok(format!("// {} file(s)", files.len()))
    });

    let sched = Scheduler::builder(SchedulerConfig::default(), compiler)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();
    let loader = Loader::new(Arc::clone(&sched)).with_argv(["node", "webpack"]);

    let util_opts = json!({ "optimize": true });
    let (a, b, c) = tokio::join!(
        loader.load("src/main.nim", None),
        loader.load("src/util.nim", Some(&util_opts)),
        loader.load("src/broken.nim", None),
    );
    println!("main   -> {:?}", a.map_err(|e| e.as_label()));
    println!("util   -> {:?}", b.map_err(|e| e.as_label()));
    println!("broken -> {:?}", c.map_err(|e| e.to_string()));

    let again = loader.load("src/main.nim", None).await?;
    println!("main (again) -> {again}");
    println!("compiled resources: {}", sched.completed_count());

    sched.shutdown().await;
    Ok(())
}
