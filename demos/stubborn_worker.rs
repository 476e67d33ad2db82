//! # Example: stubborn_worker
//!
//! A worker that ignores `SIGTERM` and `SIGINT`. A graceful stop cannot end
//! it; after the grace period the owner either reports a timeout or, with
//! `auto_kill_on_last_resort`, kills it.
//!
//! ## Flow
//! ```text
//! stop() ─► SIGTERM (ignored) ─► grace elapses ─► StopTimeout
//! kill() ─► SIGKILL ─► Stopped
//!
//! stop() with auto kill ─► SIGTERM (ignored) ─► grace elapses ─► SIGKILL ─► Stopped
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example stubborn_worker
//! ```

use std::thread;
use std::time::{Duration, Instant};

use loopvisor::{Loop, LoopConfig, LoopError, SignalPolicy};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let stubborn = LoopConfig::every(Duration::from_millis(250))
        .with_sigint(SignalPolicy::Ignore)
        .with_sigterm(SignalPolicy::Ignore)
        .with_grace(Duration::from_millis(500));

    // 1. Without kill escalation stop() gives up
    let mut worker = Loop::from_fn(|| println!("[stubborn] still here"), stubborn.clone().with_name("stubborn"));
    worker.start()?;
    thread::sleep(Duration::from_millis(600));
    match worker.stop() {
        Err(LoopError::StopTimeout { pid, grace }) => {
            println!("[owner] worker {pid} survived {grace:?}, killing it");
            worker.kill()?;
        }
        other => other?,
    }
    println!("[owner] state: {}", worker.state());

    // 2. With kill escalation stop() always succeeds
    let mut worker = Loop::from_fn(
        || println!("[stubborn] still here"),
        stubborn.with_auto_kill(true).with_name("stubborn-auto"),
    );
    worker.start()?;
    thread::sleep(Duration::from_millis(600));
    let started = Instant::now();
    worker.stop()?;
    println!("[owner] stopped in {:?}, state: {}", started.elapsed(), worker.state());
    Ok(())
}
