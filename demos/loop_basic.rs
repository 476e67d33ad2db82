//! # Example: loop_basic
//!
//! Runs a closure every 200ms in a worker process, pauses it, resumes it and
//! stops it. The counter lives in shared memory, so the owner sees every
//! increment made by the worker.
//!
//! ## Flow
//! ```text
//! start()  ─► worker ticks: counter += 1
//! pause()  ─► counter frozen
//! resume() ─► ticks again
//! stop()   ─► SIGTERM, worker exits 0
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=loopvisor=debug cargo run --example loop_basic
//! ```

use std::thread;
use std::time::Duration;

use loopvisor::{Loop, LoopConfig, SharedCounter};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let ticks = SharedCounter::new(0)?;
    let seen = ticks.clone();

    // 1. Supervise a closure ticking every 200ms
    let cfg = LoopConfig::every(Duration::from_millis(200)).with_name("ticker");
    let mut worker = Loop::from_fn(
        move || {
            let n = seen.inc(1);
            println!("[ticker] tick #{n}");
        },
        cfg,
    );

    // 2. Start and let it run
    let pid = worker.start()?;
    println!("[owner] worker pid {pid}");
    thread::sleep(Duration::from_secs(1));

    // 3. Pause: the counter stops moving
    worker.pause()?;
    let frozen = ticks.get();
    thread::sleep(Duration::from_secs(1));
    println!("[owner] paused at {frozen}, still {} ({})", ticks.get(), worker.state());

    // 4. Resume and stop
    worker.resume()?;
    thread::sleep(Duration::from_millis(600));
    worker.stop()?;
    println!("[owner] stopped after {} ticks ({})", ticks.get(), worker.state());
    Ok(())
}
