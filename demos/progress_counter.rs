//! # Example: progress_counter
//!
//! Repeated batches over the same counters. After each batch the owner
//! resets the slot, so the counter style shows how many batches ran and
//! at what rate, while the bar restarts from zero.
//!
//! ## Flow
//! ```text
//! batch: worker counts 0..50 ─► owner: reset(i) ─► cycles += 1 ─► next batch
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example progress_counter
//! ```

use std::thread;
use std::time::Duration;

use loopvisor::{Loop, LoopConfig, ProgressBar, SharedCounter};

const BATCH: u64 = 50;
const BATCHES: usize = 4;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let count = SharedCounter::with_max(0, BATCH)?;
    let mut bar = ProgressBar::builder([count.clone()])
        .prepend(["batch "])
        .style(loopvisor::Style::CounterFancy)
        .interval(Duration::from_millis(50))
        .build()?;
    bar.start()?;

    for _ in 0..BATCHES {
        let c = count.clone();
        let mut worker = Loop::from_fn(
            move || c.inc(1) >= BATCH,
            LoopConfig::every(Duration::from_millis(10)).with_name("batch"),
        );
        worker.start()?;
        while worker.is_alive() {
            thread::sleep(Duration::from_millis(20));
        }
        worker.stop()?;
        bar.reset(0)?;
    }

    thread::sleep(Duration::from_millis(100));
    bar.stop()?;
    println!("{BATCHES} batches of {BATCH}");
    Ok(())
}
