//! # Example: progress_multi
//!
//! Three producer workers advance their own counters at different speeds;
//! a fancy progress bar shows all three plus an info line updated by the owner.
//!
//! ## Run
//! ```bash
//! cargo run --example progress_multi
//! ```

use std::thread;
use std::time::Duration;

use loopvisor::{Loop, LoopConfig, ProgressBar, SharedCounter, SharedString, Style};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let totals = [120u64, 80, 200];
    let counts = totals
        .iter()
        .map(|_| SharedCounter::new(0))
        .collect::<Result<Vec<_>, _>>()?;
    let maxima = totals
        .iter()
        .map(|&t| SharedCounter::new(t))
        .collect::<Result<Vec<_>, _>>()?;
    let info = SharedString::new(256)?;

    let mut bar = ProgressBar::builder(counts.clone())
        .max_count(maxima)
        .prepend(["fetch  ", "parse  ", "upload "])
        .style(Style::BarFancy)
        .info_line(info.clone())
        .interval(Duration::from_millis(100))
        .build()?;

    // Producers stop themselves once their counter reaches the total.
    let mut producers = Vec::new();
    for (i, (count, total)) in counts.iter().zip(totals).enumerate() {
        let c = count.clone();
        let every = Duration::from_millis(10 * (i as u64 + 1));
        producers.push(Loop::from_fn(
            move || c.inc(1) >= total,
            LoopConfig::every(every).with_name(format!("producer-{i}")),
        ));
    }

    bar.start()?;
    for p in &mut producers {
        p.start()?;
    }
    while producers.iter().any(Loop::is_alive) {
        let left = producers.iter().filter(|p| p.is_alive()).count();
        info.set(&format!("{left} producer(s) running"));
        thread::sleep(Duration::from_millis(200));
    }
    info.set("all done");
    thread::sleep(Duration::from_millis(200));

    for p in &producers {
        p.stop()?;
    }
    bar.stop()?;
    Ok(())
}
