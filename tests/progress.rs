//! Progress bars rendering into files while producer workers advance the counters.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::thread;
use std::time::{Duration, Instant};

use loopvisor::{
    FileTerminal, Loop, LoopConfig, LoopError, ProgressBar, SharedCounter, SharedString, Style,
    SupervisorState, Width,
};

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn output() -> (File, FileTerminal) {
    let file = tempfile::tempfile().unwrap();
    let term = FileTerminal::new(file.try_clone().unwrap(), 80);
    (file, term)
}

fn read_all(mut file: &File) -> String {
    let mut out = String::new();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.read_to_string(&mut out).unwrap();
    out
}

/// Text of the last frame drawn.
fn last_frame(out: &str) -> &str {
    let body = out.strip_suffix("\u{1b}[J").unwrap_or(out);
    body.rsplit("\u{1b}[J").next().unwrap_or(body)
}

#[test]
fn producers_drive_the_display() {
    let counts = [SharedCounter::new(0).unwrap(), SharedCounter::new(0).unwrap()];
    let max = [SharedCounter::new(20).unwrap(), SharedCounter::new(40).unwrap()];
    let (file, term) = output();

    let mut bar = ProgressBar::builder(counts.clone())
        .max_count(max)
        .prepend(["a: ", "b: "])
        .interval(Duration::from_millis(20))
        .terminal(term)
        .build()
        .unwrap();
    bar.start().unwrap();

    let c = counts[0].clone();
    let mut producer = Loop::from_fn(move || c.inc(1) >= 20, LoopConfig::every(Duration::from_millis(5)));
    producer.start().unwrap();
    assert!(wait_until(Duration::from_secs(5), || !producer.is_alive()));
    producer.stop().unwrap();

    thread::sleep(Duration::from_millis(60));
    bar.stop().unwrap();
    assert_eq!(bar.state(), SupervisorState::Stopped);

    let out = read_all(&file);
    assert!(out.contains("\u{1b}[2A"), "frames were not redrawn in place");
    let frame = last_frame(&out);
    assert!(frame.contains("a: [===="), "{frame:?}");
    assert!(frame.contains("100.00%"), "{frame:?}");
    assert!(frame.contains("  0.00%"), "{frame:?}");
    assert_eq!(frame.matches('\n').count(), 2);
}

#[test]
fn reset_starts_a_new_cycle_for_one_slot() {
    let counts = [SharedCounter::with_max(5, 10).unwrap(), SharedCounter::with_max(7, 10).unwrap()];
    let (file, term) = output();
    let mut bar = ProgressBar::builder(counts.clone())
        .style(Style::Counter)
        .interval(Duration::from_millis(20))
        .terminal(term)
        .build()
        .unwrap();
    bar.start().unwrap();

    bar.reset(0).unwrap();
    assert_eq!(counts[0].get(), 0);
    assert_eq!(counts[1].get(), 7);
    assert!(matches!(bar.reset(2), Err(LoopError::SlotOutOfRange { index: 2, len: 2 })));

    thread::sleep(Duration::from_millis(60));
    bar.stop().unwrap();

    let frame = last_frame(&read_all(&file)).to_string();
    assert!(frame.contains("\u{1b}[2K1 ["), "{frame:?}");
    assert!(frame.contains("\u{1b}[2K0 ["), "{frame:?}");
    assert!(frame.contains("  0.00%"), "{frame:?}");
    assert!(frame.contains(" 70.00%"), "{frame:?}");
}

#[test]
fn labels_and_info_follow_the_owner() {
    let count = SharedCounter::new(3).unwrap();
    let info = SharedString::new(128).unwrap();
    let (file, term) = output();
    let mut bar = ProgressBar::builder([count])
        .prepend(["before "])
        .info_line(info.clone())
        .width(Width::Fixed(50))
        .interval(Duration::from_millis(20))
        .terminal(term)
        .build()
        .unwrap();
    bar.start().unwrap();

    bar.set_prepend(0, "after ").unwrap();
    info.set("first\nsecond");
    thread::sleep(Duration::from_millis(80));
    bar.stop().unwrap();

    let out = read_all(&file);
    let frame = last_frame(&out);
    assert!(frame.contains("after "), "{frame:?}");
    assert!(frame.contains("#3"), "{frame:?}");
    assert!(frame.contains("first"), "{frame:?}");
    assert!(frame.contains("second"), "{frame:?}");
    assert_eq!(frame.matches('\n').count(), 3);
}

/// A restarted renderer is a fresh process and does not move over the old frame.
#[test]
fn restart_draws_below_previous_output() {
    let count = SharedCounter::with_max(1, 2).unwrap();
    let (file, term) = output();
    let mut bar = ProgressBar::builder([count])
        .interval(Duration::from_millis(20))
        .terminal(term)
        .build()
        .unwrap();

    bar.start().unwrap();
    thread::sleep(Duration::from_millis(60));
    bar.stop().unwrap();
    bar.start().unwrap();
    thread::sleep(Duration::from_millis(60));
    bar.stop().unwrap();

    let out = read_all(&file);
    let frames = out.matches("\u{1b}[J").count();
    let moves = out.matches("\u{1b}[1A").count();
    assert!(frames >= 4, "{frames} frames");
    assert_eq!(moves, frames - 2);
}

#[test]
fn paused_bar_stops_drawing() {
    let count = SharedCounter::with_max(1, 2).unwrap();
    let (file, term) = output();
    let mut bar = ProgressBar::builder([count])
        .interval(Duration::from_millis(10))
        .terminal(term)
        .build()
        .unwrap();
    bar.start().unwrap();
    thread::sleep(Duration::from_millis(40));

    bar.pause().unwrap();
    thread::sleep(Duration::from_millis(40));
    let len = file.metadata().unwrap().len();
    thread::sleep(Duration::from_millis(80));
    assert_eq!(file.metadata().unwrap().len(), len);

    bar.resume().unwrap();
    assert!(wait_until(Duration::from_secs(2), || file.metadata().unwrap().len() > len));
    bar.stop().unwrap();
}

#[test]
fn invalid_configurations_are_rejected() {
    let counts = || [SharedCounter::new(0).unwrap(), SharedCounter::new(0).unwrap()];
    let quiet = || FileTerminal::new(tempfile::tempfile().unwrap(), 80);

    let err = ProgressBar::builder(counts())
        .max_count([SharedCounter::new(1).unwrap()])
        .terminal(quiet())
        .build()
        .unwrap_err();
    assert!(matches!(err, LoopError::InvalidConfiguration { .. }));

    let err = ProgressBar::builder(counts())
        .speed_calc_cycles(1)
        .terminal(quiet())
        .build()
        .unwrap_err();
    assert!(matches!(err, LoopError::InvalidConfiguration { .. }));

    let empty: [SharedCounter; 0] = [];
    assert!(ProgressBar::builder(empty).terminal(quiet()).build().is_err());
}
