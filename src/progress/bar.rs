//! # ProgressBar: a supervised renderer over shared counters.
//!
//! A [`ProgressBar`] is a [`Loop`] whose work is the renderer. Producers
//! (other loops, threads, the owner itself) increment [`SharedCounter`]s; the
//! renderer's worker samples them every interval and redraws the terminal.
//!
//! ```text
//! producer loop(s) ──inc──► SharedCounter[i] ◄──get── renderer worker ──► terminal
//! owner ──reset(i) / set_prepend(i)──► slot i (shared memory)     ▲
//!   └──start / stop / pause / resume (signals) ───────────────────┘
//! ```
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use loopvisor::{ProgressBar, SharedCounter, Style};
//!
//! let done = SharedCounter::new(0)?;
//! let total = SharedCounter::new(100)?;
//!
//! let bar = ProgressBar::builder([done.clone()])
//!     .max_count([total])
//!     .prepend(["files: "])
//!     .style(Style::BarFancy)
//!     .interval(Duration::from_millis(100))
//!     .build()?;
//!
//! bar.scope(|bar| {
//!     bar.start()?;
//!     for _ in 0..100 {
//!         done.inc(1);
//!         std::thread::sleep(Duration::from_millis(10));
//!     }
//!     Ok::<_, loopvisor::LoopError>(())
//! })??;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::time::Duration;

use crate::config::LoopConfig;
use crate::core::{Loop, SupervisorState};
use crate::error::LoopError;
use crate::policies::SignalPolicy;
use crate::progress::format::Style;
use crate::progress::render::{Renderer, Slot, unix_micros};
use crate::progress::speed::DEFAULT_SPEED_CALC_CYCLES;
use crate::progress::terminal::{StdoutTerminal, Terminal, Width};
use crate::shared::{SharedCounter, SharedString};

/// Live progress display for one or more shared counters.
pub struct ProgressBar {
    inner: Loop<Renderer>,
}

impl ProgressBar {
    /// Starts configuring a bar over `counts`, one line per counter.
    pub fn builder(counts: impl IntoIterator<Item = SharedCounter>) -> ProgressBarBuilder {
        ProgressBarBuilder::new(counts.into_iter().collect())
    }

    /// Single ASCII bar of `count` towards `max_count`.
    pub fn new(count: SharedCounter, max_count: SharedCounter) -> Result<Self, LoopError> {
        Self::builder([count]).max_count([max_count]).build()
    }

    /// Single colored bar of `count` towards `max_count`.
    pub fn fancy(count: SharedCounter, max_count: SharedCounter) -> Result<Self, LoopError> {
        Self::builder([count])
            .max_count([max_count])
            .style(Style::BarFancy)
            .build()
    }

    /// One line per counter with cycle counts; totals come from the counters' max hints.
    pub fn counter(counts: impl IntoIterator<Item = SharedCounter>) -> Result<Self, LoopError> {
        Self::builder(counts).style(Style::Counter).build()
    }

    /// Colored variant of [`counter`](Self::counter).
    pub fn counter_fancy(
        counts: impl IntoIterator<Item = SharedCounter>,
    ) -> Result<Self, LoopError> {
        Self::builder(counts).style(Style::CounterFancy).build()
    }

    /// Starts the renderer worker and returns its pid.
    ///
    /// A restarted bar draws a fresh frame below whatever was printed meanwhile.
    pub fn start(&mut self) -> Result<i32, LoopError> {
        self.inner.start()
    }

    /// Stops the renderer; the final frame stays on screen.
    pub fn stop(&self) -> Result<(), LoopError> {
        self.inner.stop()
    }

    /// Stops the renderer, killing it if it outlives the grace period.
    pub fn terminate(&self) -> Result<(), LoopError> {
        self.inner.terminate()
    }

    /// Freezes the display.
    pub fn pause(&self) -> Result<(), LoopError> {
        self.inner.pause()
    }

    /// Unfreezes the display.
    pub fn resume(&self) -> Result<(), LoopError> {
        self.inner.resume()
    }

    /// Returns `true` while the renderer worker exists.
    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Pid of the current or last renderer worker.
    pub fn getpid(&self) -> Option<i32> {
        self.inner.getpid()
    }

    /// Lifecycle state of the renderer.
    pub fn state(&self) -> SupervisorState {
        self.inner.state()
    }

    /// Number of tracked counters.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// Always `false`; a bar tracks at least one counter.
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    /// Starts a new cycle for slot `i`.
    ///
    /// Sets the counter to zero, restarts its elapsed time and discards its
    /// speed history; other slots are untouched. Takes the counter's lock, so
    /// it must not be called while holding a guard of the same counter.
    pub fn reset(&self, i: usize) -> Result<(), LoopError> {
        self.slot(i)?.reset(unix_micros());
        Ok(())
    }

    /// Replaces the label of slot `i`; visible from the next frame.
    pub fn set_prepend(&self, i: usize, label: &str) -> Result<(), LoopError> {
        self.slot(i)?.prepend.set(label);
        Ok(())
    }

    /// Replaces all labels; one label is applied to every slot.
    pub fn set_prepends<S: AsRef<str>>(
        &self,
        labels: impl IntoIterator<Item = S>,
    ) -> Result<(), LoopError> {
        let labels: Vec<S> = labels.into_iter().collect();
        let slots = self.slots();
        match labels.len() {
            1 => slots.iter().for_each(|s| s.prepend.set(labels[0].as_ref())),
            n if n == slots.len() => {
                for (slot, label) in slots.iter().zip(&labels) {
                    slot.prepend.set(label.as_ref());
                }
            }
            n => {
                return Err(LoopError::invalid(format!(
                    "{n} prepend labels for {} counters",
                    slots.len()
                )));
            }
        }
        Ok(())
    }

    /// Current label of slot `i`.
    pub fn prepend(&self, i: usize) -> Result<String, LoopError> {
        Ok(self.slot(i)?.prepend.get())
    }

    /// Runs `body`, then terminates the renderer, also when `body` panics.
    pub fn scope<T>(mut self, body: impl FnOnce(&mut Self) -> T) -> Result<T, LoopError> {
        let value = body(&mut self);
        self.terminate()?;
        Ok(value)
    }

    fn slots(&self) -> &[Slot] {
        &self.inner.work().slots
    }

    fn slot(&self, index: usize) -> Result<&Slot, LoopError> {
        let slots = self.slots();
        slots.get(index).ok_or(LoopError::SlotOutOfRange {
            index,
            len: slots.len(),
        })
    }
}

impl fmt::Debug for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBar")
            .field("slots", &self.len())
            .field("loop", &self.inner)
            .finish()
    }
}

/// Fluent configuration of a [`ProgressBar`]; validated by [`build`](Self::build).
///
/// ## Defaults
/// - `interval = 1s`, `grace = 1s`
/// - `speed_calc_cycles = 10`
/// - `width = Width::Auto`, `style = Style::Bar`
/// - no maxima (each counter's own max hint is used), no labels, no info line
/// - `sigint = sigterm = SignalPolicy::Stop`
/// - output to standard output
#[must_use]
pub struct ProgressBarBuilder {
    counts: Vec<SharedCounter>,
    max_count: Option<Vec<SharedCounter>>,
    prepend: Vec<String>,
    slot_widths: Option<Vec<Width>>,
    width: Width,
    style: Style,
    interval: Duration,
    grace: Duration,
    speed_calc_cycles: usize,
    info_line: Option<SharedString>,
    sigint: SignalPolicy,
    sigterm: SignalPolicy,
    terminal: Option<Box<dyn Terminal>>,
    name: String,
}

impl ProgressBarBuilder {
    fn new(counts: Vec<SharedCounter>) -> Self {
        let defaults = LoopConfig::default();
        Self {
            counts,
            max_count: None,
            prepend: Vec::new(),
            slot_widths: None,
            width: Width::Auto,
            style: Style::Bar,
            interval: defaults.interval,
            grace: defaults.grace,
            speed_calc_cycles: DEFAULT_SPEED_CALC_CYCLES,
            info_line: None,
            sigint: defaults.sigint,
            sigterm: defaults.sigterm,
            terminal: None,
            name: "progress".to_string(),
        }
    }

    /// Totals, one per counter. A total of `0` hides that slot's bar.
    pub fn max_count(mut self, max: impl IntoIterator<Item = SharedCounter>) -> Self {
        self.max_count = Some(max.into_iter().collect());
        self
    }

    /// Labels in front of each line; a single label applies to every line.
    pub fn prepend<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.prepend = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Time between frames.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Grace period of `stop()` before the renderer is killed.
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Number of frames the speed is averaged over (at least 2).
    pub fn speed_calc_cycles(mut self, cycles: usize) -> Self {
        self.speed_calc_cycles = cycles;
        self
    }

    /// Width of every line.
    pub fn width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    /// Width per line, overriding [`width`](Self::width).
    pub fn slot_widths(mut self, widths: impl IntoIterator<Item = Width>) -> Self {
        self.slot_widths = Some(widths.into_iter().collect());
        self
    }

    /// Rendering variant.
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Free text shown beneath the bars; may span several lines.
    pub fn info_line(mut self, info: SharedString) -> Self {
        self.info_line = Some(info);
        self
    }

    /// Renderer reaction to `SIGINT`.
    pub fn sigint(mut self, policy: SignalPolicy) -> Self {
        self.sigint = policy;
        self
    }

    /// Renderer reaction to `SIGTERM`.
    pub fn sigterm(mut self, policy: SignalPolicy) -> Self {
        self.sigterm = policy;
        self
    }

    /// Output target instead of standard output.
    pub fn terminal(mut self, terminal: impl Terminal + 'static) -> Self {
        self.terminal = Some(Box::new(terminal));
        self
    }

    /// Label used in log records.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validates the configuration and allocates the shared slots.
    ///
    /// Fails with [`LoopError::InvalidConfiguration`] when list lengths do not
    /// match the number of counters, or a value is out of range.
    pub fn build(self) -> Result<ProgressBar, LoopError> {
        let n = self.counts.len();
        if n == 0 {
            return Err(LoopError::invalid("a progress bar needs at least one counter"));
        }
        let max_len = self.max_count.as_ref().map_or(n, Vec::len);
        if max_len != n {
            return Err(LoopError::invalid(format!(
                "{max_len} max_count values for {n} counters"
            )));
        }
        if !matches!(self.prepend.len(), 0 | 1) && self.prepend.len() != n {
            return Err(LoopError::invalid(format!(
                "{} prepend labels for {n} counters",
                self.prepend.len()
            )));
        }
        let widths_len = self.slot_widths.as_ref().map_or(n, Vec::len);
        if widths_len != n {
            return Err(LoopError::invalid(format!(
                "{widths_len} slot widths for {n} counters"
            )));
        }
        let widths_ok = std::iter::once(&self.width)
            .chain(self.slot_widths.iter().flatten())
            .all(|w| *w != Width::Fixed(0));
        if !widths_ok {
            return Err(LoopError::invalid("fixed width must be at least 1 column"));
        }
        if self.speed_calc_cycles < 2 {
            return Err(LoopError::invalid(format!(
                "speed_calc_cycles must be >= 2, got {}",
                self.speed_calc_cycles
            )));
        }

        let terminal: Box<dyn Terminal> = match self.terminal {
            Some(t) => t,
            None => Box::new(StdoutTerminal::new().map_err(|source| LoopError::Spawn { source })?),
        };

        let now = unix_micros();
        let mut max_count = self.max_count.map(Vec::into_iter);
        let mut widths = self.slot_widths.map(Vec::into_iter);
        let mut slots = Vec::with_capacity(n);
        for (i, count) in self.counts.into_iter().enumerate() {
            let label = match self.prepend.len() {
                0 => "",
                1 => self.prepend[0].as_str(),
                _ => self.prepend[i].as_str(),
            };
            let max = max_count.as_mut().and_then(Iterator::next);
            let width = widths.as_mut().and_then(Iterator::next);
            let slot = Slot::new(count, max, label, width, now)
                .map_err(|source| LoopError::Spawn { source })?;
            slots.push(slot);
        }

        let renderer = Renderer::new(
            slots,
            self.style,
            self.width,
            self.info_line,
            terminal,
            self.speed_calc_cycles,
            now,
        );
        let config = LoopConfig {
            interval: self.interval,
            grace: self.grace,
            sigint: self.sigint,
            sigterm: self.sigterm,
            auto_kill_on_last_resort: true,
            run_on_resume: true,
            name: self.name,
        };
        Ok(ProgressBar {
            inner: Loop::new(renderer, config),
        })
    }
}

impl fmt::Debug for ProgressBarBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBarBuilder")
            .field("counts", &self.counts.len())
            .field("style", &self.style)
            .field("width", &self.width)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::terminal::FileTerminal;

    fn counters(n: usize) -> Vec<SharedCounter> {
        (0..n).map(|_| SharedCounter::new(0).unwrap()).collect()
    }

    fn quiet(counts: Vec<SharedCounter>) -> ProgressBarBuilder {
        ProgressBar::builder(counts).terminal(FileTerminal::new(tempfile::tempfile().unwrap(), 80))
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = quiet(counters(2)).max_count(counters(3)).build().unwrap_err();
        assert_eq!(err.as_label(), "loop_invalid_configuration");

        let err = quiet(counters(2)).prepend(["a", "b", "c"]).build().unwrap_err();
        assert!(err.to_string().contains("3 prepend labels"), "{err}");

        let err = quiet(counters(2)).slot_widths([Width::Auto]).build().unwrap_err();
        assert_eq!(err.as_label(), "loop_invalid_configuration");

        assert!(quiet(Vec::new()).build().is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(quiet(counters(1)).speed_calc_cycles(1).build().is_err());
        assert!(quiet(counters(1)).width(Width::Fixed(0)).build().is_err());
    }

    #[test]
    fn single_label_applies_to_all() {
        let bar = quiet(counters(3)).prepend(["x: "]).build().unwrap();
        assert_eq!(bar.len(), 3);
        for i in 0..3 {
            assert_eq!(bar.prepend(i).unwrap(), "x: ");
        }
    }

    #[test]
    fn labels_are_mutable() {
        let bar = quiet(counters(2)).prepend(["a", "b"]).build().unwrap();
        bar.set_prepend(1, "B").unwrap();
        assert_eq!(bar.prepend(1).unwrap(), "B");

        bar.set_prepends(["1", "2"]).unwrap();
        assert_eq!(bar.prepend(0).unwrap(), "1");
        assert!(bar.set_prepends(["1", "2", "3"]).is_err());
    }

    #[test]
    fn slot_index_is_checked() {
        let bar = quiet(counters(2)).build().unwrap();
        match bar.reset(2).unwrap_err() {
            LoopError::SlotOutOfRange { index, len } => assert_eq!((index, len), (2, 2)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(bar.set_prepend(5, "x").is_err());
    }

    #[test]
    fn reset_zeroes_only_its_counter() {
        let counts = counters(2);
        counts[0].set(7);
        counts[1].set(9);
        let bar = quiet(counts.clone()).build().unwrap();
        bar.reset(0).unwrap();
        assert_eq!(counts[0].get(), 0);
        assert_eq!(counts[1].get(), 9);
    }

    #[test]
    fn unstarted_bar_is_idle() {
        let bar = quiet(counters(1)).build().unwrap();
        assert_eq!(bar.state(), SupervisorState::Idle);
        assert_eq!(bar.getpid(), None);
        assert!(bar.stop().is_ok());
    }
}
