//! # Renderer: the work a progress bar's worker repeats.
//!
//! Each tick reads every slot under its own lock, feeds the slot's
//! [`SpeedEstimator`], formats one line per slot (plus the info lines) and
//! redraws the frame in place:
//!
//! ```text
//! MoveUp(previous height)            (skipped on the first frame)
//! for each line: MoveToColumn(0) Clear(CurrentLine) <line> "\n"
//! Clear(FromCursorDown)              (removes lines of a taller previous frame)
//! ```
//!
//! Every line ends with a newline, so the cursor rests below the frame and
//! anything printed after `stop()` starts on a fresh line.

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use tracing::warn;

use crate::error::WorkError;
use crate::progress::format::{self, SlotStats, Style};
use crate::progress::speed::SpeedEstimator;
use crate::progress::terminal::{Terminal, Width};
use crate::shared::{SharedCounter, SharedString};
use crate::tasks::{Step, Work};

/// Capacity in bytes of a slot's prepend label.
pub const PREPEND_CAPACITY: usize = 256;

/// Shared state of one tracked counter.
///
/// Every field lives in shared memory: the owner writes labels and resets,
/// the renderer worker reads them.
#[derive(Clone, Debug)]
pub(crate) struct Slot {
    pub(crate) count: SharedCounter,
    pub(crate) max: Option<SharedCounter>,
    pub(crate) prepend: SharedString,
    /// Origin of the elapsed time, unix microseconds.
    pub(crate) start: SharedCounter,
    /// Number of resets.
    pub(crate) epoch: SharedCounter,
    pub(crate) width: Option<Width>,
}

impl Slot {
    pub(crate) fn new(
        count: SharedCounter,
        max: Option<SharedCounter>,
        prepend: &str,
        width: Option<Width>,
        now: u64,
    ) -> io::Result<Self> {
        Ok(Self {
            count,
            max,
            prepend: SharedString::with_value(PREPEND_CAPACITY, prepend)?,
            start: SharedCounter::new(now)?,
            epoch: SharedCounter::new(0)?,
            width,
        })
    }

    /// Current total: the explicit maximum, else the counter's own hint.
    fn max_value(&self) -> Option<u64> {
        match &self.max {
            Some(max) => Some(max.get()),
            None => self.count.max(),
        }
    }

    /// Restarts the slot: count to zero, new time origin, next cycle.
    pub(crate) fn reset(&self, now: u64) {
        self.count.set(0);
        self.start.set(now);
        self.epoch.inc(1);
    }
}

/// Per-tick renderer of a progress bar.
pub(crate) struct Renderer {
    pub(crate) slots: Vec<Slot>,
    style: Style,
    width: Width,
    info: Option<SharedString>,
    terminal: Box<dyn Terminal>,
    /// Construction time, unix microseconds; origin of the cycle rate.
    origin: u64,
    estimators: Vec<SpeedEstimator>,
    seen_epochs: Vec<u64>,
    /// Height of the last frame drawn by this process.
    drawn: usize,
}

impl Renderer {
    pub(crate) fn new(
        slots: Vec<Slot>,
        style: Style,
        width: Width,
        info: Option<SharedString>,
        terminal: Box<dyn Terminal>,
        speed_calc_cycles: usize,
        origin: u64,
    ) -> Self {
        let n = slots.len();
        Self {
            slots,
            style,
            width,
            info,
            terminal,
            origin,
            estimators: vec![SpeedEstimator::new(speed_calc_cycles); n],
            seen_epochs: vec![0; n],
            drawn: 0,
        }
    }

    /// Samples every slot and formats the frame.
    pub(crate) fn frame(&mut self, now: u64) -> Vec<String> {
        let ansi = self.terminal.supports_ansi();
        let mut lines = Vec::with_capacity(self.slots.len() + 1);

        for (i, slot) in self.slots.iter().enumerate() {
            let epoch = slot.epoch.get();
            if epoch != self.seen_epochs[i] {
                self.seen_epochs[i] = epoch;
                self.estimators[i].clear();
            }

            let count = slot.count.get();
            let max = slot.max_value();
            let estimator = &mut self.estimators[i];
            estimator.push(secs(now.saturating_sub(self.origin)), count);

            let stats = SlotStats {
                count,
                max,
                elapsed: secs(now.saturating_sub(slot.start.get())),
                speed: estimator.speed(),
                ttg: max
                    .filter(|m| *m > 0)
                    .and_then(|m| estimator.time_to_go(count, m)),
                cycles: epoch,
                cycle_rate: rate(epoch, now.saturating_sub(self.origin)),
            };

            let width = slot.width.unwrap_or(self.width);
            lines.push(format::slot_line(
                &slot.prepend.get(),
                &stats,
                self.style,
                width.resolve(self.terminal.as_ref()),
                width.pads(),
                ansi,
            ));
        }

        if let Some(info) = &self.info {
            lines.extend(format::info_lines(
                &info.get(),
                self.width.resolve(self.terminal.as_ref()),
                self.width.pads(),
                self.style.is_fancy() && ansi,
            ));
        }
        lines
    }

    /// Draws `lines` over the previous frame.
    pub(crate) fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        let mut buf = Vec::with_capacity(lines.iter().map(String::len).sum::<usize>() + 64);
        if self.drawn > 0 {
            let up = u16::try_from(self.drawn).unwrap_or(u16::MAX);
            queue!(buf, MoveUp(up))?;
        }
        for line in lines {
            queue!(
                buf,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(line),
                Print("\n")
            )?;
        }
        queue!(buf, Clear(ClearType::FromCursorDown))?;

        let out = self.terminal.writer();
        out.write_all(&buf)?;
        out.flush()?;
        self.drawn = lines.len();
        Ok(())
    }

    fn render(&mut self) -> io::Result<()> {
        let lines = self.frame(unix_micros());
        self.draw(&lines)
    }
}

impl Work for Renderer {
    fn name(&self) -> &str {
        "progress"
    }

    fn tick(&mut self) -> Result<Step, WorkError> {
        self.render().map_err(WorkError::fail)?;
        Ok(Step::Continue)
    }

    fn on_stop(&mut self) {
        if let Err(e) = self.render() {
            warn!(error = %e, "failed to draw final progress frame");
        }
    }

    fn interruptible(&self) -> bool {
        false
    }
}

/// Wall clock in microseconds since the unix epoch.
pub(crate) fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
}

#[allow(clippy::cast_precision_loss)]
fn secs(micros: u64) -> f64 {
    micros as f64 / 1e6
}

#[allow(clippy::cast_precision_loss)]
fn rate(n: u64, micros: u64) -> Option<f64> {
    (micros > 0).then(|| n as f64 / secs(micros))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::terminal::FileTerminal;
    use std::fs;
    use std::io::{Read, Seek, SeekFrom};

    const SEC: u64 = 1_000_000;

    fn renderer(slots: Vec<Slot>, style: Style, info: Option<SharedString>) -> (Renderer, fs::File) {
        let file = tempfile::tempfile().unwrap();
        let term = FileTerminal::new(file.try_clone().unwrap(), 60);
        let r = Renderer::new(slots, style, Width::Auto, info, Box::new(term), 3, 0);
        (r, file)
    }

    fn slot(count: u64, max: Option<u64>, prepend: &str) -> Slot {
        let max = max.map(|m| SharedCounter::new(m).unwrap());
        Slot::new(SharedCounter::new(count).unwrap(), max, prepend, None, 0).unwrap()
    }

    fn read_all(mut file: &fs::File) -> String {
        let mut out = String::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn frame_has_one_line_per_slot() {
        let (mut r, _file) = renderer(
            vec![slot(5, Some(10), "a "), slot(3, None, "b ")],
            Style::Bar,
            None,
        );
        let lines = r.frame(10 * SEC);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a ["), "{}", lines[0]);
        assert!(lines[0].contains(" 50.00% 00:00:10 TTG -- [--]"), "{}", lines[0]);
        assert_eq!(lines[1], "b 00:00:10 [--] #3");
    }

    /// Speed comes from successive frames of the same slot.
    #[test]
    fn speed_builds_up_across_frames() {
        let s = slot(0, Some(100), "");
        let count = s.count.clone();
        let (mut r, _file) = renderer(vec![s], Style::Bar, None);

        r.frame(0);
        count.set(10);
        let lines = r.frame(2 * SEC);
        assert!(lines[0].contains("[5.0c/s]"), "{}", lines[0]);
        assert!(lines[0].contains("TTG 00:00:18"), "{}", lines[0]);
    }

    #[test]
    fn reset_clears_only_its_slot() {
        let a = slot(0, Some(100), "");
        let b = slot(0, Some(100), "");
        let (ca, cb) = (a.count.clone(), b.count.clone());
        let (mut r, _file) = renderer(vec![a, b], Style::Counter, None);

        r.frame(0);
        ca.set(10);
        cb.set(10);
        r.frame(SEC);
        assert_eq!(r.estimators[0].len(), 2);
        assert_eq!(r.estimators[1].len(), 2);

        r.slots[0].reset(SEC);
        assert_eq!(ca.get(), 0);
        let lines = r.frame(2 * SEC);
        assert_eq!(r.estimators[0].len(), 1);
        assert_eq!(r.estimators[1].len(), 3);
        assert!(lines[0].starts_with("1 ["), "{}", lines[0]);
        assert!(lines[1].starts_with("0 ["), "{}", lines[1]);
        assert!(lines[0].contains(" 1.00s TTG"), "{}", lines[0]);
    }

    #[test]
    fn max_hint_of_counter_is_used() {
        let s = Slot::new(SharedCounter::with_max(25, 100).unwrap(), None, "", None, 0).unwrap();
        let (mut r, _file) = renderer(vec![s], Style::Bar, None);
        let lines = r.frame(SEC);
        assert!(lines[0].contains(" 25.00%"), "{}", lines[0]);
    }

    #[test]
    fn info_lines_follow_the_bars() {
        let info = SharedString::with_value(64, "info_line\nline2").unwrap();
        let (mut r, _file) = renderer(vec![slot(1, Some(2), "")], Style::BarFancy, Some(info.clone()));
        assert_eq!(r.frame(SEC).len(), 3);
        info.clear();
        assert_eq!(r.frame(SEC).len(), 1);
    }

    /// Steady-state frames overwrite the previous one instead of appending.
    #[test]
    fn redraw_moves_up_by_previous_height() {
        let (mut r, file) = renderer(vec![slot(1, Some(2), "x"), slot(1, Some(2), "y")], Style::Bar, None);
        r.render().unwrap();
        r.render().unwrap();
        r.render().unwrap();

        let out = read_all(&file);
        assert_eq!(out.matches("\u{1b}[2A").count(), 2, "{out:?}");
        assert_eq!(out.matches('\n').count(), 6);
        assert!(out.ends_with("\u{1b}[J"), "{out:?}");
    }

    /// A label with line breaks must not change the frame height.
    #[test]
    fn multiline_label_keeps_frame_height() {
        let file = tempfile::tempfile().unwrap();
        let term = FileTerminal::new(file.try_clone().unwrap(), 60).with_ansi(true);
        let s = slot(1, Some(2), "one\ntwo ");
        let prepend = s.prepend.clone();
        let term = Box::new(term);
        let mut r = Renderer::new(vec![s], Style::BarFancy, Width::Auto, None, term, 3, 0);

        r.render().unwrap();
        prepend.set("three\r\nfour ");
        r.render().unwrap();
        r.render().unwrap();

        let out = read_all(&file);
        assert_eq!(out.matches('\n').count(), 3, "{out:?}");
        assert_eq!(out.matches("\u{1b}[1A").count(), 2, "{out:?}");
        assert!(!out.contains('\r'), "{out:?}");
        assert!(out.contains("three  four "), "{out:?}");
    }

    #[test]
    fn renderer_is_not_interruptible() {
        let (r, _file) = renderer(vec![slot(0, None, "")], Style::Bar, None);
        assert!(!r.interruptible());
        assert_eq!(r.name(), "progress");
    }
}
