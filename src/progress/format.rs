//! # Progress line formatting.
//!
//! One line per tracked counter, composed left to right:
//!
//! ```text
//! known total:    <prepend>[<cycles> [<cycle rate>] ]<bar> <pct>% <elapsed> TTG <ttg> [<speed>]
//! unknown total:  <prepend>[<cycles> [<cycle rate>] ]<elapsed> [<speed>] #<count>
//! ```
//!
//! The bar takes whatever columns the other fields leave; below
//! [`MIN_BAR`] cells it is dropped. Lines are clipped to the width by display
//! columns (`unicode-width`), and padded when the width is fixed.

use crossterm::style::Stylize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::progress::humanize::{humanize_time, speed_or_unknown, time_or_unknown};

/// Fewest inner bar cells worth drawing.
pub const MIN_BAR: usize = 3;

const EIGHTHS: [&str; 8] = ["", "▏", "▎", "▍", "▌", "▋", "▊", "▉"];

/// Rendering variant of a progress bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Style {
    /// ASCII bar, percentage, elapsed time, time to go and speed.
    #[default]
    Bar,
    /// Colored bar with sub-cell resolution; plain when ANSI is unavailable.
    BarFancy,
    /// [`Style::Bar`] prefixed with the slot's cycle count and cycle rate.
    Counter,
    /// [`Style::BarFancy`] prefixed with the slot's cycle count and cycle rate.
    CounterFancy,
}

impl Style {
    /// Returns `true` for the colored variants.
    pub fn is_fancy(self) -> bool {
        matches!(self, Style::BarFancy | Style::CounterFancy)
    }

    /// Returns `true` for the variants that show reset cycles.
    pub fn is_counter(self) -> bool {
        matches!(self, Style::Counter | Style::CounterFancy)
    }
}

/// Numbers of one slot for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SlotStats {
    pub(crate) count: u64,
    /// `None` or `Some(0)`: unknown total, no bar.
    pub(crate) max: Option<u64>,
    pub(crate) elapsed: f64,
    pub(crate) speed: Option<f64>,
    pub(crate) ttg: Option<f64>,
    /// Number of resets and resets per second.
    pub(crate) cycles: u64,
    pub(crate) cycle_rate: Option<f64>,
}

/// Formats one slot line.
pub(crate) fn slot_line(
    prepend: &str,
    stats: &SlotStats,
    style: Style,
    width: usize,
    pad: bool,
    ansi: bool,
) -> String {
    let fancy = style.is_fancy() && ansi;
    let mut prefix = single_line(prepend);
    if style.is_counter() {
        prefix.push_str(&format!(
            "{} [{}] ",
            stats.cycles,
            speed_or_unknown(stats.cycle_rate)
        ));
    }

    let Some(max) = stats.max.filter(|m| *m > 0) else {
        let elapsed = humanize_time(stats.elapsed);
        let speed = speed_or_unknown(stats.speed);
        let plain = format!("{prefix}{elapsed} [{speed}] #{}", stats.count);
        if !fancy || plain.width() > width {
            return fit(&plain, width, pad);
        }
        let styled = format!(
            "{}{elapsed} [{}] #{}",
            prefix.as_str().bold(),
            speed.as_str().cyan(),
            stats.count.to_string().bold()
        );
        return pad_styled(styled, plain.width(), width, pad);
    };

    let pct = percentage(stats.count, max);
    let elapsed = humanize_time(stats.elapsed);
    let ttg = time_or_unknown(stats.ttg);
    let speed = speed_or_unknown(stats.speed);
    let tail = format!(" {pct:6.2}% {elapsed} TTG {ttg} [{speed}]");

    let taken = prefix.width() + tail.width();
    let inner = width.saturating_sub(taken + 2);
    if inner < MIN_BAR {
        let plain = format!("{prefix}{}", tail.trim_start());
        return fit(&plain, width, pad);
    }

    if !fancy {
        let plain = format!("{prefix}[{}]{tail}", ascii_bar(pct, inner));
        return fit(&plain, width, pad);
    }

    let styled = format!(
        "{}[{}] {}% {elapsed} TTG {} [{}]",
        prefix.as_str().bold(),
        block_bar(pct, inner).green(),
        format!("{pct:6.2}").bold(),
        ttg.as_str().yellow(),
        speed.as_str().cyan()
    );
    pad_styled(styled, taken + inner + 2, width, pad)
}

/// Formats the info lines shown beneath the bars.
pub(crate) fn info_lines(info: &str, width: usize, pad: bool, fancy: bool) -> Vec<String> {
    info.lines()
        .map(|line| {
            let fitted = fit(line, width, pad);
            if fancy {
                fitted.dim().to_string()
            } else {
                fitted
            }
        })
        .collect()
}

/// Completion percentage in `0.0..=100.0`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn percentage(count: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    (count as f64 / max as f64 * 100.0).clamp(0.0, 100.0)
}

/// `=====>    ` with `cells` columns.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(crate) fn ascii_bar(pct: f64, cells: usize) -> String {
    let filled = ((pct / 100.0 * cells as f64).floor() as usize).min(cells);
    let mut bar = "=".repeat(filled);
    if filled < cells {
        bar.push('>');
        bar.push_str(&" ".repeat(cells - filled - 1));
    }
    bar
}

/// `█████▌    ` with `cells` columns and 1/8 cell resolution.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(crate) fn block_bar(pct: f64, cells: usize) -> String {
    let eighths = ((pct / 100.0 * (cells * 8) as f64).round() as usize).min(cells * 8);
    let (full, part) = (eighths / 8, eighths % 8);
    let mut bar = "█".repeat(full);
    bar.push_str(EIGHTHS[part]);
    let used = full + usize::from(part > 0);
    bar.push_str(&" ".repeat(cells - used));
    bar
}

/// Clips `text` to `width` display columns; pads with spaces when `pad`.
pub(crate) fn fit(text: &str, width: usize, pad: bool) -> String {
    let mut out = String::with_capacity(text.len().min(width * 4));
    let mut used = 0;
    for c in text.chars() {
        if c == '\n' || c == '\r' {
            break;
        }
        let c = if c.is_control() { ' ' } else { c };
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    if pad && used < width {
        out.push_str(&" ".repeat(width - used));
    }
    out
}

/// Replaces control characters so a label cannot break the line layout.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn pad_styled(mut styled: String, visible: usize, width: usize, pad: bool) -> String {
    if pad && visible < width {
        styled.push_str(&" ".repeat(width - visible));
    }
    styled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(count: u64, max: Option<u64>) -> SlotStats {
        SlotStats {
            count,
            max,
            elapsed: 11.0,
            speed: Some(1.1),
            ttg: Some(100.0),
            ..SlotStats::default()
        }
    }

    #[test]
    fn plain_line_layout() {
        let line = slot_line("pre ", &stats(5, Some(10)), Style::Bar, 80, false, false);
        assert!(line.starts_with("pre ["), "{line}");
        assert!(line.ends_with("]  50.00% 00:00:11 TTG 00:01:40 [1.1c/s]"), "{line}");
        assert_eq!(line.width(), 80);
        assert!(line.contains("=====>"), "{line}");
    }

    #[test]
    fn full_and_empty_bars() {
        assert_eq!(ascii_bar(0.0, 5), ">    ");
        assert_eq!(ascii_bar(50.0, 4), "==> ");
        assert_eq!(ascii_bar(100.0, 5), "=====");
        assert_eq!(block_bar(100.0, 3), "███");
        assert_eq!(block_bar(0.0, 3), "   ");
        assert_eq!(block_bar(50.0, 3), "█▌ ");
    }

    #[test]
    fn percentage_is_clamped() {
        assert!((percentage(15, 10) - 100.0).abs() < f64::EPSILON);
        assert!((percentage(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!(percentage(3, 0).abs() < f64::EPSILON);
    }

    /// Max of zero (or none) hides the bar and shows the raw count.
    #[test]
    fn unknown_total_shows_count() {
        for max in [None, Some(0)] {
            let line = slot_line("pre ", &stats(5, max), Style::Bar, 80, false, false);
            assert_eq!(line, "pre 00:00:11 [1.1c/s] #5");
        }
    }

    #[test]
    fn narrow_width_drops_bar_then_clips() {
        let line = slot_line("", &stats(5, Some(10)), Style::Bar, 40, false, false);
        assert!(!line.contains('='), "{line}");
        assert!(line.starts_with("50.00% 00:00:11 TTG"), "{line}");
        assert!(line.width() <= 40);

        let tiny = slot_line("", &stats(5, Some(10)), Style::Bar, 5, false, false);
        assert_eq!(tiny.width(), 5);
    }

    #[test]
    fn fixed_width_pads() {
        let line = slot_line("x ", &stats(5, None), Style::Bar, 40, true, false);
        assert_eq!(line.width(), 40);
        assert!(line.starts_with("x 00:00:11"));
    }

    #[test]
    fn counter_style_prefixes_cycles() {
        let mut s = stats(5, None);
        s.cycles = 3;
        s.cycle_rate = Some(0.5);
        let line = slot_line("a ", &s, Style::Counter, 80, false, false);
        assert_eq!(line, "a 3 [30.0c/min] 00:00:11 [1.1c/s] #5");
    }

    #[test]
    fn fancy_degrades_without_ansi() {
        let plain = slot_line("p ", &stats(5, Some(10)), Style::Bar, 60, false, false);
        let degraded = slot_line("p ", &stats(5, Some(10)), Style::BarFancy, 60, false, false);
        assert_eq!(plain, degraded);

        let fancy = slot_line("p ", &stats(5, Some(10)), Style::BarFancy, 60, false, true);
        assert!(fancy.contains('\u{1b}'));
        assert!(fancy.contains('█'));
    }

    #[test]
    fn fit_counts_display_columns() {
        assert_eq!(fit("日本語", 4, false), "日本");
        assert_eq!(fit("ab", 4, true), "ab  ");
        assert_eq!(fit("a\nb", 4, false), "a");
        assert_eq!(fit("abc", 0, true), "");
    }

    #[test]
    fn multiline_label_stays_on_one_line() {
        let line = slot_line("a\nb ", &stats(5, Some(10)), Style::Bar, 80, false, false);
        assert!(!line.contains('\n'), "{line:?}");
        assert!(line.starts_with("a b ["), "{line}");
        assert!(line.contains("50.00%"), "{line}");
        assert_eq!(line.width(), 80);

        let label = "a\r\nb ";
        let fancy = slot_line(label, &stats(5, Some(10)), Style::CounterFancy, 80, true, true);
        assert!(!fancy.contains('\n') && !fancy.contains('\r'), "{fancy:?}");
        assert!(fancy.contains('█'));
    }

    #[test]
    fn fit_blanks_control_characters() {
        assert_eq!(fit("a\tb\u{1b}c", 10, false), "a b c");
    }

    #[test]
    fn info_lines_split() {
        let lines = info_lines("info_line\nline2", 20, false, false);
        assert_eq!(lines, vec!["info_line", "line2"]);
    }
}
