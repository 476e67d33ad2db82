//! Live terminal progress bars over shared counters.
//!
//! A [`ProgressBar`] runs its renderer in a supervised worker process. The
//! counters it displays are [`SharedCounter`](crate::SharedCounter)s, so any
//! process forked after their creation can advance them.
//!
//! ## Contents
//! - [`ProgressBar`] / [`ProgressBarBuilder`] the supervised display
//! - [`Style`] bar, colored bar and the cycle-counting variants
//! - [`Width`] terminal-following or fixed line width
//! - [`Terminal`] output target ([`StdoutTerminal`], [`FileTerminal`])
//! - [`SpeedEstimator`] sliding-window rate and time-to-go estimate
//! - [`humanize_time`] / [`humanize_speed`] the formatting of durations and rates
//!
//! ## Quick wiring
//! ```text
//! ProgressBar::builder(counts).max_count(..).prepend(..).style(..).build()
//!      └─► Loop<Renderer>
//!           └─► every interval: sample slots ─► SpeedEstimator ─► format ─► redraw
//! ```

mod bar;
mod format;
mod humanize;
mod render;
mod speed;
mod terminal;

pub use bar::{ProgressBar, ProgressBarBuilder};
pub use format::Style;
pub use humanize::{humanize_speed, humanize_time};
pub use render::PREPEND_CAPACITY;
pub use speed::{DEFAULT_SPEED_CALC_CYCLES, SpeedEstimator};
pub use terminal::{FileTerminal, StdoutTerminal, Terminal, Width};
