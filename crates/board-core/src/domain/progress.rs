//! Display figures derived from a [`Settings`] document.
//!
//! Displays render a progress bar, a "still needed" amount, and a slideshow.
//! The arithmetic lives here so that every consumer (the browser display, the
//! `board-watch` logger) agrees on edge cases such as a zero goal or an
//! overshoot past 100 %.

use std::time::Duration;

use crate::domain::settings::Settings;

/// Shortest interval a display may rotate slides at, in seconds.
pub const MIN_SLIDE_SECONDS: f64 = 2.0;

/// Upper bound for the un-clamped percentage; keeps "9999 %" off the screen.
const MAX_PERCENT: f64 = 999.0;

/// Fundraising progress as shown on the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Raised divided by goal, in percent.  `0` when the goal is `0`; capped at 999.
    pub percent: f64,
    /// `percent` clamped to `0..=100`, for sizing the progress bar.
    pub clamped_percent: f64,
    /// Amount still needed to reach the goal.  Never negative.
    pub remaining: f64,
}

impl Settings {
    /// Computes the progress figures for this document.
    pub fn progress(&self) -> Progress {
        let goal = self.goal_amount.max(0.0);
        let raised = self.raised_amount.max(0.0);

        let percent = if goal == 0.0 {
            0.0
        } else {
            (raised / goal * 100.0).clamp(0.0, MAX_PERCENT)
        };

        Progress {
            percent,
            clamped_percent: percent.min(100.0),
            remaining: (goal - raised).max(0.0),
        }
    }

    /// Returns how long each slide stays on screen, never less than
    /// [`MIN_SLIDE_SECONDS`].
    pub fn slide_interval(&self) -> Duration {
        Duration::from_secs_f64(self.slide_seconds.max(MIN_SLIDE_SECONDS))
    }
}
