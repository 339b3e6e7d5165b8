// This file is part of Metropolis-Calibration.
// Copyright © 2022, 2023, 2024, 2025 André de Palma, Lucas Javaudin
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Progress bars shown on the terminal while the calibration runs.
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{log_enabled, Level};

/// Interval in milliseconds when spinners are automatically ticked.
const UPDATE_MS: Duration = Duration::from_millis(1000);

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Progress bar of the calibration iterations.
///
/// The bar is hidden when logging at info level is disabled.
#[derive(Debug, Clone)]
pub struct CalibrationProgressBar(ProgressBar);

impl CalibrationProgressBar {
    /// Returns a [CalibrationProgressBar] for the given maximum number of iterations.
    pub fn new(max_iterations: u64) -> Self {
        let bp = if log_enabled!(Level::Info) {
            ProgressBar::new(max_iterations)
        } else {
            ProgressBar::hidden()
        };
        bp.set_style(style("{bar:40} {pos}/{len} {msg} ({eta})"));
        CalibrationProgressBar(bp)
    }

    /// Sets the current iteration and the message shown next to the bar.
    pub fn set(&self, iteration: u64, msg: String) {
        self.0.set_position(iteration);
        self.0.set_message(msg);
    }

    /// Sets the current iteration.
    pub fn set_position(&self, iteration: u64) {
        self.0.set_position(iteration);
    }

    /// Sets the progress bar to finished.
    pub fn finish(&self) {
        self.0.finish_and_clear();
    }

    /// Hides the progress bar temporarily.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.0.suspend(f)
    }
}

/// A spinner.
#[derive(Debug)]
pub struct Spinner(ProgressBar);

impl Spinner {
    /// Starts a [Spinner] with the given message.
    pub fn new(msg: &str) -> Self {
        let bp = if log_enabled!(Level::Info) {
            ProgressBar::new(1).with_message(msg.to_owned())
        } else {
            ProgressBar::hidden()
        };
        bp.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bp.enable_steady_tick(UPDATE_MS);
        Spinner(bp)
    }

    /// Sets the spinner to finished.
    pub fn finish(&mut self) {
        self.0.finish_and_clear();
    }
}
