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

//! Everything related to logging.
use std::fs::File;
use std::path::Path;
use std::sync::{LazyLock, Mutex};

use anyhow::{Context, Result};
use hashbrown::HashMap;
use log::{warn, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

static SENT_WARNINGS: LazyLock<Mutex<HashMap<WarningType, usize>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Enum representing the various type of warning messages that can be sent.
pub(crate) enum WarningType {
    /// The ratio of a trip did not move closer to one after rescaling the speeds of its path.
    RatioNotImproved,
    /// A speed value was clamped to the minimum speed.
    SpeedClamped,
    /// The network has parallel edges.
    ParallelEdges,
    #[cfg(test)]
    Test,
}

/// Sends a warning message if it was sent less than `n` times before.
///
/// Returns `true` if the message was actually sent.
pub(crate) fn send_warning_at_most_n_times(warn_type: WarningType, message: &str, n: usize) -> bool {
    // A poisoned lock only means that another thread panicked while logging.
    let mut sent_warnings = match SENT_WARNINGS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let count = sent_warnings.entry(warn_type).or_insert(0);
    if *count >= n {
        return false;
    }
    warn!("{}", message);
    *count += 1;
    true
}

/// Sends a warning message if it was never sent before.
pub(crate) fn send_warning_at_most_once(warn_type: WarningType, message: &str) -> bool {
    send_warning_at_most_n_times(warn_type, message, 1)
}

/// Initializes logging to a file and terminal.
///
/// The log file is `log.txt` in the `output` directory.
/// If `maybe_writer` is not `None`, the messages at info level or above are also sent to the
/// writer.
pub fn initialize_logging<W: std::io::Write + Send + 'static>(
    output: &Path,
    maybe_writer: Option<W>,
) -> Result<()> {
    let log_filename = output.join("log.txt");
    let log_file = File::create(&log_filename)
        .with_context(|| format!("Failed to create log file `{log_filename:?}`"))?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
    ];
    if let Some(writer) = maybe_writer {
        loggers.push(WriteLogger::new(
            LevelFilter::Info,
            Config::default(),
            writer,
        ));
    }
    CombinedLogger::init(loggers).context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_count_test() {
        assert!(send_warning_at_most_n_times(WarningType::Test, "a", 2));
        assert!(send_warning_at_most_n_times(WarningType::Test, "b", 2));
        assert!(!send_warning_at_most_n_times(WarningType::Test, "c", 2));
    }
}
