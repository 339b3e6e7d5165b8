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

//! Parameters of a calibration run.
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use log::warn;
use serde_derive::{Deserialize, Serialize};

use crate::calibration::CostFunction;
use crate::units::{MetersPerSecond, PositiveNum, PositiveSeconds, ZeroOneNum};

/// Set of parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Parameters {
    /// Paths to the input files.
    pub input_files: InputFiles,
    /// Directory where the output files are stored.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    /// Width of the time bins of the link speeds.
    pub dt: PositiveSeconds,
    /// Length of the simulated period (speeds are defined on `[0, horizon]`).
    #[serde(default = "default_horizon")]
    pub horizon: PositiveSeconds,
    /// Minimum speed that a speed update can produce.
    #[serde(default = "default_min_speed")]
    pub min_speed: MetersPerSecond,
    /// Format to use for saving the link speeds.
    #[serde(default)]
    pub saving_format: SavingFormat,
    /// Parameters of the calibration algorithm.
    #[serde(flatten)]
    pub calibration: CalibrationParameters,
}

/// Struct to store all the input file paths.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputFiles {
    /// Path to the file where the road network is stored.
    pub network: PathBuf,
    /// Path to the file where the observed trips are stored.
    pub trips: PathBuf,
    /// Path to the file where the initial link speeds are stored.
    ///
    /// If not specified, free-flow speeds are used.
    #[serde(default)]
    pub speeds: Option<PathBuf>,
}

/// Format to be used when saving files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SavingFormat {
    /// Uncompressed JSON files.
    JSON,
    /// Zstd-compressed JSON files.
    #[default]
    ZstdJSON,
}

/// Parameters controlling the iterations of the calibration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CalibrationParameters {
    /// Maximum number of iterations.
    pub max_iterations: u64,
    /// The calibration stops when the global cost is below this value.
    pub tolerance: PositiveNum,
    /// Step size of the speed updates, in `[0, 1]`.
    pub epsilon1: ZeroOneNum,
    /// Probability to select a random trip instead of the worst trip.
    pub epsilon2: ZeroOneNum,
    /// Number of random trips used to compute the global cost.
    pub check_horizon: usize,
    /// Seed of the random number generator.
    #[serde(default)]
    pub random_seed: u64,
    /// Statistic used to compute the global cost.
    #[serde(default)]
    pub cost_function: CostFunction,
    /// Interval (in iterations) between two progress reports (0 to disable).
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    /// Interval (in iterations) between two exports of the ratios (0 to disable).
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u64,
    /// Interval (in iterations) between two checkpoints of the speeds (0 to disable).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
    /// Maximum running time of the iterations.
    #[serde(default)]
    pub max_running_time: Option<PositiveSeconds>,
    /// Number of "ratio did not improve" messages logged as warnings (the others are logged at
    /// debug level).
    #[serde(default = "default_max_not_improved_warnings")]
    pub max_not_improved_warnings: usize,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_horizon() -> PositiveSeconds {
    PositiveSeconds::new_unchecked(86400.0)
}

fn default_min_speed() -> MetersPerSecond {
    MetersPerSecond::new_unchecked(0.1)
}

const fn default_progress_interval() -> u64 {
    10
}

const fn default_snapshot_interval() -> u64 {
    50
}

const fn default_checkpoint_interval() -> u64 {
    30000
}

const fn default_max_not_improved_warnings() -> usize {
    20
}

impl CalibrationParameters {
    /// Creates CalibrationParameters with the default intervals.
    pub fn new(
        max_iterations: u64,
        tolerance: PositiveNum,
        epsilon1: ZeroOneNum,
        epsilon2: ZeroOneNum,
        check_horizon: usize,
        random_seed: u64,
    ) -> Self {
        CalibrationParameters {
            max_iterations,
            tolerance,
            epsilon1,
            epsilon2,
            check_horizon,
            random_seed,
            cost_function: CostFunction::default(),
            progress_interval: default_progress_interval(),
            snapshot_interval: default_snapshot_interval(),
            checkpoint_interval: default_checkpoint_interval(),
            max_running_time: None,
            max_not_improved_warnings: default_max_not_improved_warnings(),
        }
    }

    /// Checks that the parameters are valid.
    pub fn check(&self) -> Result<()> {
        if self.check_horizon == 0 {
            bail!("The value of `check_horizon` must be positive");
        }
        if self.epsilon1.value() == 0.0 {
            warn!("With `epsilon1` equal to 0, the link speeds are never updated");
        }
        Ok(())
    }
}

impl Parameters {
    /// Reads the parameters from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let parameters: Parameters = crate::io::json::read_json(path)?;
        parameters.check()?;
        Ok(parameters)
    }

    /// Checks that the parameters are valid.
    pub fn check(&self) -> Result<()> {
        if self.dt > self.horizon {
            bail!(
                "The time bin width `dt` ({}) cannot be larger than the horizon ({})",
                self.dt,
                self.horizon
            );
        }
        self.calibration.check()
    }
}
