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

//! Collaborators notified during a calibration run.
use anyhow::Result;
use serde_derive::Serialize;

use crate::network::SpeedGraph;
use crate::trip::OriginalTripId;
use crate::units::NonNegativeNum;

/// State of the calibration sent periodically to a [CalibrationObserver].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressReport {
    /// Number of iterations run so far.
    pub iteration: u64,
    /// Id of the trip with the worst ratio.
    pub worst_trip: OriginalTripId,
    /// Absolute deviation from one of the ratio of the worst trip.
    pub worst_cost: NonNegativeNum,
    /// Global cost of the random sample (`None` while the sample is empty).
    pub global_cost: Option<NonNegativeNum>,
}

/// Receives progress reports and export requests from a calibration run.
///
/// All methods do nothing by default.
/// Errors returned by the export methods are logged and do not interrupt the calibration.
pub trait CalibrationObserver {
    /// Called every `progress_interval` iterations.
    fn progress(&mut self, _report: &ProgressReport) {}

    /// Exports the current ratios of all the trips.
    fn export_ratios(&mut self, _ratios: &[NonNegativeNum], _label: &str) -> Result<()> {
        Ok(())
    }

    /// Exports the distribution of the ratios of the random sample.
    fn plot_ratios(&mut self, _ratios: &[NonNegativeNum], _label: &str) -> Result<()> {
        Ok(())
    }

    /// Saves the current speeds.
    fn checkpoint_speeds(&mut self, _speeds: &SpeedGraph, _label: &str) -> Result<()> {
        Ok(())
    }

    /// Called once when the calibration run is over.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A [CalibrationObserver] that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOutput;

impl CalibrationObserver for NoOutput {}

impl<O: CalibrationObserver + ?Sized> CalibrationObserver for &mut O {
    fn progress(&mut self, report: &ProgressReport) {
        (**self).progress(report)
    }

    fn export_ratios(&mut self, ratios: &[NonNegativeNum], label: &str) -> Result<()> {
        (**self).export_ratios(ratios, label)
    }

    fn plot_ratios(&mut self, ratios: &[NonNegativeNum], label: &str) -> Result<()> {
        (**self).plot_ratios(ratios, label)
    }

    fn checkpoint_speeds(&mut self, speeds: &SpeedGraph, label: &str) -> Result<()> {
        (**self).checkpoint_speeds(speeds, label)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
