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

//! Results of a calibration run.
use std::fmt;
use std::time::Duration;

use serde_derive::Serialize;

use super::rescale::RescaleOutcome;
use crate::trip::{OriginalTripId, TripIndex};
use crate::units::{Distribution, NonNegativeNum};

/// Reason why a calibration run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    /// The global cost is below the tolerance.
    Converged,
    /// The maximum number of iterations was reached.
    MaxIteration,
    /// The run was cancelled from outside.
    Cancelled,
    /// The maximum running time was reached.
    DeadlineReached,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "the global cost is below the tolerance",
            Self::MaxIteration => "the maximum number of iterations was reached",
            Self::Cancelled => "the run was cancelled",
            Self::DeadlineReached => "the maximum running time was reached",
        };
        write!(f, "{s}")
    }
}

/// What happened during one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    /// Iteration counter (starting at 1).
    pub iteration: u64,
    /// Trip selected for the iteration.
    pub trip: TripIndex,
    /// `true` if the trip was drawn at random, `false` if it was the worst trip.
    pub explored: bool,
    /// Ratio of the trip before the speed update.
    pub ratio_before: NonNegativeNum,
    /// Ratio of the trip after the speed update.
    pub ratio_after: NonNegativeNum,
    /// Factor applied to the speeds of the trip's path.
    pub factor: f64,
    /// `true` if the ratio moved closer to one.
    pub improved: bool,
    /// Global cost after the iteration.
    pub global_cost: NonNegativeNum,
    /// Number of speed values updated.
    pub rescale: RescaleOutcome,
}

/// Summary of a calibration run.
#[derive(Clone, Debug, Serialize)]
pub struct CalibrationSummary {
    /// Number of iterations run.
    pub iterations: u64,
    /// Why the run stopped.
    pub termination: TerminationReason,
    /// Cost of the ratios of all trips before the first iteration.
    pub initial_cost: NonNegativeNum,
    /// Cost of the ratios of all trips at the end of the run.
    pub final_cost: NonNegativeNum,
    /// Global cost of the random sample at the end of the run (`None` if the sample is empty).
    pub final_global_cost: Option<NonNegativeNum>,
    /// Id of the worst trip at the end of the run.
    pub final_worst_trip: OriginalTripId,
    /// Absolute deviation from one of the ratio of the worst trip at the end of the run.
    pub final_worst_cost: NonNegativeNum,
    /// Number of iterations where the trip was drawn at random.
    pub nb_explorations: u64,
    /// Number of iterations where the ratio of the trip did not move closer to one.
    pub nb_not_improved: u64,
    /// Number of speed values updated.
    pub nb_speed_updates: u64,
    /// Number of speed values clamped to the minimum speed.
    pub nb_clamped: u64,
    /// Distribution of the ratios of all trips before the first iteration.
    pub initial_ratios: Option<Distribution<NonNegativeNum>>,
    /// Distribution of the ratios of all trips at the end of the run.
    pub final_ratios: Option<Distribution<NonNegativeNum>>,
    /// Total running time of the iterations.
    pub running_time: Duration,
}
