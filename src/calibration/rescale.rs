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

//! Update of the link speeds along the path of a trip.
use petgraph::graph::EdgeIndex;

use crate::errors::CalibrationError;
use crate::network::speeds::ScaleOutcome;
use crate::network::SpeedGraph;
use crate::trip::Trip;
use crate::units::{NonNegativeNum, ZeroOneNum};

/// Number of speed values modified by a call to [LinkRescaler::apply].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RescaleOutcome {
    /// Number of speed values multiplied by the factor.
    pub nb_updated: usize,
    /// Number of speed values clamped to the minimum speed.
    pub nb_clamped: usize,
}

/// Rescales the speeds of the links of a path so that the modeled duration of a trip gets closer
/// to its observed duration.
#[derive(Clone, Copy, Debug)]
pub struct LinkRescaler {
    /// Step size, in `[0, 1]`.
    epsilon1: ZeroOneNum,
}

impl LinkRescaler {
    /// Creates a new LinkRescaler with the given step size.
    pub const fn new(epsilon1: ZeroOneNum) -> Self {
        LinkRescaler { epsilon1 }
    }

    /// Returns the factor to apply to the speeds of a trip whose ratio is `ratio`.
    ///
    /// The factor is `1 - epsilon1 * (1 - ratio)`: a trip that is too slow in the model
    /// (`ratio > 1`) gets faster links.
    pub fn factor(&self, ratio: NonNegativeNum) -> f64 {
        1.0 - self.epsilon1.value() * (1.0 - ratio.value())
    }

    /// Multiplies by `factor` the speed of all links of `path`, for all time bins intersecting
    /// the period of the trip.
    ///
    /// Nothing is done if the path is empty or if the factor is one.
    pub fn apply(
        &self,
        speeds: &mut SpeedGraph,
        trip: &Trip,
        path: &[EdgeIndex],
        factor: f64,
    ) -> Result<RescaleOutcome, CalibrationError> {
        let mut outcome = RescaleOutcome::default();
        if path.is_empty() || factor == 1.0 {
            return Ok(outcome);
        }
        let bins = speeds.bins_between(trip.pickup_time, trip.end_time());
        for &link in path {
            for bin in bins.clone() {
                match speeds.scale(link, bin, factor)? {
                    ScaleOutcome::Scaled => outcome.nb_updated += 1,
                    ScaleOutcome::Clamped => outcome.nb_clamped += 1,
                }
            }
        }
        Ok(outcome)
    }
}
