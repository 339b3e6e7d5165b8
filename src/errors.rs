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

//! Errors that can interrupt a calibration run.
use thiserror::Error;

use crate::units::MetersPerSecond;

/// Fatal errors raised by the calibration components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// There is no path between the origin and the destination of a trip.
    #[error("No path from the origin to the destination of trip {trip_id} (link {origin} to link {destination})")]
    NoPath {
        trip_id: u64,
        origin: u64,
        destination: u64,
    },
    /// A speed update would leave the speed graph in an invalid state.
    #[error("Invalid speed update on link index {link}, bin {bin}: speed {speed} with factor {factor}")]
    InvalidState {
        link: usize,
        bin: usize,
        speed: MetersPerSecond,
        factor: f64,
    },
    /// A trip index does not belong to the trip pool.
    #[error("Trip index {0} is not part of the trip pool")]
    UnknownTrip(usize),
    /// The trip pool is empty.
    #[error("The trip pool is empty")]
    EmptyTripPool,
    /// A calibration parameter has an invalid value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
