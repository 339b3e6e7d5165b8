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

//! Observed trips used to calibrate the link speeds.
use std::fmt;

use anyhow::{Context, Result};
use log::{info, warn};
use petgraph::graph::EdgeIndex;
use serde_derive::{Deserialize, Serialize};

use crate::errors::CalibrationError;
use crate::network::{LinkLocator, OriginalEdgeId, RoadNetwork};
use crate::units::{NonNegativeMeters, NonNegativeSeconds, PositiveSeconds};

/// Identifier of a trip as given by the user.
pub type OriginalTripId = u64;

/// A trip observed in the data, with its origin, destination, pickup time and duration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Trip {
    /// Original id of the trip.
    pub id: OriginalTripId,
    /// Coordinates of the pickup location.
    pub origin: [f64; 2],
    /// Coordinates of the drop-off location.
    pub destination: [f64; 2],
    /// Id of the link where the trip starts (found from the coordinates when not given).
    #[serde(default)]
    pub origin_link: Option<OriginalEdgeId>,
    /// Id of the link where the trip ends (found from the coordinates when not given).
    #[serde(default)]
    pub destination_link: Option<OriginalEdgeId>,
    /// Pickup time, in seconds since the start of the day.
    pub pickup_time: NonNegativeSeconds,
    /// Observed duration of the trip.
    pub duration: PositiveSeconds,
    /// Observed distance of the trip.
    #[serde(default)]
    pub distance: NonNegativeMeters,
}

impl Trip {
    /// Returns the time at which the trip ends.
    pub fn end_time(&self) -> NonNegativeSeconds {
        self.pickup_time + self.duration
    }
}

/// Index of a trip in a [TripPool].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TripIndex(usize);

impl TripIndex {
    /// Creates a new TripIndex.
    pub const fn new(x: usize) -> Self {
        TripIndex(x)
    }

    /// Returns the index as usize.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TripIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short version of `TripIndex::new`.
pub const fn trip_index(x: usize) -> TripIndex {
    TripIndex::new(x)
}

/// Origin and destination links of a trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TripLinks {
    pub origin: EdgeIndex,
    pub destination: EdgeIndex,
}

/// The immutable set of trips used by a calibration run.
#[derive(Clone, Debug)]
pub struct TripPool {
    trips: Vec<Trip>,
    links: Vec<TripLinks>,
}

impl TripPool {
    /// Creates a TripPool, finding the origin and destination link of each trip.
    ///
    /// Trips whose origin and destination are on the same link are discarded.
    pub fn new(trips: Vec<Trip>, network: &RoadNetwork) -> Result<Self> {
        let nb_input_trips = trips.len();
        let mut locator = None;
        let mut pool_trips = Vec::with_capacity(trips.len());
        let mut links = Vec::with_capacity(trips.len());
        for trip in trips {
            let origin = resolve_link(network, &mut locator, trip.origin_link, trip.origin)
                .with_context(|| format!("Cannot find the origin link of trip {}", trip.id))?;
            let destination =
                resolve_link(network, &mut locator, trip.destination_link, trip.destination)
                    .with_context(|| {
                        format!("Cannot find the destination link of trip {}", trip.id)
                    })?;
            if origin == destination {
                warn!(
                    "Trip {} starts and ends on link {}, it is discarded",
                    trip.id,
                    network.original_edge_id_of(origin)
                );
                continue;
            }
            pool_trips.push(trip);
            links.push(TripLinks {
                origin,
                destination,
            });
        }
        if pool_trips.is_empty() {
            return Err(CalibrationError::EmptyTripPool.into());
        }
        if pool_trips.len() < nb_input_trips {
            info!(
                "{} trips out of {nb_input_trips} can be used for calibration",
                pool_trips.len()
            );
        }
        Ok(TripPool {
            trips: pool_trips,
            links,
        })
    }

    /// Returns the number of trips in the pool.
    pub fn len(&self) -> usize {
        self.trips.len()
    }

    /// Returns `true` if the pool has no trip.
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Returns the trip with the given index.
    pub fn get(&self, idx: TripIndex) -> Result<&Trip, CalibrationError> {
        self.trips
            .get(idx.index())
            .ok_or(CalibrationError::UnknownTrip(idx.index()))
    }

    /// Returns the origin and destination links of the trip with the given index.
    pub fn links(&self, idx: TripIndex) -> Result<TripLinks, CalibrationError> {
        self.links
            .get(idx.index())
            .copied()
            .ok_or(CalibrationError::UnknownTrip(idx.index()))
    }

    /// Returns an iterator over the indices of the trips, in insertion order.
    pub fn indices(&self) -> impl Iterator<Item = TripIndex> {
        (0..self.trips.len()).map(trip_index)
    }

    /// Returns an iterator over the trips, together with their index.
    pub fn iter(&self) -> impl Iterator<Item = (TripIndex, &Trip)> {
        self.trips
            .iter()
            .enumerate()
            .map(|(i, t)| (trip_index(i), t))
    }
}

fn resolve_link(
    network: &RoadNetwork,
    locator: &mut Option<LinkLocator>,
    link_id: Option<OriginalEdgeId>,
    coords: [f64; 2],
) -> Result<EdgeIndex> {
    if let Some(id) = link_id {
        return network
            .edge_index_of(id)
            .with_context(|| format!("Unknown link id: {id}"));
    }
    // The spatial index is only built if a trip needs it.
    locator
        .get_or_insert_with(|| LinkLocator::new(network))
        .nearest_link(coords)
        .context("The road network has no link")
}
