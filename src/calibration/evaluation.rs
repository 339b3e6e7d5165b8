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

//! Comparison of the modeled and observed durations of a trip.
use petgraph::graph::EdgeIndex;

use crate::errors::CalibrationError;
use crate::network::{RoadNetwork, SpeedGraph};
use crate::routing::DijkstraSearch;
use crate::trip::{TripIndex, TripPool};
use crate::units::{NonNegativeMeters, NonNegativeNum, NonNegativeSeconds};

/// Fastest path of a trip with the current speeds, and the ratio between its duration and the
/// observed duration of the trip.
#[derive(Clone, Debug, PartialEq)]
pub struct DurationComparison {
    /// Links of the path, ending with the destination link of the trip.
    pub path: Vec<EdgeIndex>,
    /// Travel time of the path, when departing at the pickup time of the trip.
    pub path_duration: NonNegativeSeconds,
    /// Length of the path.
    pub path_distance: NonNegativeMeters,
    /// Ratio `path_duration / observed_duration`.
    pub ratio: NonNegativeNum,
}

impl DurationComparison {
    /// Returns the absolute deviation of the ratio from one.
    pub fn deviation(&self) -> NonNegativeNum {
        self.ratio.deviation_from_one()
    }
}

/// Computes the [DurationComparison] of trips of a [TripPool].
///
/// The path of a trip starts at the head node of its origin link, follows the fastest route to
/// the tail node of its destination link, then takes the destination link.
#[derive(Debug)]
pub struct PathEvaluator<'a> {
    network: &'a RoadNetwork,
    trips: &'a TripPool,
    search: DijkstraSearch,
}

impl<'a> PathEvaluator<'a> {
    /// Creates a new PathEvaluator.
    pub fn new(network: &'a RoadNetwork, trips: &'a TripPool) -> Self {
        PathEvaluator {
            network,
            trips,
            search: DijkstraSearch::default(),
        }
    }

    /// Returns the pool of trips that can be evaluated.
    pub const fn trips(&self) -> &'a TripPool {
        self.trips
    }

    /// Returns the road network.
    pub const fn network(&self) -> &'a RoadNetwork {
        self.network
    }

    /// Evaluates a trip with the current speeds.
    ///
    /// Returns [CalibrationError::NoPath] if the destination link cannot be reached from the
    /// origin link.
    pub fn evaluate(
        &mut self,
        trip_idx: TripIndex,
        speeds: &SpeedGraph,
    ) -> Result<DurationComparison, CalibrationError> {
        let trip = self.trips.get(trip_idx)?;
        let links = self.trips.links(trip_idx)?;
        let calculator = speeds.build_path_calculator(self.network);
        let route = calculator
            .shortest_path(
                &mut self.search,
                self.network.target_of(links.origin),
                self.network.source_of(links.destination),
                trip.pickup_time,
            )
            .ok_or_else(|| CalibrationError::NoPath {
                trip_id: trip.id,
                origin: self.network.original_edge_id_of(links.origin),
                destination: self.network.original_edge_id_of(links.destination),
            })?;
        let last_link = self.network.edge(links.destination);
        let arrival =
            route.arrival + speeds.travel_time(links.destination, last_link.length, route.arrival);
        let mut path = route.links;
        path.push(links.destination);
        let path_duration = arrival.sub_unchecked(trip.pickup_time);
        let path_distance = self.network.route_length(&path);
        let ratio = path_duration / trip.duration;
        Ok(DurationComparison {
            path,
            path_duration,
            path_distance,
            ratio,
        })
    }
}
