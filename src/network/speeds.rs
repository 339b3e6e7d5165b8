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

//! Time-dependent speeds of the links of a road network.
use std::ops::RangeInclusive;

use anyhow::{bail, Result};
use hashbrown::HashSet;
use petgraph::graph::EdgeIndex;
use serde_derive::{Deserialize, Serialize};

use super::{OriginalEdgeId, RoadNetwork};
use crate::errors::CalibrationError;
use crate::routing::PathCalculator;
use crate::units::{MetersPerSecond, NonNegativeMeters, NonNegativeSeconds, PositiveSeconds};

/// Speeds of a single link for all time bins, keyed by the original link id.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LinkSpeedRecord {
    /// Original id of the link.
    pub link_id: OriginalEdgeId,
    /// Speed of the link for each time bin.
    pub speeds: Vec<MetersPerSecond>,
}

/// Result of a call to [SpeedGraph::scale].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleOutcome {
    /// The speed was multiplied by the factor.
    Scaled,
    /// The scaled speed would have been below the minimum speed so it was clamped.
    Clamped,
}

/// Time-binned speeds of all the links of a [RoadNetwork].
///
/// The simulated period `[0, horizon]` is split in `nb_bins` time bins of width `dt`.
/// Times after the horizon are mapped to the last time bin.
///
/// All speeds are strictly positive: [SpeedGraph::scale] never stores a speed below
/// `min(min_speed, current_speed)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeedGraph {
    dt: PositiveSeconds,
    nb_bins: usize,
    min_speed: MetersPerSecond,
    /// Speeds, stored link by link (`nb_bins` values per link).
    speeds: Vec<MetersPerSecond>,
}

impl SpeedGraph {
    /// Creates a SpeedGraph where every link has its free-flow speed for all time bins.
    pub fn free_flow(
        network: &RoadNetwork,
        dt: PositiveSeconds,
        horizon: PositiveSeconds,
        min_speed: MetersPerSecond,
    ) -> Self {
        let nb_bins = Self::nb_bins_for(dt, horizon);
        let speeds = network
            .iter_edges()
            .flat_map(|(_, edge)| std::iter::repeat(edge.speed).take(nb_bins))
            .collect();
        SpeedGraph {
            dt,
            nb_bins,
            min_speed,
            speeds,
        }
    }

    /// Creates a SpeedGraph from previously saved speed records.
    ///
    /// Links without a record get their free-flow speed.
    /// Returns an error if a record references an unknown link, if a link has two records or if
    /// a record does not have exactly one speed per time bin.
    pub fn from_records(
        network: &RoadNetwork,
        dt: PositiveSeconds,
        horizon: PositiveSeconds,
        min_speed: MetersPerSecond,
        records: Vec<LinkSpeedRecord>,
    ) -> Result<Self> {
        let mut graph = Self::free_flow(network, dt, horizon, min_speed);
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            let Some(edge) = network.edge_index_of(record.link_id) else {
                bail!("Speed record for unknown link {}", record.link_id);
            };
            if !seen.insert(record.link_id) {
                bail!("Found two speed records for link {}", record.link_id);
            }
            if record.speeds.len() != graph.nb_bins {
                bail!(
                    "Speed record for link {} has {} values but there are {} time bins",
                    record.link_id,
                    record.speeds.len(),
                    graph.nb_bins
                );
            }
            graph.link_speeds_mut(edge).copy_from_slice(&record.speeds);
        }
        Ok(graph)
    }

    fn nb_bins_for(dt: PositiveSeconds, horizon: PositiveSeconds) -> usize {
        ((horizon.value() / dt.value()).ceil() as usize).max(1)
    }

    /// Returns the width of the time bins.
    pub const fn dt(&self) -> PositiveSeconds {
        self.dt
    }

    /// Returns the number of time bins of each link.
    pub const fn nb_bins(&self) -> usize {
        self.nb_bins
    }

    /// Returns the minimum speed that a rescaling can produce.
    pub const fn min_speed(&self) -> MetersPerSecond {
        self.min_speed
    }

    /// Returns the number of links.
    pub fn nb_links(&self) -> usize {
        self.speeds.len() / self.nb_bins
    }

    fn offset(&self, link: EdgeIndex, bin: usize) -> usize {
        debug_assert!(bin < self.nb_bins);
        link.index() * self.nb_bins + bin
    }

    fn link_speeds_mut(&mut self, link: EdgeIndex) -> &mut [MetersPerSecond] {
        let start = self.offset(link, 0);
        &mut self.speeds[start..start + self.nb_bins]
    }

    /// Returns the speeds of a link for all time bins.
    pub fn link_speeds(&self, link: EdgeIndex) -> &[MetersPerSecond] {
        let start = self.offset(link, 0);
        &self.speeds[start..start + self.nb_bins]
    }

    /// Returns the speed of a link at the given time bin.
    ///
    /// **Panics** if the link or the time bin is out of range.
    pub fn speed_at(&self, link: EdgeIndex, bin: usize) -> MetersPerSecond {
        self.speeds[self.offset(link, bin)]
    }

    /// Returns the time bin containing the given time.
    pub fn bin_of(&self, time: NonNegativeSeconds) -> usize {
        let bin = (time / self.dt).value().floor() as usize;
        bin.min(self.nb_bins - 1)
    }

    /// Returns the (inclusive) range of time bins intersected by the time window
    /// `[start, end]`.
    pub fn bins_between(
        &self,
        start: NonNegativeSeconds,
        end: NonNegativeSeconds,
    ) -> RangeInclusive<usize> {
        debug_assert!(start <= end);
        self.bin_of(start)..=self.bin_of(end)
    }

    /// Returns the travel time on a link of the given length, when entering the link at
    /// `entry_time`.
    ///
    /// The speed is the speed of the time bin containing the entry time.
    pub fn travel_time(
        &self,
        link: EdgeIndex,
        length: NonNegativeMeters,
        entry_time: NonNegativeSeconds,
    ) -> NonNegativeSeconds {
        length / self.speed_at(link, self.bin_of(entry_time))
    }

    /// Multiplies the speed of a link at the given time bin by `factor`.
    ///
    /// If the new speed would be below the minimum speed, the speed is set to the minimum of the
    /// minimum speed and the current speed.
    /// Returns an error if `factor` is negative or not finite.
    pub fn scale(
        &mut self,
        link: EdgeIndex,
        bin: usize,
        factor: f64,
    ) -> Result<ScaleOutcome, CalibrationError> {
        let idx = self.offset(link, bin);
        let speed = self.speeds[idx];
        let new_speed = speed.value() * factor;
        if !factor.is_finite() || factor < 0.0 || !new_speed.is_finite() {
            return Err(CalibrationError::InvalidState {
                link: link.index(),
                bin,
                speed,
                factor,
            });
        }
        let floor = self.min_speed.min(speed);
        if new_speed < floor.value() {
            self.speeds[idx] = floor;
            Ok(ScaleOutcome::Clamped)
        } else {
            self.speeds[idx] = MetersPerSecond::new_unchecked(new_speed);
            Ok(ScaleOutcome::Scaled)
        }
    }

    /// Returns a [PathCalculator] that computes shortest paths with the current speeds.
    ///
    /// The calculator borrows the speeds so it must be rebuilt after any speed update.
    pub fn build_path_calculator<'a>(&'a self, network: &'a RoadNetwork) -> PathCalculator<'a> {
        debug_assert_eq!(network.edge_count(), self.nb_links());
        PathCalculator::new(network, self)
    }

    /// Returns the speeds of all links, keyed by their original id.
    pub fn to_records(&self, network: &RoadNetwork) -> Vec<LinkSpeedRecord> {
        network
            .iter_edges()
            .map(|(e, edge)| LinkSpeedRecord {
                link_id: edge.id,
                speeds: self.link_speeds(e).to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::line_network;

    fn secs(t: f64) -> NonNegativeSeconds {
        NonNegativeSeconds::try_from(t).unwrap()
    }

    fn speed_graph(network: &RoadNetwork) -> SpeedGraph {
        SpeedGraph::free_flow(
            network,
            PositiveSeconds::try_from(900.).unwrap(),
            PositiveSeconds::try_from(3600.).unwrap(),
            MetersPerSecond::try_from(1.).unwrap(),
        )
    }

    #[test]
    fn bins_test() {
        let network = line_network();
        let speeds = speed_graph(&network);
        assert_eq!(speeds.nb_bins(), 4);
        assert_eq!(speeds.nb_links(), 3);
        assert_eq!(speeds.bin_of(secs(0.)), 0);
        assert_eq!(speeds.bin_of(secs(899.)), 0);
        assert_eq!(speeds.bin_of(secs(900.)), 1);
        assert_eq!(speeds.bin_of(secs(10_000.)), 3);
        assert_eq!(speeds.bins_between(secs(800.), secs(1900.)), 0..=2);
        assert_eq!(speeds.bins_between(secs(100.), secs(200.)), 0..=0);
        let e = network.edge_index_of(10).unwrap();
        assert_eq!(speeds.travel_time(e, network.edge(e).length, secs(0.)), secs(100.));
    }

    #[test]
    fn scale_test() {
        let network = line_network();
        let mut speeds = speed_graph(&network);
        let e = network.edge_index_of(11).unwrap();
        assert_eq!(speeds.scale(e, 2, 1.5), Ok(ScaleOutcome::Scaled));
        assert_eq!(speeds.speed_at(e, 2).value(), 15.);
        assert_eq!(speeds.speed_at(e, 1).value(), 10.);
        // 10 m/s * 0.01 = 0.1 m/s is below the 1 m/s floor.
        assert_eq!(speeds.scale(e, 1, 0.01), Ok(ScaleOutcome::Clamped));
        assert_eq!(speeds.speed_at(e, 1).value(), 1.);
        assert_eq!(speeds.scale(e, 0, 0.0), Ok(ScaleOutcome::Clamped));
        assert_eq!(speeds.speed_at(e, 0).value(), 1.);
        assert!(matches!(
            speeds.scale(e, 0, -1.0),
            Err(CalibrationError::InvalidState { .. })
        ));
        assert!(matches!(
            speeds.scale(e, 0, f64::NAN),
            Err(CalibrationError::InvalidState { .. })
        ));
        assert!(matches!(
            speeds.scale(e, 0, f64::INFINITY),
            Err(CalibrationError::InvalidState { .. })
        ));
        assert!(speeds.speeds.iter().all(|s| s.value() > 0.0));
    }

    #[test]
    fn records_test() {
        let network = line_network();
        let mut speeds = speed_graph(&network);
        let e = network.edge_index_of(12).unwrap();
        speeds.scale(e, 3, 2.0).unwrap();
        let records = speeds.to_records(&network);
        assert_eq!(records.len(), 3);
        let dt = PositiveSeconds::try_from(900.).unwrap();
        let horizon = PositiveSeconds::try_from(3600.).unwrap();
        let min_speed = MetersPerSecond::try_from(1.).unwrap();
        let restored =
            SpeedGraph::from_records(&network, dt, horizon, min_speed, records.clone()).unwrap();
        assert_eq!(restored, speeds);
        // Missing records default to free-flow speeds.
        let partial =
            SpeedGraph::from_records(&network, dt, horizon, min_speed, records[2..].to_vec())
                .unwrap();
        assert_eq!(partial, speeds);
        let mut bad = records.clone();
        bad[0].speeds.pop();
        assert!(SpeedGraph::from_records(&network, dt, horizon, min_speed, bad).is_err());
        let mut unknown = records;
        unknown[0].link_id = 99;
        assert!(SpeedGraph::from_records(&network, dt, horizon, min_speed, unknown).is_err());
    }
}
