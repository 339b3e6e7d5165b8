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

//! Shortest-path computation on a road network with time-dependent speeds.
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::network::{RoadNetwork, SpeedGraph};
use crate::units::NonNegativeSeconds;

mod min_queue;
mod search;

pub use self::min_queue::MinQueue;
pub use self::search::DijkstraSearch;

/// Path returned by a [PathCalculator].
#[derive(Clone, Debug, PartialEq)]
pub struct ShortestPath {
    /// Sequence of links of the path.
    pub links: Vec<EdgeIndex>,
    /// Departure time from the first node.
    pub departure: NonNegativeSeconds,
    /// Arrival time at the last node.
    pub arrival: NonNegativeSeconds,
}

impl ShortestPath {
    /// Returns the travel time of the path.
    pub fn duration(&self) -> NonNegativeSeconds {
        self.arrival.sub_unchecked(self.departure)
    }
}

/// Shortest-path calculator bound to a snapshot of the speeds of a [SpeedGraph].
///
/// A PathCalculator is created with [SpeedGraph::build_path_calculator].
#[derive(Clone, Copy, Debug)]
pub struct PathCalculator<'a> {
    network: &'a RoadNetwork,
    speeds: &'a SpeedGraph,
}

impl<'a> PathCalculator<'a> {
    pub(crate) const fn new(network: &'a RoadNetwork, speeds: &'a SpeedGraph) -> Self {
        PathCalculator { network, speeds }
    }

    /// Computes the fastest path between two nodes, departing at the given time.
    ///
    /// The `search` memory is reset before the query.
    /// Returns `None` if there is no path from `source` to `target`.
    pub fn shortest_path(
        &self,
        search: &mut DijkstraSearch,
        source: NodeIndex,
        target: NodeIndex,
        departure: NonNegativeSeconds,
    ) -> Option<ShortestPath> {
        search.solve(self.network, self.speeds, source, target, departure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::{edge, node};
    use crate::network::RoadNetworkInput;
    use crate::units::{MetersPerSecond, PositiveSeconds};

    fn secs(t: f64) -> NonNegativeSeconds {
        NonNegativeSeconds::try_from(t).unwrap()
    }

    /// Two routes from 0 to 3: a short one through 1 and a long one through 2.
    fn diamond() -> RoadNetwork {
        RoadNetwork::from_input(RoadNetworkInput {
            nodes: (0..5).map(|i| node(i, i as f64, 0.)).collect(),
            edges: vec![
                edge(0, 0, 1, 1000., 10.),
                edge(1, 1, 3, 1000., 10.),
                edge(2, 0, 2, 1500., 10.),
                edge(3, 2, 3, 1500., 10.),
                edge(4, 3, 0, 10., 10.),
            ],
        })
        .unwrap()
    }

    fn speeds(network: &RoadNetwork) -> SpeedGraph {
        SpeedGraph::free_flow(
            network,
            PositiveSeconds::try_from(100.).unwrap(),
            PositiveSeconds::try_from(1000.).unwrap(),
            MetersPerSecond::try_from(0.1).unwrap(),
        )
    }

    #[test]
    fn shortest_path_test() {
        let network = diamond();
        let mut speeds = speeds(&network);
        let mut search = DijkstraSearch::default();
        let (n0, n3) = (
            network.node_index_of(0).unwrap(),
            network.node_index_of(3).unwrap(),
        );
        let path = speeds
            .build_path_calculator(&network)
            .shortest_path(&mut search, n0, n3, secs(50.))
            .unwrap();
        let ids: Vec<_> = path
            .links
            .iter()
            .map(|&e| network.original_edge_id_of(e))
            .collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(path.duration(), secs(200.));
        assert_eq!(path.arrival, secs(250.));
        // Slow down edge 1 when it is entered (bin 1).
        let e1 = network.edge_index_of(1).unwrap();
        speeds.scale(e1, 1, 0.1).unwrap();
        let path = speeds
            .build_path_calculator(&network)
            .shortest_path(&mut search, n0, n3, secs(50.))
            .unwrap();
        let ids: Vec<_> = path
            .links
            .iter()
            .map(|&e| network.original_edge_id_of(e))
            .collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(path.duration(), secs(300.));
    }

    #[test]
    fn trivial_and_unreachable_test() {
        let network = diamond();
        let speeds = speeds(&network);
        let mut search = DijkstraSearch::default();
        let calculator = speeds.build_path_calculator(&network);
        let n1 = network.node_index_of(1).unwrap();
        let path = calculator
            .shortest_path(&mut search, n1, n1, secs(10.))
            .unwrap();
        assert!(path.links.is_empty());
        assert_eq!(path.duration(), secs(0.));
        let n4 = network.node_index_of(4).unwrap();
        assert!(calculator
            .shortest_path(&mut search, n1, n4, secs(10.))
            .is_none());
    }
}
