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

//! Time-dependent Dijkstra search.
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::min_queue::MinQueue;
use super::ShortestPath;
use crate::network::{RoadNetwork, SpeedGraph};
use crate::units::NonNegativeSeconds;

/// Data stored for each node reached by the search.
#[derive(Clone, Copy, Debug, PartialEq)]
struct NodeData {
    /// Earliest known arrival time at the node.
    arrival: NonNegativeSeconds,
    /// Previous node and edge used to reach the node (`None` for the source).
    predecessor: Option<(NodeIndex, EdgeIndex)>,
    /// `true` once the arrival time is final.
    settled: bool,
}

impl NodeData {
    const fn new(
        arrival: NonNegativeSeconds,
        predecessor: Option<(NodeIndex, EdgeIndex)>,
    ) -> Self {
        NodeData {
            arrival,
            predecessor,
            settled: false,
        }
    }
}

/// Data structures of a time-dependent Dijkstra search.
///
/// The same DijkstraSearch can be used for many queries: it is reset at the start of each query
/// so that its allocations are reused.
#[derive(Clone, Debug, Default)]
pub struct DijkstraSearch {
    /// A map Node -> Data.
    data: HashMap<NodeIndex, NodeData>,
    /// Nodes in the queue, ordered by arrival time then by index.
    queue: MinQueue<NodeIndex, (NonNegativeSeconds, NodeIndex)>,
}

impl DijkstraSearch {
    /// Reset all data structures of the instance.
    pub fn reset(&mut self) {
        self.data.clear();
        self.queue.reset();
    }

    /// Returns the number of nodes reached by the last query.
    pub fn nb_reached_nodes(&self) -> usize {
        self.data.len()
    }

    /// Computes the earliest-arrival path from `source` to `target`, leaving `source` at
    /// `departure`.
    ///
    /// The travel time of an edge is given by the speed of the time bin in which the edge is
    /// entered.
    /// The search stops as soon as `target` is settled.
    /// Returns `None` if `target` cannot be reached from `source`.
    pub(crate) fn solve(
        &mut self,
        network: &RoadNetwork,
        speeds: &SpeedGraph,
        source: NodeIndex,
        target: NodeIndex,
        departure: NonNegativeSeconds,
    ) -> Option<ShortestPath> {
        self.reset();
        self.data.insert(source, NodeData::new(departure, None));
        self.queue.push(source, (departure, source));
        // Settle the nodes in order of increasing arrival time.
        while let Some((node, (time, _))) = self.queue.pop() {
            if let Some(node_data) = self.data.get_mut(&node) {
                node_data.settled = true;
            }
            if node == target {
                return self.path_to(target).map(|links| ShortestPath {
                    links,
                    departure,
                    arrival: time,
                });
            }
            for edge in network.graph().edges(node) {
                let v = edge.target();
                let arrival = time + speeds.travel_time(edge.id(), edge.weight().length, time);
                match self.data.entry(v) {
                    Entry::Occupied(mut entry) => {
                        let v_data = entry.get_mut();
                        if !v_data.settled && arrival < v_data.arrival {
                            v_data.arrival = arrival;
                            v_data.predecessor = Some((node, edge.id()));
                            self.queue.decrease_value(v, (arrival, v));
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(NodeData::new(arrival, Some((node, edge.id()))));
                        self.queue.push(v, (arrival, v));
                    }
                }
            }
        }
        None
    }

    /// Returns the sequence of edges from the source of the last query to `target`.
    fn path_to(&self, target: NodeIndex) -> Option<Vec<EdgeIndex>> {
        let mut path = Vec::new();
        let mut node_data = self.data.get(&target)?;
        while let Some((prev, edge)) = node_data.predecessor {
            path.push(edge);
            node_data = self.data.get(&prev)?;
        }
        path.reverse();
        Some(path)
    }
}
