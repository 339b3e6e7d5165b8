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

//! Description of the road network used to compute shortest paths.
use anyhow::{bail, Context, Result};
use hashbrown::HashMap;
use log::debug;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde_derive::{Deserialize, Serialize};

use crate::logging::{send_warning_at_most_once, WarningType};
use crate::units::{MetersPerSecond, NonNegativeMeters};

pub mod locator;
pub mod speeds;

pub use self::locator::LinkLocator;
pub use self::speeds::{LinkSpeedRecord, SpeedGraph};

/// Identifier of a node as given by the user.
pub type OriginalNodeId = u64;
/// Identifier of an edge as given by the user.
pub type OriginalEdgeId = u64;

/// A node of a road network, with coordinates in a projected system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RoadNode {
    /// Original id of the node.
    pub id: OriginalNodeId,
    /// Horizontal coordinate of the node.
    pub x: f64,
    /// Vertical coordinate of the node.
    pub y: f64,
}

impl RoadNode {
    /// Returns the coordinates of the node.
    pub const fn coords(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// An edge (link) of a road network.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RoadEdge {
    /// Original id of the edge.
    pub id: OriginalEdgeId,
    /// Original id of the source node.
    pub source: OriginalNodeId,
    /// Original id of the target node.
    pub target: OriginalNodeId,
    /// Length of the edge.
    pub length: NonNegativeMeters,
    /// Free-flow speed on the edge.
    pub speed: MetersPerSecond,
}

/// Nodes and edges of a road network, as read from the input file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RoadNetworkInput {
    pub nodes: Vec<RoadNode>,
    pub edges: Vec<RoadEdge>,
}

/// Immutable directed graph of a road network.
///
/// The graph stores, for each node, its coordinates and, for each edge, its length and free-flow
/// speed.
/// The structure of the graph never changes after creation: the time-dependent speeds are stored
/// in a separate [SpeedGraph].
#[derive(Clone, Debug)]
pub struct RoadNetwork {
    graph: DiGraph<RoadNode, RoadEdge>,
    /// Mapping from original node id to NodeIndex.
    node_map: HashMap<OriginalNodeId, NodeIndex>,
    /// Mapping from original edge id to EdgeIndex.
    edge_map: HashMap<OriginalEdgeId, EdgeIndex>,
}

impl RoadNetwork {
    /// Creates a new RoadNetwork from a list of nodes and a list of edges.
    ///
    /// Returns an error if the edge list is empty, if two edges or two nodes share the same id or
    /// if an edge references an unknown node.
    pub fn from_input(input: RoadNetworkInput) -> Result<Self> {
        let RoadNetworkInput { nodes, edges } = input;
        if edges.is_empty() {
            bail!("The road network has no edge");
        }
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut node_map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id;
            let idx = graph.add_node(node);
            if node_map.insert(id, idx).is_some() {
                bail!("Found two nodes with id {id}");
            }
        }
        let mut edge_map = HashMap::with_capacity(edges.len());
        let mut has_parallel_edges = false;
        for edge in edges {
            let id = edge.id;
            let source = *node_map
                .get(&edge.source)
                .with_context(|| format!("Edge {id} has an unknown source node {}", edge.source))?;
            let target = *node_map
                .get(&edge.target)
                .with_context(|| format!("Edge {id} has an unknown target node {}", edge.target))?;
            has_parallel_edges |= graph.find_edge(source, target).is_some();
            let idx = graph.add_edge(source, target, edge);
            if edge_map.insert(id, idx).is_some() {
                bail!("Found two edges with id {id}");
            }
        }
        if has_parallel_edges {
            send_warning_at_most_once(
                WarningType::ParallelEdges,
                "The road network has parallel edges",
            );
        }
        debug!(
            "Road network with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(RoadNetwork {
            graph,
            node_map,
            edge_map,
        })
    }

    /// Returns a reference to the underlying [DiGraph].
    pub const fn graph(&self) -> &DiGraph<RoadNode, RoadEdge> {
        &self.graph
    }

    /// Returns the number of nodes in the network.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the network.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the [RoadEdge] with the given index.
    ///
    /// **Panics** if the index is not a valid edge index.
    pub fn edge(&self, edge: EdgeIndex) -> &RoadEdge {
        &self.graph[edge]
    }

    /// Returns the [RoadNode] with the given index.
    ///
    /// **Panics** if the index is not a valid node index.
    pub fn node(&self, node: NodeIndex) -> &RoadNode {
        &self.graph[node]
    }

    /// Returns the source and target of a given edge.
    ///
    /// Returns `None` if there is no edge with the given [EdgeIndex].
    pub fn edge_endpoints(&self, edge: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(edge)
    }

    /// Returns the source node (tail) of an edge.
    ///
    /// **Panics** if the index is not a valid edge index.
    pub fn source_of(&self, edge: EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[edge.index()].source()
    }

    /// Returns the target node (head) of an edge.
    ///
    /// **Panics** if the index is not a valid edge index.
    pub fn target_of(&self, edge: EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[edge.index()].target()
    }

    /// Returns the [EdgeIndex] of an edge given its original id.
    pub fn edge_index_of(&self, original_id: OriginalEdgeId) -> Option<EdgeIndex> {
        self.edge_map.get(&original_id).copied()
    }

    /// Returns the [NodeIndex] of a node given its original id.
    pub fn node_index_of(&self, original_id: OriginalNodeId) -> Option<NodeIndex> {
        self.node_map.get(&original_id).copied()
    }

    /// Returns the original id of an edge.
    ///
    /// **Panics** if the index is not a valid edge index.
    pub fn original_edge_id_of(&self, edge: EdgeIndex) -> OriginalEdgeId {
        self.graph[edge].id
    }

    /// Returns an iterator over the edges of the network, in index order.
    pub fn iter_edges(&self) -> impl Iterator<Item = (EdgeIndex, &RoadEdge)> {
        self.graph
            .edge_indices()
            .map(move |e| (e, &self.graph[e]))
    }

    /// Returns the total length of a sequence of edges.
    pub fn route_length(&self, route: &[EdgeIndex]) -> NonNegativeMeters {
        route.iter().map(|&e| self.graph[e].length).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn node(id: u64, x: f64, y: f64) -> RoadNode {
        RoadNode { id, x, y }
    }

    pub(crate) fn edge(id: u64, source: u64, target: u64, length: f64, speed: f64) -> RoadEdge {
        RoadEdge {
            id,
            source,
            target,
            length: NonNegativeMeters::try_from(length).unwrap(),
            speed: MetersPerSecond::try_from(speed).unwrap(),
        }
    }

    /// Line network `0 -> 1 -> 2 -> 3` with 1 km edges at 10 m/s.
    pub(crate) fn line_network() -> RoadNetwork {
        let input = RoadNetworkInput {
            nodes: (0..4).map(|i| node(i, 1000. * i as f64, 0.)).collect(),
            edges: vec![
                edge(10, 0, 1, 1000., 10.),
                edge(11, 1, 2, 1000., 10.),
                edge(12, 2, 3, 1000., 10.),
            ],
        };
        RoadNetwork::from_input(input).unwrap()
    }

    #[test]
    fn from_input_test() {
        let network = line_network();
        assert_eq!(network.node_count(), 4);
        assert_eq!(network.edge_count(), 3);
        let e = network.edge_index_of(11).unwrap();
        assert_eq!(network.original_edge_id_of(e), 11);
        let (s, t) = network.edge_endpoints(e).unwrap();
        assert_eq!(network.node(s).id, 1);
        assert_eq!(network.node(t).id, 2);
        assert!(network.edge_index_of(99).is_none());
        assert_eq!(
            network.route_length(&[e, network.edge_index_of(12).unwrap()]),
            NonNegativeMeters::try_from(2000.).unwrap()
        );
    }

    #[test]
    fn invalid_input_test() {
        let empty = RoadNetworkInput {
            nodes: vec![node(0, 0., 0.)],
            edges: Vec::new(),
        };
        assert!(RoadNetwork::from_input(empty).is_err());
        let unknown_node = RoadNetworkInput {
            nodes: vec![node(0, 0., 0.)],
            edges: vec![edge(0, 0, 1, 10., 10.)],
        };
        assert!(RoadNetwork::from_input(unknown_node).is_err());
        let duplicate = RoadNetworkInput {
            nodes: vec![node(0, 0., 0.), node(1, 1., 0.)],
            edges: vec![edge(0, 0, 1, 10., 10.), edge(0, 1, 0, 10., 10.)],
        };
        assert!(RoadNetwork::from_input(duplicate).is_err());
    }

    #[test]
    fn deserialize_test() {
        let json = r#"{
            "nodes": [{"id": 1, "x": 0.0, "y": 0.0}, {"id": 2, "x": 100.0, "y": 0.0}],
            "edges": [{"id": 7, "source": 1, "target": 2, "length": 100.0, "speed": 13.9}]
        }"#;
        let input: RoadNetworkInput = serde_json::from_str(json).unwrap();
        let network = RoadNetwork::from_input(input).unwrap();
        assert_eq!(network.edge_count(), 1);
        let bad = r#"{"nodes": [], "edges": [{"id": 7, "source": 1, "target": 2, "length": 100.0, "speed": 0.0}]}"#;
        assert!(serde_json::from_str::<RoadNetworkInput>(bad).is_err());
    }
}
