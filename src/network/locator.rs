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

//! Nearest-link lookup from planar coordinates.
use petgraph::graph::EdgeIndex;
use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;

use super::RoadNetwork;

type LinkSegment = GeomWithData<Line<[f64; 2]>, EdgeIndex>;

/// Spatial index used to find the link closest to a coordinate.
///
/// Each link is represented by the straight segment between its source and target nodes.
#[derive(Debug)]
pub struct LinkLocator {
    tree: RTree<LinkSegment>,
}

impl LinkLocator {
    /// Builds the spatial index of all the links of the network.
    pub fn new(network: &RoadNetwork) -> Self {
        let segments: Vec<LinkSegment> = network
            .graph()
            .edge_indices()
            .filter_map(|e| {
                let (s, t) = network.edge_endpoints(e)?;
                let line = Line::new(network.node(s).coords(), network.node(t).coords());
                Some(GeomWithData::new(line, e))
            })
            .collect();
        LinkLocator {
            tree: RTree::bulk_load(segments),
        }
    }

    /// Returns the link whose segment is the closest to the given coordinates.
    ///
    /// Returns `None` only if the network has no link.
    pub fn nearest_link(&self, coords: [f64; 2]) -> Option<EdgeIndex> {
        self.tree.nearest_neighbor(&coords).map(|obj| obj.data)
    }
}
