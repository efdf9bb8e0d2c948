//! Topology helpers: connected islands of regions.
//!
//! An island is a set of regions linked by lines, ignoring line orientation.
//! Power cannot move between islands, so each island has to cover its own
//! demand; the infeasibility diagnosis in `nodal-algo` uses this.

use crate::{Megawatts, Network, RegionId};
use petgraph::algo::connected_components;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// A weakly connected group of regions with its demand and capacity totals.
#[derive(Debug, Clone, Serialize)]
pub struct Island {
    pub island_id: usize,
    pub regions: Vec<RegionId>,
    pub demand: Megawatts,
    pub capacity: Megawatts,
}

impl Island {
    /// Capacity minus demand; negative when the island cannot serve itself.
    pub fn margin(&self) -> Megawatts {
        self.capacity - self.demand
    }
}

/// Number of weakly connected components (breadth-first search would agree).
pub fn island_count(network: &Network) -> usize {
    connected_components(network.graph())
}

/// Labels weakly connected components by breadth-first search, in order of
/// the lowest region id they contain.
pub fn find_islands(network: &Network) -> Vec<Island> {
    let graph = network.graph();
    let mut visited = HashSet::new();
    let mut islands = Vec::new();

    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(graph[node].id);
            for neighbor in graph.neighbors_undirected(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort();

        let demand = members.iter().map(|r| network.region(*r).demand).sum();
        let capacity = members.iter().map(|r| network.capacity_in(*r)).sum();
        islands.push(Island {
            island_id: islands.len(),
            regions: members,
            demand,
            capacity,
        });
    }

    islands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_island() {
        let mut network = Network::new();
        network.add_region("A", 10.0).unwrap();
        network.add_region("B", 20.0).unwrap();
        network.add_generator("A", "Gas", 50.0, 30.0).unwrap();
        network.add_line("B-A", "B", "A", 5.0).unwrap();

        let islands = find_islands(&network);
        assert_eq!(islands.len(), 1);
        assert_eq!(island_count(&network), 1);
        assert_eq!(islands[0].regions.len(), 2);
        assert_eq!(islands[0].margin(), Megawatts(20.0));
    }

    #[test]
    fn test_disconnected_islands_report_their_own_margin() {
        let mut network = Network::new();
        network.add_region("A", 10.0).unwrap();
        network.add_region("B", 20.0).unwrap();
        network.add_region("C", 30.0).unwrap();
        network.add_generator("A", "Gas", 50.0, 30.0).unwrap();
        network.add_generator("C", "Hydro", 10.0, 3.0).unwrap();
        network.add_line("A-B", "A", "B", 25.0).unwrap();

        let islands = find_islands(&network);
        assert_eq!(islands.len(), 2);
        assert_eq!(island_count(&network), 2);
        assert_eq!(islands[0].margin(), Megawatts(20.0));
        assert_eq!(islands[1].margin(), Megawatts(-20.0));
        assert_eq!(islands[1].regions, vec![network.region_by_name("C").unwrap().id]);
    }
}
