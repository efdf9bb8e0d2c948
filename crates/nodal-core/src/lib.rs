//! # nodal-core: Network model for economic dispatch
//!
//! Holds the static topology a dispatch is computed on: regions with a single
//! demand value, generators (one per region and technology) with capacity and
//! marginal cost, and capacity-limited transmission lines.
//!
//! ## Design
//!
//! The network is a **directed multigraph**:
//! - **Nodes**: [`Region`]s
//! - **Edges**: [`Line`]s, oriented from their `from` region to their `to` region
//!
//! Direction is only a sign convention. A line carries power either way up to
//! its capacity; the orientation decides which end counts a positive flow as
//! leaving ([`LineEnd::From`], sign +1) and which as arriving ([`LineEnd::To`],
//! sign −1). Parallel lines between the same regions are separate edges.
//!
//! Generators are not graph nodes; they are kept in declaration order and
//! point at their region.
//!
//! ## Quick Start
//!
//! ```
//! use nodal_core::Network;
//!
//! let mut network = Network::new();
//! network.add_region("A", 100.0)?;
//! network.add_region("B", 50.0)?;
//! network.add_generator("A", "Coal", 150.0, 10.0)?;
//! network.add_generator("B", "Hydro", 30.0, 5.0)?;
//! network.add_line("A-B", "A", "B", 40.0)?;
//!
//! let b = network.region_by_name("B").unwrap().id;
//! let incidence = network.incidence(b);
//! assert_eq!(incidence.len(), 1);
//! assert_eq!(incidence[0].sign(), -1.0);
//! # Ok::<(), nodal_core::NetworkError>(())
//! ```
//!
//! ## Validation
//!
//! Every `add_*` call validates its inputs before touching the model: unknown
//! or duplicate identifiers, negative or non-finite numbers, and self-loops
//! are rejected with a [`NetworkError`] and the network is left unchanged.
//! Softer problems (capacity short of demand, isolated regions) are reported
//! through [`Network::validate_into`].

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{EntityKind, NetworkError, NodalError, NodalResult};
pub use graph_utils::{find_islands, Island};
pub use units::{CostRate, EmissionIntensity, EmissionRate, Megawatts, PricePerMwh};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RegionId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GeneratorId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LineId(usize);

impl RegionId {
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }

    fn node(self) -> NodeIndex {
        NodeIndex::new(self.0)
    }
}

impl GeneratorId {
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LineId {
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }

    fn edge(self) -> EdgeIndex {
        EdgeIndex::new(self.0)
    }
}

/// Geographic position (longitude, latitude). Metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    /// Fixed demand to be served in this region
    pub demand: Megawatts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Generator {
    pub id: GeneratorId,
    /// "<region> <technology>", unique across the network
    pub name: String,
    pub region: RegionId,
    pub technology: String,
    /// Upper bound on dispatch
    pub capacity: Megawatts,
    pub marginal_cost: PricePerMwh,
}

#[derive(Debug, Clone, Serialize)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    pub from: RegionId,
    pub to: RegionId,
    /// Symmetric limit: -capacity <= flow <= capacity
    pub capacity: Megawatts,
}

/// Carrier metadata for a technology label.
#[derive(Debug, Clone, Serialize)]
pub struct Technology {
    pub label: String,
    pub co2_intensity: EmissionIntensity,
}

/// Which end of a line a region sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnd {
    From,
    To,
}

/// One (line, sign) pair of a region's incidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Incidence {
    pub line: LineId,
    pub end: LineEnd,
}

impl Incidence {
    /// +1 at the from-region, −1 at the to-region.
    pub fn sign(&self) -> f64 {
        match self.end {
            LineEnd::From => 1.0,
            LineEnd::To => -1.0,
        }
    }
}

/// The dispatch network
#[derive(Debug, Default)]
pub struct Network {
    graph: DiGraph<Region, Line>,
    generators: Vec<Generator>,
    technologies: BTreeMap<String, Technology>,
    regions_by_name: HashMap<String, RegionId>,
    lines_by_name: HashMap<String, LineId>,
    generators_by_key: HashMap<(RegionId, String), GeneratorId>,
}

fn check_finite(
    value: f64,
    kind: EntityKind,
    entity: &str,
    field: &'static str,
) -> Result<(), NetworkError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NetworkError::NonFinite {
            kind,
            entity: entity.to_string(),
            field,
        })
    }
}

fn check_capacity(value: f64, kind: EntityKind, entity: &str) -> Result<(), NetworkError> {
    check_finite(value, kind, entity, "capacity")?;
    if value < 0.0 {
        return Err(NetworkError::NegativeCapacity {
            kind,
            entity: entity.to_string(),
            value,
        });
    }
    Ok(())
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a region with its demand in MW.
    pub fn add_region(
        &mut self,
        name: impl Into<String>,
        demand_mw: f64,
    ) -> Result<RegionId, NetworkError> {
        self.insert_region(name.into(), demand_mw, None)
    }

    /// Declare a region with demand and geographic coordinates.
    pub fn add_region_at(
        &mut self,
        name: impl Into<String>,
        demand_mw: f64,
        coordinates: Coordinates,
    ) -> Result<RegionId, NetworkError> {
        self.insert_region(name.into(), demand_mw, Some(coordinates))
    }

    fn insert_region(
        &mut self,
        name: String,
        demand_mw: f64,
        coordinates: Option<Coordinates>,
    ) -> Result<RegionId, NetworkError> {
        if self.regions_by_name.contains_key(&name) {
            return Err(NetworkError::DuplicateEntity {
                kind: EntityKind::Region,
                id: name,
            });
        }
        check_finite(demand_mw, EntityKind::Region, &name, "demand")?;
        if demand_mw < 0.0 {
            return Err(NetworkError::NegativeDemand {
                region: name,
                value: demand_mw,
            });
        }

        let id = RegionId(self.graph.node_count());
        self.graph.add_node(Region {
            id,
            name: name.clone(),
            demand: Megawatts(demand_mw),
            coordinates,
        });
        debug!(region = %name, demand_mw, "added region");
        self.regions_by_name.insert(name, id);
        Ok(id)
    }

    /// Declare a generator of `technology` in `region`.
    ///
    /// A region holds at most one generator per technology, so that every
    /// (region, technology) pair has exactly one marginal cost.
    pub fn add_generator(
        &mut self,
        region: &str,
        technology: impl Into<String>,
        capacity_mw: f64,
        marginal_cost: f64,
    ) -> Result<GeneratorId, NetworkError> {
        let technology = technology.into();
        let name = format!("{} {}", region, technology);

        let region_id = self.lookup_region(region, EntityKind::Generator, &name)?;
        let key = (region_id, technology.clone());
        if self.generators_by_key.contains_key(&key) {
            return Err(NetworkError::DuplicateEntity {
                kind: EntityKind::Generator,
                id: name,
            });
        }
        check_capacity(capacity_mw, EntityKind::Generator, &name)?;
        check_finite(marginal_cost, EntityKind::Generator, &name, "marginal cost")?;

        let id = GeneratorId(self.generators.len());
        debug!(generator = %name, capacity_mw, marginal_cost, "added generator");
        self.generators.push(Generator {
            id,
            name,
            region: region_id,
            technology,
            capacity: Megawatts(capacity_mw),
            marginal_cost: PricePerMwh(marginal_cost),
        });
        self.generators_by_key.insert(key, id);
        Ok(id)
    }

    /// Declare a line oriented `from` → `to`.
    pub fn add_line(
        &mut self,
        name: impl Into<String>,
        from: &str,
        to: &str,
        capacity_mw: f64,
    ) -> Result<LineId, NetworkError> {
        let name = name.into();
        if self.lines_by_name.contains_key(&name) {
            return Err(NetworkError::DuplicateEntity {
                kind: EntityKind::Line,
                id: name,
            });
        }
        let from_id = self.lookup_region(from, EntityKind::Line, &name)?;
        let to_id = self.lookup_region(to, EntityKind::Line, &name)?;
        if from_id == to_id {
            return Err(NetworkError::SelfLoop {
                line: name,
                region: from.to_string(),
            });
        }
        check_capacity(capacity_mw, EntityKind::Line, &name)?;

        let id = LineId(self.graph.edge_count());
        self.graph.add_edge(
            from_id.node(),
            to_id.node(),
            Line {
                id,
                name: name.clone(),
                from: from_id,
                to: to_id,
                capacity: Megawatts(capacity_mw),
            },
        );
        debug!(line = %name, from, to, capacity_mw, "added line");
        self.lines_by_name.insert(name, id);
        Ok(id)
    }

    /// Register carrier metadata for a technology label.
    pub fn add_technology(
        &mut self,
        label: impl Into<String>,
        co2_intensity: f64,
    ) -> Result<(), NetworkError> {
        let label = label.into();
        if self.technologies.contains_key(&label) {
            return Err(NetworkError::DuplicateEntity {
                kind: EntityKind::Technology,
                id: label,
            });
        }
        check_finite(co2_intensity, EntityKind::Technology, &label, "CO2 intensity")?;
        if co2_intensity < 0.0 {
            return Err(NetworkError::NegativeEmissionIntensity {
                technology: label,
                value: co2_intensity,
            });
        }
        self.technologies.insert(
            label.clone(),
            Technology {
                label,
                co2_intensity: EmissionIntensity(co2_intensity),
            },
        );
        Ok(())
    }

    fn lookup_region(
        &self,
        region: &str,
        kind: EntityKind,
        entity: &str,
    ) -> Result<RegionId, NetworkError> {
        self.regions_by_name
            .get(region)
            .copied()
            .ok_or_else(|| NetworkError::UnknownRegion {
                kind,
                entity: entity.to_string(),
                region: region.to_string(),
            })
    }

    // =========================================================================
    // Read-only views
    // =========================================================================

    /// Underlying graph (regions as nodes, lines as directed edges).
    pub fn graph(&self) -> &DiGraph<Region, Line> {
        &self.graph
    }

    /// Regions in declaration order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.graph.node_weights()
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.graph[id.node()]
    }

    pub fn region_by_name(&self, name: &str) -> Option<&Region> {
        self.regions_by_name.get(name).map(|id| self.region(*id))
    }

    pub fn num_regions(&self) -> usize {
        self.graph.node_count()
    }

    /// Generators in declaration order.
    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn generator(&self, id: GeneratorId) -> &Generator {
        &self.generators[id.0]
    }

    pub fn generator_by_key(&self, region: &str, technology: &str) -> Option<&Generator> {
        let region = *self.regions_by_name.get(region)?;
        self.generators_by_key
            .get(&(region, technology.to_string()))
            .map(|id| self.generator(*id))
    }

    /// Generators located in `region`, in declaration order.
    pub fn generators_in(&self, region: RegionId) -> impl Iterator<Item = &Generator> {
        self.generators.iter().filter(move |g| g.region == region)
    }

    /// Lines in declaration order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.graph.edge_weights()
    }

    pub fn line(&self, id: LineId) -> &Line {
        &self.graph[id.edge()]
    }

    pub fn line_by_name(&self, name: &str) -> Option<&Line> {
        self.lines_by_name.get(name).map(|id| self.line(*id))
    }

    pub fn num_lines(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn technology(&self, label: &str) -> Option<&Technology> {
        self.technologies.get(label)
    }

    /// Registered technologies, ordered by label.
    pub fn technologies(&self) -> impl Iterator<Item = &Technology> {
        self.technologies.values()
    }

    /// Emission intensity of a technology; unregistered labels emit nothing.
    pub fn co2_intensity(&self, technology: &str) -> EmissionIntensity {
        self.technology(technology)
            .map(|t| t.co2_intensity)
            .unwrap_or_default()
    }

    /// Lines touching `region` with their sign, ordered by line id.
    pub fn incidence(&self, region: RegionId) -> Vec<Incidence> {
        let node = region.node();
        let outgoing = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| Incidence {
                line: e.weight().id,
                end: LineEnd::From,
            });
        let incoming = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| Incidence {
                line: e.weight().id,
                end: LineEnd::To,
            });
        let mut incidence: Vec<Incidence> = outgoing.chain(incoming).collect();
        incidence.sort_by_key(|i| i.line);
        incidence
    }

    pub fn total_demand(&self) -> Megawatts {
        self.regions().map(|r| r.demand).sum()
    }

    pub fn total_capacity(&self) -> Megawatts {
        self.generators.iter().map(|g| g.capacity).sum()
    }

    /// Installed capacity located in `region`.
    pub fn capacity_in(&self, region: RegionId) -> Megawatts {
        self.generators_in(region).map(|g| g.capacity).sum()
    }

    /// Sum of capacities of all lines touching `region`.
    pub fn interconnection_in(&self, region: RegionId) -> Megawatts {
        self.incidence(region)
            .iter()
            .map(|i| self.line(i.line).capacity)
            .sum()
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            num_regions: self.num_regions(),
            num_generators: self.generators.len(),
            num_lines: self.num_lines(),
            num_technologies: self
                .generators
                .iter()
                .map(|g| g.technology.as_str())
                .collect::<std::collections::BTreeSet<_>>()
                .len(),
            total_demand_mw: self.total_demand().value(),
            total_capacity_mw: self.total_capacity().value(),
            total_line_capacity_mw: self.lines().map(|l| l.capacity.value()).sum(),
        }
    }

    /// Validate the network for conditions that are legal but will likely make
    /// the dispatch infeasible or degenerate.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_regions == 0 {
            diag.add_error("structure", "Network has no regions");
            return;
        }

        if stats.num_generators == 0 && stats.total_demand_mw > 0.0 {
            diag.add_error("structure", "Network has demand but no generators");
        }

        if stats.total_capacity_mw < stats.total_demand_mw {
            diag.add_warning(
                "capacity",
                &format!(
                    "Total generation capacity ({:.1} MW) is less than total demand ({:.1} MW)",
                    stats.total_capacity_mw, stats.total_demand_mw
                ),
            );
        }

        for region in self.regions() {
            let local = self.capacity_in(region.id);
            let links = self.incidence(region.id);
            if links.is_empty() && stats.num_regions > 1 {
                diag.add_warning_with_entity(
                    "topology",
                    "Region is not connected to any line",
                    &region.name,
                );
            }
            let reachable = local + self.interconnection_in(region.id);
            if reachable < region.demand {
                diag.add_warning_with_entity(
                    "capacity",
                    &format!(
                        "Local capacity plus interconnection ({:.1} MW) is below demand ({:.1} MW)",
                        reachable.value(),
                        region.demand.value()
                    ),
                    &region.name,
                );
            }
        }

        for gen in &self.generators {
            if !self.technologies.is_empty() && self.technology(&gen.technology).is_none() {
                diag.add_warning_with_entity(
                    "structure",
                    &format!("Technology '{}' is not registered", gen.technology),
                    &gen.name,
                );
            }
        }
    }
}

/// Statistics about a network's size and capacity
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_regions: usize,
    pub num_generators: usize,
    pub num_lines: usize,
    pub num_technologies: usize,
    pub total_demand_mw: f64,
    pub total_capacity_mw: f64,
    pub total_line_capacity_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} regions, {} lines ({:.0} MW), {} generators ({:.0} MW), demand {:.0} MW",
            self.num_regions,
            self.num_lines,
            self.total_line_capacity_mw,
            self.num_generators,
            self.total_capacity_mw,
            self.total_demand_mw
        )
    }
}
