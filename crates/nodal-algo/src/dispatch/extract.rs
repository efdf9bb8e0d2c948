//! Map a solved LP back onto regions, generators and lines.

use super::builder::EntityIndex;
use crate::lp::{LpProblem, LpSolution};
use nodal_core::{CostRate, EmissionRate, Megawatts, Network, PricePerMwh};
use serde::Serialize;

/// Relative tolerance for deciding that a value sits on a bound.
const BINDING_TOLERANCE: f64 = 1e-6;

/// Per-generator result.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorDispatch {
    pub generator: String,
    pub region: String,
    pub technology: String,
    pub dispatch: Megawatts,
    pub capacity: Megawatts,
    pub marginal_cost: PricePerMwh,
    /// Value of one more MW of capacity (negated dual of the capacity row)
    pub scarcity_rent: PricePerMwh,
    pub at_capacity: bool,
    pub emissions: EmissionRate,
}

/// Per-line result. `p0` is the power entering the line at its from-end and
/// `p1` the power entering at its to-end; the model is lossless so
/// `p1 = −p0`.
#[derive(Debug, Clone, Serialize)]
pub struct LineFlow {
    pub line: String,
    pub from: String,
    pub to: String,
    /// Signed, positive from → to
    pub flow: Megawatts,
    pub p0: Megawatts,
    pub p1: Megawatts,
    pub capacity: Megawatts,
    /// |flow| / capacity, 0 for zero-capacity lines
    pub loading: f64,
    /// Magnitude of the flow column's reduced cost; equals the price gap
    /// between the two ends when the line is saturated
    pub congestion_price: PricePerMwh,
    pub congestion_rent: CostRate,
    pub saturated: bool,
}

/// Per-region result.
#[derive(Debug, Clone, Serialize)]
pub struct RegionResult {
    pub region: String,
    pub demand: Megawatts,
    pub generation: Megawatts,
    /// Net inflow over all lines (negative when exporting)
    pub net_import: Megawatts,
    /// Marginal cost of serving one more MW here
    pub shadow_price: PricePerMwh,
    pub emissions: EmissionRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    GeneratorCapacity,
    LineLimit,
}

/// A constraint that holds with equality at the optimum.
#[derive(Debug, Clone, Serialize)]
pub struct BindingConstraint {
    pub kind: BindingKind,
    pub entity: String,
    pub shadow_price: PricePerMwh,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveMetadata {
    pub backend: String,
    pub iterations: usize,
    pub solve_time_ms: u128,
}

/// Optimal dispatch with prices, keyed by domain names.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSolution {
    /// Total generation cost per hour
    pub objective: CostRate,
    pub regions: Vec<RegionResult>,
    pub generators: Vec<GeneratorDispatch>,
    pub lines: Vec<LineFlow>,
    pub binding_constraints: Vec<BindingConstraint>,
    pub total_emissions: EmissionRate,
    pub metadata: SolveMetadata,
}

impl DispatchSolution {
    pub fn objective(&self) -> CostRate {
        self.objective
    }

    pub fn region(&self, name: &str) -> Option<&RegionResult> {
        self.regions.iter().find(|r| r.region == name)
    }

    pub fn generator(&self, region: &str, technology: &str) -> Option<&GeneratorDispatch> {
        self.generators
            .iter()
            .find(|g| g.region == region && g.technology == technology)
    }

    pub fn line(&self, name: &str) -> Option<&LineFlow> {
        self.lines.iter().find(|l| l.line == name)
    }

    /// Dispatch of the (region, technology) generator. Undeclared pairs have
    /// no generator and return `None`.
    pub fn dispatch(&self, region: &str, technology: &str) -> Option<Megawatts> {
        self.generator(region, technology).map(|g| g.dispatch)
    }

    pub fn flow(&self, line: &str) -> Option<Megawatts> {
        self.line(line).map(|l| l.flow)
    }

    pub fn shadow_price(&self, region: &str) -> Option<PricePerMwh> {
        self.region(region).map(|r| r.shadow_price)
    }
}

fn clean(value: f64, eps: f64) -> f64 {
    if value.abs() <= eps {
        0.0
    } else {
        value
    }
}

pub(crate) fn extract(
    network: &Network,
    lp: &LpProblem,
    index: &EntityIndex,
    solution: &LpSolution,
    metadata: SolveMetadata,
    tolerance: f64,
) -> DispatchSolution {
    // Noise thresholds, one per unit scale; binding flags use a looser one.
    let primal_eps = tolerance * lp.primal_magnitude();
    let dual_eps = tolerance * lp.cost_magnitude();
    let binding_eps = BINDING_TOLERANCE * lp.primal_magnitude();
    let mut binding_constraints = Vec::new();

    let generators: Vec<GeneratorDispatch> = network
        .generators()
        .iter()
        .map(|g| {
            let cap = g.capacity.value();
            let raw = solution.x[index.dispatch_column(g.id)];
            let dispatch = clean(raw, primal_eps).clamp(0.0, cap);
            let rent = clean(-solution.row_duals[index.capacity_row(g.id)], dual_eps);
            let at_capacity = cap > 0.0 && cap - dispatch <= binding_eps;
            if at_capacity {
                binding_constraints.push(BindingConstraint {
                    kind: BindingKind::GeneratorCapacity,
                    entity: g.name.clone(),
                    shadow_price: PricePerMwh(rent),
                });
            }
            GeneratorDispatch {
                generator: g.name.clone(),
                region: network.region(g.region).name.clone(),
                technology: g.technology.clone(),
                dispatch: Megawatts(dispatch),
                capacity: g.capacity,
                marginal_cost: g.marginal_cost,
                scarcity_rent: PricePerMwh(rent),
                at_capacity,
                emissions: network.co2_intensity(&g.technology) * Megawatts(dispatch),
            }
        })
        .collect();

    let lines: Vec<LineFlow> = network
        .lines()
        .map(|l| {
            let cap = l.capacity.value();
            let column = index.flow_column(l.id);
            let flow = clean(solution.x[column], primal_eps).clamp(-cap, cap);
            let saturated = cap - flow.abs() <= binding_eps;
            let congestion_price = if saturated {
                clean(solution.reduced_costs[column].abs(), dual_eps)
            } else {
                0.0
            };
            if saturated && cap > 0.0 {
                binding_constraints.push(BindingConstraint {
                    kind: BindingKind::LineLimit,
                    entity: l.name.clone(),
                    shadow_price: PricePerMwh(congestion_price),
                });
            }
            LineFlow {
                line: l.name.clone(),
                from: network.region(l.from).name.clone(),
                to: network.region(l.to).name.clone(),
                flow: Megawatts(flow),
                p0: Megawatts(flow),
                p1: Megawatts(-flow),
                capacity: l.capacity,
                loading: if cap > 0.0 { flow.abs() / cap } else { 0.0 },
                congestion_price: PricePerMwh(congestion_price),
                congestion_rent: PricePerMwh(congestion_price) * Megawatts(flow.abs()),
                saturated,
            }
        })
        .collect();

    let regions: Vec<RegionResult> = network
        .regions()
        .map(|r| {
            let members: Vec<usize> = network.generators_in(r.id).map(|g| g.id.value()).collect();
            let generation: Megawatts = members.iter().map(|&i| generators[i].dispatch).sum();
            let emissions: EmissionRate = members.iter().map(|&i| generators[i].emissions).sum();
            let net_import: Megawatts = network
                .incidence(r.id)
                .iter()
                .map(|inc| lines[inc.line.value()].flow * -inc.sign())
                .sum();
            RegionResult {
                region: r.name.clone(),
                demand: r.demand,
                generation,
                net_import,
                shadow_price: PricePerMwh(clean(
                    solution.row_duals[index.balance_row(r.id)],
                    dual_eps,
                )),
                emissions,
            }
        })
        .collect();

    let total_emissions = regions.iter().map(|r| r.emissions).sum();

    DispatchSolution {
        objective: CostRate(solution.objective),
        regions,
        generators,
        lines,
        binding_constraints,
        total_emissions,
        metadata,
    }
}
