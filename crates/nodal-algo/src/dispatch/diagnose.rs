//! Explain an infeasible dispatch in terms of the network.
//!
//! The LP only says "no point satisfies every row". This module looks for the
//! usual culprits and names the rows involved:
//!
//! - the whole system has less capacity than demand;
//! - an island (regions linked by lines) has less capacity than its demand;
//! - a single region cannot cover its demand from local capacity plus the
//!   full capacity of every line touching it.

use super::builder::EntityIndex;
use crate::lp::LpProblem;
use nodal_core::{find_islands, Diagnostics, Megawatts, Network, RegionId};
use serde::Serialize;
use std::collections::HashSet;

/// Why a dispatch could not be found.
#[derive(Debug, Clone, Serialize)]
pub struct InfeasibilityReport {
    pub diagnostics: Diagnostics,
    /// Total demand minus total capacity, when positive
    pub system_deficit: Megawatts,
    /// LP rows and columns that cannot be satisfied together
    pub conflicting: Vec<String>,
}

impl InfeasibilityReport {
    /// First error message, or a generic one.
    pub fn summary(&self) -> String {
        self.diagnostics
            .errors()
            .next()
            .map(|issue| match &issue.entity {
                Some(entity) => format!("{} ({})", issue.message, entity),
                None => issue.message.clone(),
            })
            .unwrap_or_else(|| "no feasible dispatch exists".to_string())
    }
}

pub fn diagnose_infeasibility(
    network: &Network,
    lp: &LpProblem,
    index: &EntityIndex,
) -> InfeasibilityReport {
    let mut diagnostics = Diagnostics::new();
    let mut conflicting = Vec::new();

    let total_demand = network.total_demand();
    let total_capacity = network.total_capacity();
    let system_deficit = Megawatts((total_demand - total_capacity).value().max(0.0));
    if system_deficit.value() > 0.0 {
        diagnostics.add_error(
            "infeasibility",
            &format!(
                "Total demand {} exceeds total capacity {} by {}",
                total_demand, total_capacity, system_deficit
            ),
        );
        for region in network.regions() {
            push_supply_rows(network, lp, index, region.id, &mut conflicting);
        }
    }

    let islands = find_islands(network);
    if islands.len() > 1 {
        for island in islands.iter().filter(|i| i.margin().value() < 0.0) {
            let names: Vec<&str> = island
                .regions
                .iter()
                .map(|r| network.region(*r).name.as_str())
                .collect();
            diagnostics.add_error_with_entity(
                "infeasibility",
                &format!(
                    "Island demand {} exceeds its capacity {} by {}",
                    island.demand,
                    island.capacity,
                    -island.margin()
                ),
                &names.join(", "),
            );
            for region in &island.regions {
                push_supply_rows(network, lp, index, *region, &mut conflicting);
            }
        }
    }

    for region in network.regions() {
        let local = network.capacity_in(region.id);
        let imports = network.interconnection_in(region.id);
        let shortfall = region.demand - local - imports;
        if shortfall.value() <= 0.0 {
            continue;
        }
        diagnostics.add_error_with_entity(
            "infeasibility",
            &format!(
                "Demand {} exceeds local capacity {} plus import capability {} by {}",
                region.demand, local, imports, shortfall
            ),
            &region.name,
        );
        push_supply_rows(network, lp, index, region.id, &mut conflicting);
        for incidence in network.incidence(region.id) {
            conflicting.push(lp.column(index.flow_column(incidence.line)).name.clone());
        }
    }

    if !diagnostics.has_errors() {
        diagnostics.add_error(
            "infeasibility",
            "No single region, island or system-wide deficit explains the infeasibility; \
             the binding set spans several regions",
        );
    }

    let mut seen = HashSet::new();
    conflicting.retain(|name| seen.insert(name.clone()));

    InfeasibilityReport {
        diagnostics,
        system_deficit,
        conflicting,
    }
}

/// Balance row of `region` and the capacity rows of its generators.
fn push_supply_rows(
    network: &Network,
    lp: &LpProblem,
    index: &EntityIndex,
    region: RegionId,
    out: &mut Vec<String>,
) {
    out.push(lp.row(index.balance_row(region)).name.clone());
    for generator in network.generators_in(region) {
        out.push(lp.row(index.capacity_row(generator.id)).name.clone());
    }
}
