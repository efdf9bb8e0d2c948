//! Rendering of dispatch results and case summaries.
//!
//! Tables are tab-aligned with unit labels in the headers; JSON output
//! serializes the same records the library returns.

use std::io::Write;

use anyhow::Result;
use nodal_algo::{DispatchSolution, InfeasibilityReport, LpStatus};
use nodal_core::graph_utils::island_count;
use nodal_core::{
    CostRate, Diagnostics, EmissionIntensity, EmissionRate, Megawatts, Network, NetworkStats,
    PricePerMwh,
};
use nodal_io::{Case, CaseLayout, SolverSettings};
use serde::Serialize;
use tabwriter::TabWriter;

/// Everything `nodal solve --format json` prints.
#[derive(Debug, Serialize)]
pub struct SolveReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<&'a str>,
    pub status: LpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<&'a DispatchSolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infeasibility: Option<&'a InfeasibilityReport>,
}

/// Everything `nodal inspect --format json` prints.
#[derive(Debug, Serialize)]
pub struct InspectReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<&'a str>,
    pub layout: CaseLayout,
    pub stats: NetworkStats,
    /// Groups of regions linked by lines
    pub islands: usize,
    pub solver: &'a SolverSettings,
    pub regions: Vec<RegionSummary>,
    pub diagnostics: &'a Diagnostics,
}

#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub demand: Megawatts,
    pub capacity: Megawatts,
    pub interconnection: Megawatts,
    pub technologies: Vec<String>,
}

impl<'a> InspectReport<'a> {
    pub fn new(case: &'a Case) -> Self {
        let network = &case.network;
        let regions = network
            .regions()
            .map(|r| RegionSummary {
                region: r.name.clone(),
                demand: r.demand,
                capacity: network.capacity_in(r.id),
                interconnection: network.interconnection_in(r.id),
                technologies: network
                    .generators_in(r.id)
                    .map(|g| g.technology.clone())
                    .collect(),
            })
            .collect();
        Self {
            case: case.name.as_deref(),
            layout: case.layout,
            stats: network.stats(),
            islands: island_count(network),
            solver: &case.solver,
            regions,
            diagnostics: &case.diagnostics,
        }
    }
}

fn render(write: impl FnOnce(&mut TabWriter<Vec<u8>>) -> std::io::Result<()>) -> Result<String> {
    let mut writer = TabWriter::new(Vec::new()).padding(2);
    write(&mut writer)?;
    writer.flush()?;
    Ok(String::from_utf8(writer.into_inner()?)?)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        ""
    }
}

/// Human-readable report of an optimal dispatch.
pub fn solution_table(name: Option<&str>, solution: &DispatchSolution) -> Result<String> {
    let mut out = String::new();
    if let Some(name) = name {
        out.push_str(&format!("Case: {}\n", name));
    }
    out.push_str(&format!(
        "Status: optimal ({}, {} iterations, {} ms)\n",
        solution.metadata.backend, solution.metadata.iterations, solution.metadata.solve_time_ms
    ));
    out.push_str(&format!("Objective: {}\n", solution.objective));
    out.push_str(&format!("Total emissions: {}\n\n", solution.total_emissions));

    out.push_str(&render(|w| {
        writeln!(
            w,
            "Region\tDemand ({mw})\tGeneration ({mw})\tNet import ({mw})\tPrice ({price})\tEmissions ({em})",
            mw = Megawatts::UNIT,
            price = PricePerMwh::UNIT,
            em = EmissionRate::UNIT
        )?;
        for r in &solution.regions {
            writeln!(
                w,
                "{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
                r.region,
                r.demand.value(),
                r.generation.value(),
                r.net_import.value(),
                r.shadow_price.value(),
                r.emissions.value()
            )?;
        }
        Ok(())
    })?);
    out.push('\n');

    out.push_str(&render(|w| {
        writeln!(
            w,
            "Generator\tDispatch ({mw})\tCapacity ({mw})\tMarginal cost ({price})\tScarcity rent ({price})\tAt capacity",
            mw = Megawatts::UNIT,
            price = PricePerMwh::UNIT
        )?;
        for g in &solution.generators {
            writeln!(
                w,
                "{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}",
                g.generator,
                g.dispatch.value(),
                g.capacity.value(),
                g.marginal_cost.value(),
                g.scarcity_rent.value(),
                yes_no(g.at_capacity)
            )?;
        }
        Ok(())
    })?);

    if !solution.lines.is_empty() {
        out.push('\n');
        out.push_str(&render(|w| {
            writeln!(
                w,
                "Line\tFrom\tTo\tFlow ({mw})\tCapacity ({mw})\tLoading (%)\tCongestion price ({price})\tCongestion rent ({rent})",
                mw = Megawatts::UNIT,
                price = PricePerMwh::UNIT,
                rent = CostRate::UNIT
            )?;
            for l in &solution.lines {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{:.2}\t{:.2}\t{:.1}\t{:.2}\t{:.2}",
                    l.line,
                    l.from,
                    l.to,
                    l.flow.value(),
                    l.capacity.value(),
                    l.loading * 100.0,
                    l.congestion_price.value(),
                    l.congestion_rent.value()
                )?;
            }
            Ok(())
        })?);
    }

    if !solution.binding_constraints.is_empty() {
        out.push_str("\nBinding constraints:\n");
        for b in &solution.binding_constraints {
            let kind = match b.kind {
                nodal_algo::BindingKind::GeneratorCapacity => "generator capacity",
                nodal_algo::BindingKind::LineLimit => "line limit",
            };
            out.push_str(&format!("  {} ({}): {}\n", b.entity, kind, b.shadow_price));
        }
    }
    Ok(out)
}

/// Explanation of a non-optimal outcome, for stderr.
pub fn failure_text(status: LpStatus, message: &str, report: Option<&InfeasibilityReport>) -> String {
    let mut out = format!("Status: {}\n{}\n", status, message);
    if let Some(report) = report {
        for issue in report.diagnostics.errors() {
            out.push_str(&format!("  {}\n", issue));
        }
        if !report.conflicting.is_empty() {
            out.push_str(&format!("Conflicting: {}\n", report.conflicting.join(", ")));
        }
    }
    out
}

/// Human-readable summary of a case.
pub fn inspect_table(report: &InspectReport<'_>, network: &Network) -> Result<String> {
    let mut out = String::new();
    if let Some(name) = report.case {
        out.push_str(&format!("Case: {} ({} layout)\n", name, report.layout));
    } else {
        out.push_str(&format!("Case ({} layout)\n", report.layout));
    }
    out.push_str(&format!("{}, {} island(s)\n", report.stats, report.islands));
    out.push_str(&format!(
        "Solver: {} (max {} iterations, tolerance {:e})\n\n",
        report.solver.backend, report.solver.max_iterations, report.solver.tolerance
    ));

    out.push_str(&render(|w| {
        writeln!(
            w,
            "Region\tDemand ({mw})\tCapacity ({mw})\tInterconnection ({mw})\tTechnologies",
            mw = Megawatts::UNIT
        )?;
        for r in &report.regions {
            writeln!(
                w,
                "{}\t{:.2}\t{:.2}\t{:.2}\t{}",
                r.region,
                r.demand.value(),
                r.capacity.value(),
                r.interconnection.value(),
                r.technologies.join(", ")
            )?;
        }
        Ok(())
    })?);

    let technologies: Vec<_> = network.technologies().collect();
    if !technologies.is_empty() {
        out.push('\n');
        out.push_str(&render(|w| {
            writeln!(w, "Technology\tCO2 intensity ({})", EmissionIntensity::UNIT)?;
            for t in &technologies {
                writeln!(w, "{}\t{:.3}", t.label, t.co2_intensity.value())?;
            }
            Ok(())
        })?);
    }

    if !report.diagnostics.is_empty() {
        out.push('\n');
        out.push_str(&report.diagnostics.to_string());
    }
    Ok(out)
}
