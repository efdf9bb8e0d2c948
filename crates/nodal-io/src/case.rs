//! Case file schema and its translation into a [`Network`].
//!
//! Two layouts are accepted, in TOML or JSON. The *structured* layout lists
//! entities one record at a time:
//!
//! ```toml
//! [[regions]]
//! name = "Brazil"
//! demand = 60000
//!
//! [[generators]]
//! region = "Brazil"
//! technology = "Coal"
//! capacity = 200000
//! marginal_cost = 70
//!
//! [[lines]]
//! name = "Brazil-Bolivia"
//! from = "Brazil"
//! to = "Bolivia"
//! capacity = 600
//! ```
//!
//! The *tabular* layout keys everything by region and technology:
//!
//! ```toml
//! [loads]
//! Brazil = 60000
//!
//! [capacities.Brazil]
//! Coal = 200000
//!
//! [marginal_costs.Brazil]
//! Coal = 70
//!
//! [lines.Brazil-Bolivia]
//! from = "Brazil"
//! to = "Bolivia"
//! capacity = 600
//! ```
//!
//! `[[technologies]]` (name, `co2_intensity` in t/MWh) and `[solver]` are
//! shared by both layouts. Mixing the two layouts in one file is an error.

use std::collections::BTreeMap;

use nodal_core::{Coordinates, Diagnostics, Network, NetworkError};
use serde::{Deserialize, Serialize};

use crate::error::CaseError;
use crate::settings::SolverSettings;

/// Raw case file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<RegionEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generators: Vec<GeneratorEntry>,
    #[serde(default, skip_serializing_if = "LineSection::is_empty")]
    pub lines: LineSection,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub loads: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capacities: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub marginal_costs: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub coordinates: BTreeMap<String, CoordinateEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<TechnologyEntry>,
    #[serde(default)]
    pub solver: SolverSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionEntry {
    pub name: String,
    pub demand: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorEntry {
    pub region: String,
    pub technology: String,
    pub capacity: f64,
    /// Required; kept optional here so a missing value is reported as
    /// [`NetworkError::MissingMarginalCost`] rather than a parse error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marginal_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineEntry {
    pub name: String,
    pub from: String,
    pub to: String,
    pub capacity: f64,
}

/// A line in the tabular layout; the table key is its name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TabularLine {
    pub from: String,
    pub to: String,
    pub capacity: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinateEntry {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TechnologyEntry {
    pub name: String,
    #[serde(default)]
    pub co2_intensity: f64,
}

/// `lines` is an array of records (structured) or a table keyed by name
/// (tabular).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineSection {
    List(Vec<LineEntry>),
    Table(BTreeMap<String, TabularLine>),
}

impl Default for LineSection {
    fn default() -> Self {
        LineSection::List(Vec::new())
    }
}

impl LineSection {
    pub fn is_empty(&self) -> bool {
        match self {
            LineSection::List(lines) => lines.is_empty(),
            LineSection::Table(lines) => lines.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseLayout {
    Structured,
    Tabular,
}

impl std::fmt::Display for CaseLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseLayout::Structured => write!(f, "structured"),
            CaseLayout::Tabular => write!(f, "tabular"),
        }
    }
}

/// A loaded case: the validated network plus its solver settings.
#[derive(Debug)]
pub struct Case {
    pub name: Option<String>,
    pub layout: CaseLayout,
    pub network: Network,
    pub solver: SolverSettings,
    /// Loader warnings followed by [`Network::validate_into`] findings
    pub diagnostics: Diagnostics,
}

impl CaseFile {
    /// Which layout the file uses, from the keys it sets.
    pub fn layout(&self) -> Result<CaseLayout, CaseError> {
        let mut structured = Vec::new();
        if !self.regions.is_empty() {
            structured.push("regions");
        }
        if !self.generators.is_empty() {
            structured.push("generators");
        }
        if matches!(&self.lines, LineSection::List(l) if !l.is_empty()) {
            structured.push("lines");
        }

        let mut tabular = Vec::new();
        if !self.loads.is_empty() {
            tabular.push("loads");
        }
        if !self.capacities.is_empty() {
            tabular.push("capacities");
        }
        if !self.marginal_costs.is_empty() {
            tabular.push("marginal_costs");
        }
        if !self.coordinates.is_empty() {
            tabular.push("coordinates");
        }
        if matches!(&self.lines, LineSection::Table(l) if !l.is_empty()) {
            tabular.push("lines");
        }

        match (structured.is_empty(), tabular.is_empty()) {
            (false, false) => Err(CaseError::MixedLayout {
                structured: structured.join(", "),
                tabular: tabular.join(", "),
            }),
            (true, true) => Err(CaseError::Empty),
            (false, true) => Ok(CaseLayout::Structured),
            (true, false) => Ok(CaseLayout::Tabular),
        }
    }

    /// Declare every entity on a fresh network. Stops at the first
    /// declaration error.
    pub fn into_case(self) -> Result<Case, CaseError> {
        let layout = self.layout()?;
        self.solver.validate()?;

        let mut network = Network::new();
        let mut diagnostics = Diagnostics::new();

        for tech in &self.technologies {
            network.add_technology(tech.name.as_str(), tech.co2_intensity)?;
        }

        match layout {
            CaseLayout::Structured => self.declare_structured(&mut network, &mut diagnostics)?,
            CaseLayout::Tabular => self.declare_tabular(&mut network, &mut diagnostics)?,
        }

        if network.num_regions() == 0 {
            return Err(CaseError::Empty);
        }
        network.validate_into(&mut diagnostics);

        Ok(Case {
            name: self.name,
            layout,
            network,
            solver: self.solver,
            diagnostics,
        })
    }

    fn declare_structured(
        &self,
        network: &mut Network,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), NetworkError> {
        for region in &self.regions {
            match (region.x, region.y) {
                (Some(x), Some(y)) => {
                    let at = Coordinates { x, y };
                    network.add_region_at(region.name.as_str(), region.demand, at)?;
                }
                (None, None) => {
                    network.add_region(region.name.as_str(), region.demand)?;
                }
                _ => {
                    diagnostics.add_warning_with_entity(
                        "case",
                        "only one coordinate given; position ignored",
                        &region.name,
                    );
                    network.add_region(region.name.as_str(), region.demand)?;
                }
            }
        }

        for generator in &self.generators {
            let cost = generator
                .marginal_cost
                .ok_or_else(|| NetworkError::MissingMarginalCost {
                    region: generator.region.clone(),
                    technology: generator.technology.clone(),
                })?;
            network.add_generator(
                &generator.region,
                generator.technology.as_str(),
                generator.capacity,
                cost,
            )?;
        }

        self.declare_lines(network)
    }

    fn declare_tabular(
        &self,
        network: &mut Network,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), NetworkError> {
        for (region, &demand) in &self.loads {
            match self.coordinates.get(region) {
                Some(c) => {
                    let at = Coordinates { x: c.x, y: c.y };
                    network.add_region_at(region.as_str(), demand, at)?;
                }
                None => {
                    network.add_region(region.as_str(), demand)?;
                }
            }
        }
        for region in self.coordinates.keys() {
            if !self.loads.contains_key(region) {
                diagnostics.add_warning_with_entity(
                    "case",
                    "coordinates given for a region with no load entry; ignored",
                    region,
                );
            }
        }

        for (region, techs) in &self.capacities {
            for (tech, &capacity) in techs {
                let cost = self
                    .marginal_costs
                    .get(region)
                    .and_then(|costs| costs.get(tech))
                    .copied()
                    .ok_or_else(|| NetworkError::MissingMarginalCost {
                        region: region.clone(),
                        technology: tech.clone(),
                    })?;
                network.add_generator(region, tech.as_str(), capacity, cost)?;
            }
        }
        for (region, techs) in &self.marginal_costs {
            for tech in techs.keys() {
                let has_capacity = self
                    .capacities
                    .get(region)
                    .is_some_and(|caps| caps.contains_key(tech));
                if !has_capacity {
                    diagnostics.add_warning_with_entity(
                        "case",
                        &format!("marginal cost for '{}' has no capacity entry; ignored", tech),
                        region,
                    );
                }
            }
        }

        self.declare_lines(network)
    }

    fn declare_lines(&self, network: &mut Network) -> Result<(), NetworkError> {
        match &self.lines {
            LineSection::List(lines) => {
                for line in lines {
                    network.add_line(line.name.as_str(), &line.from, &line.to, line.capacity)?;
                }
            }
            LineSection::Table(lines) => {
                for (name, line) in lines {
                    network.add_line(name.as_str(), &line.from, &line.to, line.capacity)?;
                }
            }
        }
        Ok(())
    }
}
