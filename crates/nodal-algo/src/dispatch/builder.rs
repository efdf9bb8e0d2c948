//! Translate a [`Network`] into the dispatch LP.
//!
//! ```text
//! minimize    Σ_g cost_g · g
//! subject to  Σ_{g ∈ r} g − Σ_{l ∋ r} sign(r, l) · f_l = demand_r     ∀ regions r
//!             g ≤ capacity_g                                        ∀ generators g
//!             g ≥ 0,   −capacity_l ≤ f_l ≤ capacity_l               (column bounds)
//! ```
//!
//! `sign(r, l)` is +1 at the line's from-region and −1 at its to-region, so a
//! positive flow leaves the from-region and arrives at the to-region.
//!
//! Columns are laid out as all dispatch columns (generator order) followed by
//! all flow columns (line order). Rows are all balance rows (region order)
//! followed by all capacity rows (generator order). The same network always
//! produces the same LP.

use crate::lp::{ColumnTag, LpProblem, RowSense, RowTag};
use nodal_core::{GeneratorId, LineId, Network, RegionId};
use tracing::debug;

/// Bidirectional map between network entities and LP positions.
#[derive(Debug, Clone)]
pub struct EntityIndex {
    dispatch_columns: Vec<usize>,
    flow_columns: Vec<usize>,
    balance_rows: Vec<usize>,
    capacity_rows: Vec<usize>,
    column_tags: Vec<ColumnTag>,
    row_tags: Vec<RowTag>,
}

impl EntityIndex {
    pub fn dispatch_column(&self, generator: GeneratorId) -> usize {
        self.dispatch_columns[generator.value()]
    }

    pub fn flow_column(&self, line: LineId) -> usize {
        self.flow_columns[line.value()]
    }

    pub fn balance_row(&self, region: RegionId) -> usize {
        self.balance_rows[region.value()]
    }

    pub fn capacity_row(&self, generator: GeneratorId) -> usize {
        self.capacity_rows[generator.value()]
    }

    /// Entity a column was built for.
    pub fn column_entity(&self, column: usize) -> Option<ColumnTag> {
        self.column_tags.get(column).copied()
    }

    /// Entity a row was built for.
    pub fn row_entity(&self, row: usize) -> Option<RowTag> {
        self.row_tags.get(row).copied()
    }
}

/// Build the dispatch LP for `network`.
pub fn build_lp(network: &Network) -> (LpProblem, EntityIndex) {
    let mut lp = LpProblem::new();

    let dispatch_columns: Vec<usize> = network
        .generators()
        .iter()
        .map(|g| {
            lp.add_column(
                format!("g({})", g.name),
                0.0,
                f64::INFINITY,
                g.marginal_cost.value(),
                ColumnTag::Dispatch(g.id),
            )
        })
        .collect();

    let flow_columns: Vec<usize> = network
        .lines()
        .map(|l| {
            let cap = l.capacity.value();
            lp.add_column(
                format!("f({})", l.name),
                -cap,
                cap,
                0.0,
                ColumnTag::Flow(l.id),
            )
        })
        .collect();

    let balance_rows: Vec<usize> = network
        .regions()
        .map(|r| {
            let mut coefficients: Vec<(usize, f64)> = network
                .generators_in(r.id)
                .map(|g| (dispatch_columns[g.id.value()], 1.0))
                .collect();
            coefficients.extend(
                network
                    .incidence(r.id)
                    .iter()
                    .map(|inc| (flow_columns[inc.line.value()], -inc.sign())),
            );
            lp.add_row(
                format!("balance({})", r.name),
                coefficients,
                RowSense::Equal,
                r.demand.value(),
                RowTag::Balance(r.id),
            )
        })
        .collect();

    let capacity_rows: Vec<usize> = network
        .generators()
        .iter()
        .map(|g| {
            lp.add_row(
                format!("cap({})", g.name),
                vec![(dispatch_columns[g.id.value()], 1.0)],
                RowSense::LessEqual,
                g.capacity.value(),
                RowTag::GeneratorCapacity(g.id),
            )
        })
        .collect();

    debug!(
        columns = lp.num_columns(),
        rows = lp.num_rows(),
        "built dispatch LP"
    );

    let column_tags = lp.columns().iter().map(|c| c.tag).collect();
    let row_tags = lp.rows().iter().map(|r| r.tag).collect();
    let index = EntityIndex {
        dispatch_columns,
        flow_columns,
        balance_rows,
        capacity_rows,
        column_tags,
        row_tags,
    };
    (lp, index)
}
