//! End-to-end dispatch tests: build → solve → extract on small networks.

use nodal_algo::{
    BackendKind, BindingKind, DispatchError, DispatchProblem, DispatchSolution, DispatchSolver,
    LpBackend, LpStatus, SimplexBackend, SolverConfig,
};
use nodal_core::Network;

const TOL: f64 = 1e-6;

/// Every backend compiled into this build.
fn backends() -> Vec<BackendKind> {
    [BackendKind::Simplex, BackendKind::Clarabel]
        .into_iter()
        .filter(|b| b.is_available())
        .collect()
}

/// A (demand 100, cap 150 @ 10), B (demand 50, cap 30 @ 5), line A–B cap 40.
fn two_region(line_capacity: f64, hydro_cost: f64) -> Network {
    let mut network = Network::new();
    network.add_region("A", 100.0).unwrap();
    network.add_region("B", 50.0).unwrap();
    network.add_generator("A", "Coal", 150.0, 10.0).unwrap();
    network.add_generator("B", "Hydro", 30.0, hydro_cost).unwrap();
    network.add_line("A-B", "A", "B", line_capacity).unwrap();
    network
}

/// A exports cheap power to an expensive B over a tight line.
fn congested() -> Network {
    let mut network = Network::new();
    network.add_region("A", 100.0).unwrap();
    network.add_region("B", 50.0).unwrap();
    network.add_generator("A", "Coal", 200.0, 10.0).unwrap();
    network.add_generator("B", "Gas", 100.0, 50.0).unwrap();
    network.add_line("A-B", "A", "B", 20.0).unwrap();
    network
}

/// The Brazil / Bolivia / Paraguay case.
fn south_america() -> Network {
    let mut network = Network::new();
    network.add_region("Brazil", 65000.0).unwrap();
    network.add_region("Bolivia", 1100.0).unwrap();
    network.add_region("Paraguay", 900.0).unwrap();

    network.add_generator("Brazil", "Coal", 52000.0, 35.0).unwrap();
    network.add_generator("Brazil", "Wind and Solar", 8000.0, 0.0).unwrap();
    network.add_generator("Brazil", "Gas", 12000.0, 70.0).unwrap();
    network.add_generator("Bolivia", "Hydro", 2000.0, 4.0).unwrap();
    network.add_generator("Bolivia", "Gas", 1000.0, 65.0).unwrap();
    network.add_generator("Paraguay", "Hydro", 1500.0, 6.0).unwrap();

    network.add_line("Brazil-Bolivia", "Brazil", "Bolivia", 600.0).unwrap();
    network.add_line("Bolivia-Paraguay", "Bolivia", "Paraguay", 50.0).unwrap();
    network.add_line("Brazil-Paraguay", "Brazil", "Paraguay", 200.0).unwrap();

    network.add_technology("Coal", 0.34).unwrap();
    network.add_technology("Gas", 0.2).unwrap();
    network.add_technology("Hydro", 0.0).unwrap();
    network
}

fn solve(network: &Network, backend: BackendKind) -> DispatchSolution {
    DispatchSolver::new()
        .with_backend(backend)
        .solve(network)
        .unwrap_or_else(|e| panic!("{} failed: {}", backend, e))
}

fn assert_feasible(network: &Network, solution: &DispatchSolution, tol: f64) {
    for region in &solution.regions {
        let residual = region.generation.value() + region.net_import.value() - region.demand.value();
        assert!(
            residual.abs() < tol,
            "balance violated in {}: residual {}",
            region.region,
            residual
        );
    }
    for g in &solution.generators {
        assert!(g.dispatch.value() >= -tol, "{} dispatch negative", g.generator);
        assert!(
            g.dispatch.value() <= g.capacity.value() + tol,
            "{} dispatch {} above capacity {}",
            g.generator,
            g.dispatch,
            g.capacity
        );
    }
    for l in &solution.lines {
        assert!(
            l.flow.value().abs() <= l.capacity.value() + tol,
            "{} flow {} beyond capacity {}",
            l.line,
            l.flow,
            l.capacity
        );
    }
    assert_eq!(solution.regions.len(), network.num_regions());
}

#[test]
fn test_two_region_example() {
    let network = two_region(40.0, 5.0);
    for backend in backends() {
        let solution = solve(&network, backend);
        let tol = if backend == BackendKind::Simplex { TOL } else { 1e-4 };

        let g_a = solution.dispatch("A", "Coal").unwrap().value();
        let g_b = solution.dispatch("B", "Hydro").unwrap().value();
        let flow = solution.flow("A-B").unwrap().value();
        assert!((g_b - 30.0).abs() < tol, "{}: g_B = {}", backend, g_b);
        assert!((g_a - 120.0).abs() < tol, "{}: g_A = {}", backend, g_a);
        assert!((flow - 20.0).abs() < tol, "{}: flow = {}", backend, flow);
        assert!(
            (solution.objective().value() - 1350.0).abs() < tol * 100.0,
            "{}: objective = {}",
            backend,
            solution.objective()
        );

        let price_a = solution.shadow_price("A").unwrap().value();
        let price_b = solution.shadow_price("B").unwrap().value();
        assert!((price_a - 10.0).abs() < tol, "{}: price A = {}", backend, price_a);
        assert!((price_b - 10.0).abs() < tol, "{}: price B = {}", backend, price_b);

        let b = solution.region("B").unwrap();
        assert!((b.net_import.value() - 20.0).abs() < tol);
        assert_feasible(&network, &solution, tol);
    }
}

#[test]
fn test_line_ends_and_loading() {
    let network = two_region(40.0, 5.0);
    let solution = solve(&network, BackendKind::Simplex);
    let line = solution.line("A-B").unwrap();

    assert_eq!(line.from, "A");
    assert_eq!(line.to, "B");
    assert_eq!(line.p0.value(), -line.p1.value());
    assert!((line.loading - 0.5).abs() < TOL);
    assert!(!line.saturated);
    assert_eq!(line.congestion_price.value(), 0.0);
}

#[test]
fn test_undeclared_pair_has_no_dispatch() {
    let network = two_region(40.0, 5.0);
    let solution = solve(&network, BackendKind::Simplex);
    assert!(solution.dispatch("A", "Hydro").is_none());
    assert!(solution.dispatch("Nowhere", "Coal").is_none());
}

#[test]
fn test_capacity_rent_on_binding_generator() {
    let network = two_region(40.0, 5.0);
    let solution = solve(&network, BackendKind::Simplex);
    let hydro = solution.generator("B", "Hydro").unwrap();

    assert!(hydro.at_capacity);
    // Price in B is 10, hydro costs 5: one more MW of hydro saves 5.
    assert!((hydro.scarcity_rent.value() - 5.0).abs() < TOL);
    assert!(solution
        .binding_constraints
        .iter()
        .any(|c| c.kind == BindingKind::GeneratorCapacity && c.entity == "B Hydro"));
}

#[test]
fn test_saturated_line_price_gap() {
    let network = congested();
    for backend in backends() {
        let solution = solve(&network, backend);
        let tol = if backend == BackendKind::Simplex { TOL } else { 1e-3 };

        let line = solution.line("A-B").unwrap();
        assert!(line.saturated, "{}: line should be saturated", backend);
        assert!((line.flow.value() - 20.0).abs() < tol);

        let exporter = solution.shadow_price("A").unwrap().value();
        let importer = solution.shadow_price("B").unwrap().value();
        assert!((exporter - 10.0).abs() < tol, "{}: price A = {}", backend, exporter);
        assert!((importer - 50.0).abs() < tol, "{}: price B = {}", backend, importer);
        assert!(importer >= exporter);
        assert!(
            ((importer - exporter) - line.congestion_price.value()).abs() < tol,
            "{}: gap {} vs congestion price {}",
            backend,
            importer - exporter,
            line.congestion_price
        );
        assert!((line.congestion_rent.value() - 800.0).abs() < tol * 100.0);
    }
}

#[test]
fn test_reversed_line_orientation_gives_negative_flow() {
    let mut network = Network::new();
    network.add_region("A", 100.0).unwrap();
    network.add_region("B", 50.0).unwrap();
    network.add_generator("A", "Coal", 200.0, 10.0).unwrap();
    network.add_generator("B", "Gas", 100.0, 50.0).unwrap();
    network.add_line("B-A", "B", "A", 20.0).unwrap();

    let solution = solve(&network, BackendKind::Simplex);
    assert!((solution.flow("B-A").unwrap().value() + 20.0).abs() < TOL);
    assert!((solution.shadow_price("B").unwrap().value() - 50.0).abs() < TOL);
}

#[test]
fn test_cost_monotone_in_marginal_cost() {
    let mut previous = f64::NEG_INFINITY;
    for cost in [1.0, 5.0, 9.0, 12.0, 20.0] {
        let solution = solve(&two_region(40.0, cost), BackendKind::Simplex);
        let objective = solution.objective().value();
        assert!(
            objective >= previous - TOL,
            "objective fell from {} to {} at cost {}",
            previous,
            objective,
            cost
        );
        previous = objective;
    }
}

#[test]
fn test_cost_monotone_in_line_capacity() {
    let mut previous = f64::INFINITY;
    for capacity in [0.0, 5.0, 10.0, 20.0, 40.0] {
        let network = {
            let mut network = congested();
            network.add_line("A-B 2", "A", "B", capacity).unwrap();
            network
        };
        let objective = solve(&network, BackendKind::Simplex).objective().value();
        assert!(
            objective <= previous + TOL,
            "objective rose from {} to {} at capacity {}",
            previous,
            objective,
            capacity
        );
        previous = objective;
    }
}

#[test]
fn test_infeasible_when_import_capability_too_small() {
    let mut network = Network::new();
    network.add_region("A", 100.0).unwrap();
    network.add_region("B", 50.0).unwrap();
    network.add_generator("A", "Coal", 500.0, 10.0).unwrap();
    network.add_generator("B", "Hydro", 5.0, 5.0).unwrap();
    network.add_line("A-B", "A", "B", 10.0).unwrap();

    for backend in backends() {
        let result = DispatchSolver::new().with_backend(backend).solve(&network);
        match result {
            Err(DispatchError::Infeasible(report)) => {
                assert!(report.diagnostics.has_errors());
                let issue = report.diagnostics.errors().next().unwrap();
                assert_eq!(issue.entity.as_deref(), Some("B"));
            }
            Err(other) => panic!("{}: expected infeasible, got {}", backend, other),
            Ok(solution) => panic!(
                "{}: infeasible network solved with objective {}",
                backend, solution.objective
            ),
        }
    }
}

#[test]
fn test_infeasible_when_system_short() {
    let mut network = two_region(40.0, 5.0);
    network.add_region("C", 1000.0).unwrap();
    network.add_line("B-C", "B", "C", 1000.0).unwrap();

    let err = DispatchSolver::new().solve(&network).unwrap_err();
    assert_eq!(err.status(), Some(LpStatus::Infeasible));
    let DispatchError::Infeasible(report) = err else {
        unreachable!()
    };
    assert!((report.system_deficit.value() - 970.0).abs() < TOL);
}

#[test]
fn test_iteration_limit() {
    let network = south_america();
    let err = DispatchSolver::new()
        .with_backend(BackendKind::Simplex)
        .with_max_iterations(1)
        .solve(&network)
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::IterationLimitExceeded { limit: 1, .. }
    ));
}

#[test]
fn test_explicit_problem_lifecycle() {
    let network = two_region(40.0, 5.0);
    let mut problem = DispatchProblem::new(&network);
    assert!(matches!(problem.solution(), Err(DispatchError::NotSolved)));

    let backend: &dyn LpBackend = &SimplexBackend;
    let status = problem.solve(backend, &SolverConfig::default()).unwrap();
    assert_eq!(status, LpStatus::Optimal);
    assert_eq!(problem.status(), Some(LpStatus::Optimal));

    let structure = problem.lp().structure();
    assert_eq!(structure.generators.len(), network.generators().len());
    assert_eq!(structure.lines.len(), network.num_lines());
    assert_eq!(structure.regions.len(), network.num_regions());
    assert_eq!(structure.duplicate_tags, 0);

    let solution = problem.solution().unwrap();
    assert!(solution.metadata.iterations > 0);
}

#[test]
fn test_south_america_case() {
    let network = south_america();
    let solution = solve(&network, BackendKind::Simplex);
    assert_feasible(&network, &solution, 1e-6);

    let expect = |region: &str, tech: &str, mw: f64| {
        let got = solution.dispatch(region, tech).unwrap().value();
        assert!((got - mw).abs() < 1e-6, "{} {}: {} != {}", region, tech, got, mw);
    };
    expect("Brazil", "Wind and Solar", 8000.0);
    expect("Brazil", "Coal", 52000.0);
    expect("Brazil", "Gas", 4200.0);
    expect("Bolivia", "Hydro", 1750.0);
    expect("Bolivia", "Gas", 0.0);
    expect("Paraguay", "Hydro", 1050.0);

    assert!((solution.flow("Brazil-Bolivia").unwrap().value() + 600.0).abs() < 1e-6);
    assert!((solution.flow("Bolivia-Paraguay").unwrap().value() - 50.0).abs() < 1e-6);
    assert!((solution.flow("Brazil-Paraguay").unwrap().value() + 200.0).abs() < 1e-6);

    assert!((solution.objective().value() - 2_127_300.0).abs() < 1e-3);
    assert!((solution.shadow_price("Brazil").unwrap().value() - 70.0).abs() < 1e-6);
    assert!((solution.shadow_price("Bolivia").unwrap().value() - 4.0).abs() < 1e-6);
    assert!((solution.shadow_price("Paraguay").unwrap().value() - 6.0).abs() < 1e-6);

    // Coal 52000 × 0.34 + gas 4200 × 0.2
    assert!((solution.total_emissions.value() - 18_520.0).abs() < 1e-3);
    let bolivia = solution.region("Bolivia").unwrap();
    assert_eq!(bolivia.emissions.value(), 0.0);

    // All three lines sit on a limit.
    let saturated: Vec<&str> = solution
        .binding_constraints
        .iter()
        .filter(|c| c.kind == BindingKind::LineLimit)
        .map(|c| c.entity.as_str())
        .collect();
    assert_eq!(saturated.len(), 3, "{:?}", saturated);
}

#[test]
fn test_backends_agree() {
    let network = south_america();
    let reference = solve(&network, BackendKind::Simplex);
    for backend in backends() {
        let other = solve(&network, backend);
        let relative = (other.objective().value() - reference.objective().value()).abs()
            / reference.objective().value();
        assert!(relative < 1e-6, "{}: objective differs by {}", backend, relative);
        for region in &reference.regions {
            let price = other.shadow_price(&region.region).unwrap().value();
            assert!(
                (price - region.shadow_price.value()).abs() < 1e-3,
                "{}: price in {} is {} vs {}",
                backend,
                region.region,
                price,
                region.shadow_price
            );
        }
    }
}

#[test]
fn test_solution_serializes() {
    let solution = solve(&two_region(40.0, 5.0), BackendKind::Simplex);
    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["metadata"]["backend"], "simplex");
    assert_eq!(json["regions"][0]["region"], "A");
    assert!(json["objective"].as_f64().unwrap() > 1349.0);
}

#[test]
fn lp_export_to_file_lists_every_row_and_column() {
    let network = south_america();
    let (lp, _) = nodal_algo::build_lp(&network);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    nodal_algo::write_lp(&lp, file.as_file_mut()).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();

    for row in lp.rows() {
        let name = nodal_algo::lp::sanitize_name(&row.name);
        assert!(text.contains(&format!(" {}:", name)), "row {} missing", name);
    }
    for column in lp.columns() {
        let name = nodal_algo::lp::sanitize_name(&column.name);
        assert!(text.contains(&name), "column {} missing", name);
    }
    assert!(text.contains("balance(Brazil): 1 g(Brazil_Coal)"));
}

#[test]
fn test_large_demand_keeps_small_price() {
    let mut network = Network::new();
    network.add_region("A", 1e6).unwrap();
    network.add_generator("A", "Solar", 2e6, 0.5).unwrap();

    let solution = solve(&network, BackendKind::Simplex);
    let price = solution.shadow_price("A").unwrap().value();
    assert!((price - 0.5).abs() < TOL, "price A = {}", price);
    assert!((solution.objective().value() - 500_000.0).abs() < 1e-3);
    assert!((solution.dispatch("A", "Solar").unwrap().value() - 1e6).abs() < 1e-3);
}

#[test]
fn test_tiny_demand_beside_large_region_balances() {
    let mut network = Network::new();
    network.add_region("A", 10_000.0).unwrap();
    network.add_region("B", 0.005).unwrap();
    network.add_generator("A", "Coal", 20_000.0, 10.0).unwrap();
    network.add_generator("B", "Hydro", 1.0, 5.0).unwrap();

    let solution = solve(&network, BackendKind::Simplex);
    let hydro = solution.dispatch("B", "Hydro").unwrap().value();
    assert!((hydro - 0.005).abs() < 1e-9, "g_B = {}", hydro);
    assert!((solution.objective().value() - 100_000.025).abs() < 1e-6);
    for region in &solution.regions {
        let supplied = region.generation.value() + region.net_import.value();
        assert!(
            (supplied - region.demand.value()).abs() < 1e-9,
            "{}: supplied {} for demand {}",
            region.region,
            supplied,
            region.demand.value()
        );
    }
    assert!((solution.shadow_price("B").unwrap().value() - 5.0).abs() < TOL);
}
