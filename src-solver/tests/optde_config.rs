use std::sync::Arc;

use evosolve::{
    Bounds, CsvMonitor, DEConfig, DEConfigBuilder, DifferentialEvolutionSolver, Init, MapKind,
    MaxGenerations, Solver, StrategyVariant, TerminationConfig, differential_evolution,
};
use evosolve_testfunctions::{booth, get_function_bounds_dim, get_function_registry, sphere};

#[test]
fn test_every_strategy_solves_sphere() {
    for variant in StrategyVariant::ALL {
        let parsed: StrategyVariant = variant.as_str().parse().unwrap();
        assert_eq!(parsed, variant);

        let config = DEConfigBuilder::new()
            .seed(31)
            .population_size(20)
            .strategy(variant)
            .termination(TerminationConfig::Never)
            .max_generations(150)
            .build();
        let report = differential_evolution(&sphere, &[(-5.0, 5.0); 2], config).unwrap();
        assert!(report.success);
        assert_eq!(report.nit, 150);
        assert!(report.fun < 1e-3, "{}: f={}", variant, report.fun);
    }
}

#[test]
fn test_config_file_drives_the_solver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("de.json");
    std::fs::write(
        &path,
        r#"{
            "population_size": 16,
            "seed": 3,
            "strategy": "currenttobest1bin",
            "mutation": {"range": {"min": 0.4, "max": 0.9}},
            "recombination": 0.7,
            "init": "random",
            "map": "worker_pool",
            "num_threads": 2,
            "termination": {"kind": "any", "criteria": [
                {"kind": "vtr", "target": 1e-8},
                {"kind": "max_generations", "generations": 400}
            ]}
        }"#,
    )
    .unwrap();

    let config = DEConfig::from_json_file(&path).unwrap();
    assert_eq!(config.init, Init::Random);
    assert_eq!(config.map, MapKind::WorkerPool);

    let mut solver = config.build_solver(Bounds::from_pairs(&[(-10.0, 10.0); 2]).unwrap()).unwrap();
    assert_eq!(solver.population_size(), 16);
    let state = solver.solve(&booth, None).unwrap();
    assert!(state.best_energy <= 1e-8);
    assert!(state.reason().unwrap().starts_with("Value to reach"));
}

#[test]
fn test_report_fields() {
    let config = DEConfigBuilder::new().seed(9).population_size(10).max_generations(7).build();
    let mut solver = DifferentialEvolutionSolver::from_config(
        &config,
        Bounds::from_pairs(&[(-1.0, 1.0); 3]).unwrap(),
    )
    .unwrap();
    solver.set_termination(Box::new(MaxGenerations(1000)));
    solver.solve(&sphere, None).unwrap();

    let report = solver.report();
    assert!(report.success);
    assert_eq!(report.message, "Maximum generations reached: 7");
    assert_eq!(report.nit, 7);
    assert_eq!(report.nfev, 10 + 7 * 10);
    assert_eq!(report.population.dim(), (10, 3));
    assert_eq!(report.population_energies.len(), 10);
    assert_eq!(report.fun, solver.best_energy());
}

#[test]
fn test_csv_monitor_records_every_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Arc::new(CsvMonitor::new(dir.path(), "sphere_run"));

    let mut solver = DEConfigBuilder::new()
        .seed(1)
        .population_size(8)
        .termination(TerminationConfig::Never)
        .max_generations(4)
        .build()
        .build_solver(Bounds::from_pairs(&[(-2.0, 2.0); 2]).unwrap())
        .unwrap();
    solver.set_evaluation_monitor(monitor.clone());
    solver.solve(&sphere, None).unwrap();

    let path = monitor.finalize().unwrap();
    assert_eq!(path, dir.path().join("sphere_run.csv"));
    let mut reader = csv::Reader::from_path(&path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, vec!["evaluation_count", "x0", "x1", "fitness"]);
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 8 + 4 * 8);
    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[rows.len() - 1][0], "40");
}

#[test]
fn test_registry_functions_run_through_the_solver() {
    let registry = get_function_registry();
    for name in ["sphere", "booth", "himmelblau", "six_hump_camel"] {
        let f = registry[name];
        let bounds = get_function_bounds_dim(name, 2, (-5.0, 5.0));
        let config = DEConfigBuilder::new().seed(12).population_size(30).max_generations(300).build();
        let report = differential_evolution(&f, &bounds, config).unwrap();
        assert!(report.fun.is_finite(), "{}", name);
        assert!(report.nit <= 300);
    }
}
