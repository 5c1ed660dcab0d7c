use evosolve::{
    Bounds, ClipToBounds, Constraints, DEConfigBuilder, DifferentialEvolutionSolver, Integrality,
    LinearPenalty, MaxGenerations, Mutation, Never, PenaltySet, QuadraticInequality, Repair,
    Solver, StrategyVariant, TerminationConfig,
};
use evosolve_testfunctions::{
    binh_korn_constraint1, binh_korn_constraint2, binh_korn_objective, rosenbrock_disk_constraint,
    rosenbrock_objective, sphere,
};
use ndarray::{Array1, array};

#[test]
fn test_de_constrained_rosenbrock_disk() {
    let bounds = Bounds::from_pairs(&[(-1.5, 1.5); 2]).unwrap();
    let mut s = DifferentialEvolutionSolver::with_defaults(2);
    s.set_termination(Box::new(Never));
    s.set_evaluation_limits(Some(1500), None);
    s.set_constraints(
        Constraints::default().with_penalty(QuadraticInequality::new(rosenbrock_disk_constraint, 1e6)),
    );
    s.initialize(Some(bounds), 40, Some(17)).unwrap();
    let state = s.solve(&rosenbrock_objective, None).unwrap();

    let x = &state.best_solution;
    assert!(state.best_energy < 1e-3, "f={}", state.best_energy);
    assert!(rosenbrock_disk_constraint(x) < 1e-3, "x={:?}", x);
    assert!((x[0] - 1.0).abs() < 0.05 && (x[1] - 1.0).abs() < 0.05, "x={:?}", x);
}

#[test]
fn test_de_constrained_binh_korn() {
    let b = vec![(0.0, 5.0), (0.0, 3.0)];
    let penalties = PenaltySet::default()
        .with(QuadraticInequality::new(binh_korn_constraint1, 1e6))
        .with(QuadraticInequality::new(binh_korn_constraint2, 1e6));
    let mut s = DEConfigBuilder::new()
        .seed(59)
        .population_size(40)
        .strategy(StrategyVariant::RandToBest1Exp)
        .mutation(Mutation::Range { min: 0.5, max: 1.0 })
        .termination(TerminationConfig::Never)
        .max_generations(600)
        .build()
        .build_solver(Bounds::from_pairs(&b).unwrap())
        .unwrap();
    s.set_constraints(Constraints::default().with_penalty(penalties));
    let state = s.solve(&binh_korn_objective, None).unwrap();

    let x = &state.best_solution;
    assert!(binh_korn_constraint1(x) <= 0.1);
    assert!(binh_korn_constraint2(x) <= 0.1);
    assert!(state.best_energy < 1e-4, "f={}", state.best_energy);
}

#[test]
fn test_penalty_identity_when_always_feasible() {
    // x0 <= 10 holds everywhere inside the bounds
    let run = |constraints: Constraints| {
        let mut s = DifferentialEvolutionSolver::with_defaults(2);
        s.set_termination(Box::new(MaxGenerations(25)));
        s.set_constraints(constraints);
        s.initialize(Some(Bounds::from_pairs(&[(-5.0, 5.0); 2]).unwrap()), 16, Some(8))
            .unwrap();
        s.solve(&sphere, None).unwrap();
        s.state().clone()
    };
    let linear = LinearPenalty::new(array![[1.0, 0.0]], array![-10.0], array![10.0], 1e3).unwrap();
    let penalised = run(
        Constraints::default()
            .with_penalty(PenaltySet::default().with(linear).with(QuadraticInequality::new(
                |x: &Array1<f64>| x[0] - 10.0,
                1e6,
            ))),
    );
    let plain = run(Constraints::none());
    assert_eq!(penalised.energies, plain.energies);
    assert_eq!(penalised.population, plain.population);
}

#[test]
fn test_integrality_keeps_population_on_integers() {
    let shifted = |x: &Array1<f64>| (x[0] - 2.3).powi(2) + (x[1] + 1.2).powi(2);
    let mut s = DEConfigBuilder::new()
        .seed(4)
        .population_size(20)
        .termination(TerminationConfig::Never)
        .max_generations(200)
        .integrality(vec![true, false])
        .build()
        .build_solver(Bounds::from_pairs(&[(-5.0, 5.0); 2]).unwrap())
        .unwrap();
    let state = s.solve(&shifted, None).unwrap();

    assert!(state.population.column(0).iter().all(|v| v.fract() == 0.0));
    assert_eq!(state.best_solution[0], 2.0);
    assert!((state.best_solution[1] + 1.2).abs() < 1e-4);
}

#[test]
fn test_repairs_are_idempotent() {
    let bounds = Bounds::from_pairs(&[(-1.0, 1.0), (0.0, 10.0), (-3.0, 3.0)]).unwrap();
    let integrality = Integrality::new(vec![false, true, true], bounds.clone()).unwrap();
    let clip = ClipToBounds(bounds);
    let points = [array![3.7, -0.4, 2.5], array![-0.2, 9.6, -8.0], array![0.0, 4.49, 1.5]];
    for x in points {
        for repair in [&integrality as &dyn Repair, &clip as &dyn Repair] {
            let once = repair.repair(&x);
            assert_eq!(repair.repair(&once), once);
        }
    }
}

#[test]
fn test_initial_guess_is_kept_when_optimal() {
    let mut s = DEConfigBuilder::new()
        .seed(2)
        .population_size(10)
        .max_generations(5)
        .x0(vec![0.0, 0.0])
        .build()
        .build_solver(Bounds::from_pairs(&[(-5.0, 5.0); 2]).unwrap())
        .unwrap();
    let state = s.solve(&sphere, None).unwrap();
    assert_eq!(state.best_energy, 0.0);
    assert_eq!(state.best_solution, array![0.0, 0.0]);
}
