use std::sync::Arc;

use evosolve::{
    Bounds, DifferentialEvolutionSolver, MemoryMonitor, Never, Solver, SolverStatus, TerminationExt,
    MaxGenerations,
};
use evosolve_testfunctions::{rastrigin, sphere};

fn sphere_solver(seed: u64) -> DifferentialEvolutionSolver {
    let mut s = DifferentialEvolutionSolver::with_defaults(2);
    s.set_termination(Box::new(Never));
    s.set_evaluation_limits(Some(200), None);
    s.initialize(Some(Bounds::from_pairs(&[(-5.0, 5.0); 2]).unwrap()), 20, Some(seed))
        .unwrap();
    s
}

#[test]
fn test_de_sphere_2d() {
    let mut s = sphere_solver(42);
    let state = s.solve(&sphere, None).unwrap();

    assert_eq!(state.generation, 200);
    assert_eq!(state.evaluations, 20 + 200 * 20);
    assert!(state.best_energy <= 1e-6, "f={}", state.best_energy);
    assert!(state.best_solution.iter().all(|v| v.abs() <= 1e-3));
    assert_eq!(state.reason(), Some("Maximum generations reached: 200"));
}

#[test]
fn test_de_same_seed_same_run() {
    let mut a = DifferentialEvolutionSolver::with_defaults(4);
    let mut b = DifferentialEvolutionSolver::with_defaults(4);
    for s in [&mut a, &mut b] {
        s.set_termination(Box::new(MaxGenerations(40)));
        s.initialize(Some(Bounds::from_pairs(&[(-5.12, 5.12); 4]).unwrap()), 24, Some(7))
            .unwrap();
        s.solve(&rastrigin, None).unwrap();
    }
    assert_eq!(a.state().population, b.state().population);
    assert_eq!(a.state().energies, b.state().energies);
    assert_eq!(a.best_solution(), b.best_solution());
    assert_eq!(a.best_energy(), b.best_energy());
    assert_eq!(a.state().evaluations, b.state().evaluations);
}

#[test]
fn test_de_best_never_increases() {
    let generations = Arc::new(MemoryMonitor::new());
    let evaluations = Arc::new(MemoryMonitor::new());

    let mut s = DifferentialEvolutionSolver::with_defaults(3);
    s.set_termination(Box::new(MaxGenerations(60).or(Never)));
    s.set_generation_monitor(generations.clone());
    s.set_evaluation_monitor(evaluations.clone());
    s.initialize(Some(Bounds::from_pairs(&[(-5.12, 5.12); 3]).unwrap()), 15, Some(11))
        .unwrap();

    let mut previous = f64::INFINITY;
    while !s.step(&rastrigin).unwrap() {
        assert!(s.best_energy() <= previous);
        previous = s.best_energy();
    }

    let records = generations.records();
    assert_eq!(records.len(), 60);
    assert!(records.windows(2).all(|w| w[1].fitness <= w[0].fitness));
    assert!(records.windows(2).all(|w| w[1].evaluation_count == w[0].evaluation_count + 15));

    // every evaluated vector reaches the evaluation monitor, numbered in order
    assert_eq!(evaluations.len(), s.state().evaluations);
    let counts: Vec<usize> = evaluations.records().iter().map(|r| r.evaluation_count).collect();
    assert_eq!(counts, (1..=s.state().evaluations).collect::<Vec<_>>());
    assert_eq!(s.state().status, SolverStatus::Terminated {
        reason: "Maximum generations reached: 60".to_string()
    });
}

#[test]
fn test_de_step_after_termination_is_noop() {
    let mut s = sphere_solver(1);
    s.set_evaluation_limits(Some(3), None);
    s.solve(&sphere, None).unwrap();
    let before = s.state().clone();
    assert!(s.step(&sphere).unwrap());
    assert_eq!(s.state().generation, before.generation);
    assert_eq!(s.state().evaluations, before.evaluations);
}
