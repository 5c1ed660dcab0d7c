use std::sync::Arc;

use evosolve::{
    Bounds, CancellationToken, ChangeOverGeneration, DifferentialEvolutionSolver, MaxEvaluations,
    MaxGenerations, Monitor, Never, Solver, SolverStatus, TerminationConfig, TerminationExt, VTR,
};
use evosolve_testfunctions::{rosenbrock, sphere};
use ndarray::Array1;

fn solver(seed: u64) -> DifferentialEvolutionSolver {
    let mut s = DifferentialEvolutionSolver::with_defaults(3);
    s.initialize(Some(Bounds::from_pairs(&[(-2.0, 2.0); 3]).unwrap()), 12, Some(seed))
        .unwrap();
    s
}

#[test]
fn test_max_generations_or_never_stops_at_ten() {
    let mut s = DifferentialEvolutionSolver::with_defaults(3);
    s.set_termination(Box::new(MaxGenerations(10).or(Never)));
    s.initialize(Some(Bounds::from_pairs(&[(-2.0, 2.0); 3]).unwrap()), 12, Some(3))
        .unwrap();
    let state = s.solve(&rosenbrock, None).unwrap();
    assert_eq!(state.generation, 10);
    assert_eq!(state.reason(), Some("Maximum generations reached: 10"));
}

#[test]
fn test_vtr_stops_early() {
    let mut s = solver(4);
    s.set_termination(Box::new(VTR { target: 1e-3 }.or(MaxGenerations(500))));
    let state = s.solve(&sphere, None).unwrap();
    assert!(state.best_energy <= 1e-3);
    assert!(state.generation < 500);
    assert!(state.reason().unwrap().starts_with("Value to reach"));
}

#[test]
fn test_hard_caps_apply_after_criterion() {
    let mut s = solver(5);
    s.set_termination(Box::new(Never));
    s.set_evaluation_limits(None, Some(100));
    let state = s.solve(&sphere, None).unwrap();
    // 12 initial + 8 generations of 12 = 108
    assert_eq!(state.evaluations, 108);
    assert_eq!(state.reason(), Some("Maximum evaluations reached: 100"));

    let mut s = solver(5);
    s.set_termination(Box::new(MaxEvaluations(50).and(MaxGenerations(6))));
    let state = s.solve(&sphere, None).unwrap();
    assert_eq!(state.generation, 6);
}

#[test]
fn test_change_over_generation_from_config() {
    let config = TerminationConfig::Any {
        criteria: vec![
            TerminationConfig::ChangeOverGeneration { tolerance: 0.0, generations: 30 },
            TerminationConfig::MaxGenerations { generations: 2000 },
        ],
    };
    let mut s = solver(6);
    s.set_termination(config.build());
    let state = s.solve(&sphere, None).unwrap();
    assert!(state.is_terminated());
    assert!(state.generation >= 30);

    let mut criterion = ChangeOverGeneration::new(1e-12, 5);
    let mut st = evosolve::SolverState::new(1);
    st.best_energy = 1.0;
    for g in 1..=5 {
        st.generation = g;
        assert!(!evosolve::Termination::should_stop(&mut criterion, &st));
    }
    st.generation = 6;
    assert!(evosolve::Termination::should_stop(&mut criterion, &st));
}

#[test]
fn test_solve_in_slices_matches_one_run() {
    let mut sliced = solver(9);
    sliced.set_termination(Box::new(MaxGenerations(50)));
    let state = sliced.solve(&rosenbrock, Some(20)).unwrap();
    assert_eq!(state.generation, 20);
    assert_eq!(state.status, SolverStatus::Running);
    sliced.solve(&rosenbrock, None).unwrap();

    let mut whole = solver(9);
    whole.set_termination(Box::new(MaxGenerations(50)));
    whole.solve(&rosenbrock, None).unwrap();

    assert_eq!(sliced.state().generation, 50);
    assert_eq!(sliced.state().population, whole.state().population);
    assert_eq!(sliced.best_energy(), whole.best_energy());
}

#[test]
fn test_cancel_before_solve_then_resume() {
    let mut s = solver(10);
    s.set_termination(Box::new(MaxGenerations(15)));
    s.cancellation_token().cancel();
    let state = s.solve(&sphere, None).unwrap();
    assert_eq!(state.status, SolverStatus::Cancelled);
    assert_eq!(state.generation, 0);

    // the request was consumed: the next solve runs to completion
    let state = s.solve(&sphere, None).unwrap();
    assert_eq!(state.generation, 15);
    assert!(state.is_terminated());
}

/// Requests cancellation once `limit` evaluations were reached.
struct CancelAfter {
    token: CancellationToken,
    limit: usize,
}

impl Monitor for CancelAfter {
    fn record(&self, evaluation_count: usize, _x: &Array1<f64>, _fitness: f64) {
        if evaluation_count >= self.limit {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancel_mid_run_then_resume_matches_uninterrupted() {
    let mut interrupted = solver(12);
    interrupted.set_termination(Box::new(MaxGenerations(40)));
    let token = interrupted.cancellation_token();
    // 12 initial + 5 * 12
    interrupted.set_generation_monitor(Arc::new(CancelAfter { token, limit: 72 }));

    let state = interrupted.solve(&rosenbrock, None).unwrap();
    assert_eq!(state.status, SolverStatus::Cancelled);
    assert_eq!(state.generation, 5);

    interrupted.set_generation_monitor(Arc::new(evosolve::NullMonitor));
    let state = interrupted.solve(&rosenbrock, None).unwrap();
    assert_eq!(state.generation, 40);
    assert!(state.is_terminated());

    let mut whole = solver(12);
    whole.set_termination(Box::new(MaxGenerations(40)));
    whole.solve(&rosenbrock, None).unwrap();

    assert_eq!(interrupted.state().population, whole.state().population);
    assert_eq!(interrupted.state().energies, whole.state().energies);
    assert_eq!(interrupted.state().evaluations, whole.state().evaluations);
}

#[test]
fn test_signal_handler_registration() {
    let mut s = solver(13);
    s.enable_signal_handler().unwrap();
    s.set_termination(Box::new(MaxGenerations(5)));
    s.solve(&sphere, None).unwrap();
    s.disable_signal_handler();
    assert!(s.state().is_terminated());
}
