use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use evosolve::{
    Bounds, DifferentialEvolutionSolver, DifferentialStrategy, Fallible, MaxGenerations, Mutation,
    ObjectiveError, SerialMap, Solver, SolverError, SolverStatus, Strategy, StrategyVariant,
    ThreadedMap, WithDimension,
};
use evosolve_testfunctions::sphere;
use ndarray::Array1;

fn bounds(dim: usize) -> Bounds {
    Bounds::from_pairs(&vec![(-5.0, 5.0); dim]).unwrap()
}

#[test]
fn test_de_insufficient_population() {
    // rand1 samples three members besides the target
    let strategy =
        DifferentialStrategy::new(StrategyVariant::Rand1Bin, Mutation::Factor(0.5), 0.9).unwrap();
    assert_eq!(strategy.required_members(), 3);
    let mut s = DifferentialEvolutionSolver::new(2);
    s.set_strategy(Box::new(strategy));
    s.set_termination(Box::new(MaxGenerations(10)));
    s.set_evaluation_map(Box::new(SerialMap));
    s.initialize(Some(bounds(2)), 4, Some(1)).unwrap();

    match s.step(&sphere) {
        Err(SolverError::InsufficientPopulation { required, available }) => {
            assert_eq!(required, 5);
            assert_eq!(available, 4);
        }
        other => panic!("expected InsufficientPopulation, got {:?}", other),
    }
    assert_eq!(s.state().generation, 0);
    assert_eq!(s.state().evaluations, 0);
}

#[test]
fn test_de_missing_plugins_and_arity() {
    let mut bare = DifferentialEvolutionSolver::new(2);
    bare.initialize(Some(bounds(2)), 10, Some(1)).unwrap();
    assert!(bare.step(&sphere).unwrap_err().is_config_error());

    let mut s = DifferentialEvolutionSolver::with_defaults(2);
    s.initialize(Some(bounds(2)), 10, Some(1)).unwrap();
    let wrong = WithDimension { objective: sphere, dim: 3 };
    let err = s.solve(&wrong, None).unwrap_err();
    assert!(err.is_dimension_error());
    assert_eq!(s.state().evaluations, 0);

    let pop = ndarray::Array2::<f64>::zeros((10, 3));
    assert!(s.set_initial_population(pop).unwrap_err().is_dimension_error());
}

/// Objective that fails on the `fail_at`-th call made while armed.
struct Flaky {
    armed: AtomicBool,
    calls: AtomicUsize,
    fail_at: usize,
}

impl Flaky {
    fn new(fail_at: usize) -> Self {
        Self { armed: AtomicBool::new(false), calls: AtomicUsize::new(0), fail_at }
    }

    fn eval(&self, x: &Array1<f64>) -> Result<f64, ObjectiveError> {
        if self.armed.load(Ordering::SeqCst) {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_at {
                return Err(ObjectiveError::new("simulated crash"));
            }
        }
        Ok(sphere(x))
    }
}

#[test]
fn test_de_failing_evaluation_commits_nothing() {
    let flaky = Flaky::new(7);
    let objective = Fallible(|x: &Array1<f64>| flaky.eval(x));

    let mut s = DifferentialEvolutionSolver::with_defaults(2);
    s.set_termination(Box::new(MaxGenerations(100)));
    s.initialize(Some(bounds(2)), 20, Some(5)).unwrap();
    for _ in 0..3 {
        s.step(&objective).unwrap();
    }
    let before = s.state().clone();

    flaky.armed.store(true, Ordering::SeqCst);
    let err = s.step(&objective).unwrap_err();
    assert!(err.is_evaluation_error());
    match err {
        SolverError::Evaluation { index, message } => {
            assert_eq!(index, 6);
            assert!(message.contains("simulated crash"));
        }
        other => panic!("unexpected error {:?}", other),
    }

    let after = s.state();
    assert_eq!(after.generation, before.generation);
    assert_eq!(after.evaluations, before.evaluations);
    assert_eq!(after.population, before.population);
    assert_eq!(after.energies, before.energies);
    assert_eq!(after.best_energy, before.best_energy);

    // the failed generation leaves the random stream untouched
    flaky.armed.store(false, Ordering::SeqCst);
    s.step(&objective).unwrap();
    s.step(&objective).unwrap();

    let mut reference = DifferentialEvolutionSolver::with_defaults(2);
    reference.set_termination(Box::new(MaxGenerations(100)));
    reference.initialize(Some(bounds(2)), 20, Some(5)).unwrap();
    for _ in 0..5 {
        reference.step(&sphere).unwrap();
    }
    assert_eq!(s.state().population, reference.state().population);
    assert_eq!(s.state().generation, 5);
}

#[test]
fn test_de_panicking_objective_is_an_evaluation_error() {
    let objective = |x: &Array1<f64>| -> f64 {
        if x[0] > 4.0 {
            panic!("out of domain");
        }
        sphere(x)
    };
    let mut s = DifferentialEvolutionSolver::with_defaults(2);
    s.set_evaluation_map(Box::new(ThreadedMap::new()));
    // every member starts above 4.0 so the first batch fails
    s.initialize(Some(Bounds::from_pairs(&[(4.5, 5.0), (-1.0, 1.0)]).unwrap()), 8, Some(3))
        .unwrap();
    let err = s.step(&objective).unwrap_err();
    match err {
        SolverError::Evaluation { index, message } => {
            assert_eq!(index, 0);
            assert!(message.contains("out of domain"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(s.state().evaluations, 0);
    assert_eq!(s.state().status, SolverStatus::Ready);
}

#[test]
fn test_de_invalid_configuration() {
    assert!(Bounds::from_pairs(&[(1.0, -1.0)]).unwrap_err().is_bounds_error());
    assert!(
        DifferentialStrategy::new(StrategyVariant::Best1Bin, Mutation::Factor(2.5), 0.9)
            .unwrap_err()
            .is_config_error()
    );
    assert!(
        DifferentialStrategy::new(StrategyVariant::Best1Bin, Mutation::Factor(0.5), -0.1)
            .unwrap_err()
            .is_config_error()
    );
    let mut s = DifferentialEvolutionSolver::with_defaults(2);
    assert!(s.initialize(Some(bounds(3)), 10, None).unwrap_err().is_dimension_error());
}
