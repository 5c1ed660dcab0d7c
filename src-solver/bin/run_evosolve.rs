use clap::Parser;
use evosolve::{
    Bounds, Constraints, CsvMonitor, DEConfig, Integrality, MapKind, PenaltySet,
    QuadraticInequality, Solver, SolverStatus, StrategyVariant, VerboseMonitor,
};
use evosolve_testfunctions::{
    FunctionMetadata, get_function_bounds_dim, get_function_metadata, get_function_registry,
};
use std::fmt::Write as FmtWrite;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Weight applied to the squared violation of benchmark inequality constraints
const CONSTRAINT_WEIGHT: f64 = 1e6;

#[derive(Parser, Debug)]
#[command(
    name = "run_evosolve",
    about = "Minimize a benchmark function with differential evolution"
)]
struct Cli {
    /// Name of the benchmark function (use --list-functions to see available options)
    #[arg(long)]
    function: Option<String>,

    /// Dimensionality of the problem (defaults to the function's typical dimension)
    #[arg(long)]
    dim: Option<usize>,

    /// JSON configuration file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// DE strategy (e.g. best1bin, rand1exp, currenttobest1bin)
    #[arg(long)]
    strategy: Option<String>,

    /// Total population size (default: 15 per free variable)
    #[arg(long)]
    population: Option<usize>,

    /// Maximum number of generations
    #[arg(long)]
    maxiter: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Evaluation map: serial, threaded or pool
    #[arg(long)]
    map: Option<String>,

    /// Worker threads for the threaded and pool maps (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Write every evaluation to <dir>/<function>.csv
    #[arg(long)]
    record: Option<PathBuf>,

    /// Log the best point every N generations
    #[arg(long, default_value_t = 10)]
    progress_every: usize,

    /// List all available functions and exit
    #[arg(long)]
    list_functions: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(evosolve_env::log_filter()))
        .init();
    let args = Cli::parse();

    let registry = get_function_registry();
    let metadata_map = get_function_metadata();

    if args.list_functions {
        let mut names: Vec<&str> = registry.keys().copied().collect();
        names.sort();
        println!("Available test functions ({}):", names.len());
        for name in names {
            match metadata_map.get(name) {
                Some(meta) => println!("- {:<24} {}", name, meta.description),
                None => println!("- {name}"),
            }
        }
        return;
    }

    let function_name = match &args.function {
        Some(name) => name.trim().to_lowercase(),
        None => {
            eprintln!("Error: --function must be provided unless --list-functions is used.");
            process::exit(2);
        }
    };
    let Some(&function) = registry.get(function_name.as_str()) else {
        eprintln!(
            "Error: function '{function_name}' not found. Use --list-functions to inspect available names."
        );
        process::exit(2);
    };
    let metadata = metadata_map.get(&function_name);

    let dimension = determine_dimension(args.dim, metadata);
    if dimension == 0 {
        eprintln!("Error: problem dimension must be greater than zero.");
        process::exit(2);
    }

    let config = build_config(&args).unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        process::exit(2);
    });

    let pairs = get_function_bounds_dim(&function_name, dimension, (-5.0, 5.0));
    let bounds = Bounds::from_pairs(&pairs).unwrap_or_else(|err| {
        eprintln!("Error: invalid bounds for '{function_name}': {err}");
        process::exit(2);
    });

    let mut solver = config.build_solver(bounds.clone()).unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        process::exit(2);
    });

    if let Some(meta) = metadata
        && !meta.inequality_constraints.is_empty()
    {
        let mut penalties = PenaltySet::default();
        for &g in &meta.inequality_constraints {
            penalties = penalties.with(QuadraticInequality::new(g, CONSTRAINT_WEIGHT));
        }
        let mut constraints = Constraints::default().with_penalty(penalties);
        if let Some(mask) = &config.integrality {
            match Integrality::new(mask.clone(), bounds.clone()) {
                Ok(repair) => constraints = constraints.with_repair(repair),
                Err(err) => {
                    eprintln!("Error: {err}");
                    process::exit(2);
                }
            }
        }
        solver.set_constraints(constraints);
    }

    solver.set_generation_monitor(Arc::new(VerboseMonitor::new(args.progress_every.max(1))));

    let recorder = match &args.record {
        Some(dir) => {
            let monitor = Arc::new(CsvMonitor::new(dir, &function_name));
            solver.set_evaluation_monitor(monitor.clone());
            Some(monitor)
        }
        None => None,
    };

    if let Err(err) = solver.enable_signal_handler() {
        log::warn!("Ctrl-C will not stop the run gracefully: {err}");
    }

    println!(
        "Running evosolve DE on '{}' ({}D) with {} strategy, population {}...",
        function_name,
        dimension,
        config.strategy,
        solver.population_size()
    );

    let start = Instant::now();
    let objective = move |x: &ndarray::Array1<f64>| function(x);
    let outcome = solver.solve(&objective, None).map(|state| state.status.clone());
    let elapsed = start.elapsed();

    if let Some(monitor) = &recorder {
        match monitor.finalize() {
            Ok(path) => println!("Recorded {} evaluations to {}", monitor.len(), path.display()),
            Err(err) => eprintln!("Warning: failed to write records: {err}"),
        }
    }

    let report = solver.report();
    println!("\nOptimization finished in {:.2?}", elapsed);
    match &outcome {
        Ok(SolverStatus::Cancelled) => println!("Status: cancelled, best so far shown"),
        Ok(_) => println!("Status: {}", report.message),
        Err(err) => println!("Status: failed: {err}"),
    }
    println!(
        "Generations: {} | Evaluations: {} | Success: {}",
        report.nit, report.nfev, report.success
    );
    println!("Best objective: {:.6e}", report.fun);
    println!("Best parameters: [{}]", format_vector(report.x.iter()));

    if let Some(meta) = metadata
        && let Some((x_star, f_star)) = meta.global_minima.first()
        && x_star.len() == dimension
    {
        println!("Known minimum: {:.6e} at [{}]", f_star, format_vector(x_star.iter()));
    }

    if outcome.is_err() || !report.success {
        process::exit(1);
    }
}

fn build_config(args: &Cli) -> Result<DEConfig, String> {
    let mut config = match &args.config {
        Some(path) => DEConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => DEConfig::default(),
    };
    if let Some(s) = &args.strategy {
        config.strategy = StrategyVariant::from_str(s).map_err(|e| e.to_string())?;
    }
    if let Some(p) = args.population {
        config.population_size = Some(p);
    }
    if let Some(m) = args.maxiter {
        config.max_generations = Some(m);
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(m) = &args.map {
        config.map = MapKind::from_str(m).map_err(|e| e.to_string())?;
    }
    if let Some(t) = args.threads {
        config.num_threads = if t == 0 { None } else { Some(t) };
    }
    Ok(config)
}

fn determine_dimension(dim: Option<usize>, metadata: Option<&FunctionMetadata>) -> usize {
    if let Some(dim) = dim {
        return dim;
    }
    if let Some(meta) = metadata {
        if let Some(&preferred) = meta.dimensions.first()
            && preferred > 0
        {
            return preferred;
        }
        if !meta.bounds.is_empty() {
            return meta.bounds.len();
        }
    }
    2
}

fn format_vector<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    let mut out = String::new();
    for (idx, value) in values.enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        let _ = write!(&mut out, "{value:.6}");
    }
    out
}
