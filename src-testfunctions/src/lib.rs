//! Optimization test functions library
//!
//! A small collection of benchmark objectives used to validate the evosolve
//! solvers, grouped by category:
//!
//! - **Unimodal**: sphere, rosenbrock, zakharov, ...
//! - **Multimodal**: ackley, rastrigin, griewank, ...
//! - **Constrained**: objectives paired with `g(x) <= 0` constraint functions
//! - **Polynomial**: the Storn & Price Chebyshev fitting problem
//!
//! # Example
//!
//! ```rust
//! use ndarray::Array1;
//! use evosolve_testfunctions::*;
//!
//! let x = Array1::from_vec(vec![0.0, 0.0]);
//! assert_eq!(sphere(&x), 0.0);
//!
//! let bounds = get_function_bounds("sphere");
//! assert!(bounds.is_some());
//! ```

use ndarray::Array1;
use std::collections::HashMap;

pub mod functions;
pub use functions::*;

/// Plain objective signature shared by every benchmark function
pub type TestFunction = fn(&Array1<f64>) -> f64;

/// Metadata for a test function including bounds and known minima
#[derive(Debug, Clone)]
pub struct FunctionMetadata {
    /// Function name
    pub name: String,
    /// Bounds for each dimension (min, max); a single pair applies to every dimension
    pub bounds: Vec<(f64, f64)>,
    /// Global minima locations and values
    pub global_minima: Vec<(Vec<f64>, f64)>,
    /// Inequality constraint functions (should be <= 0 when satisfied)
    pub inequality_constraints: Vec<TestFunction>,
    /// Description of the function
    pub description: String,
    /// Whether the function is multimodal
    pub multimodal: bool,
    /// Typical dimension(s) for the function
    pub dimensions: Vec<usize>,
}

fn entry(
    name: &str,
    bounds: Vec<(f64, f64)>,
    global_minima: Vec<(Vec<f64>, f64)>,
    description: &str,
    multimodal: bool,
    dimensions: Vec<usize>,
) -> FunctionMetadata {
    FunctionMetadata {
        name: name.to_string(),
        bounds,
        global_minima,
        inequality_constraints: vec![],
        description: description.to_string(),
        multimodal,
        dimensions,
    }
}

/// Get metadata for all available test functions
pub fn get_function_metadata() -> HashMap<String, FunctionMetadata> {
    let mut all = vec![
        entry("sphere", vec![(-5.0, 5.0)], vec![(vec![0.0, 0.0], 0.0)], "Convex bowl", false, vec![2, 5, 10]),
        entry(
            "quadratic",
            vec![(-5.0, 5.0)],
            vec![(vec![0.0, 0.0], 0.0)],
            "Convex bowl (alias of sphere)",
            false,
            vec![2],
        ),
        entry(
            "rosenbrock",
            vec![(-2.048, 2.048)],
            vec![(vec![1.0, 1.0], 0.0)],
            "Curved narrow valley",
            false,
            vec![2, 5],
        ),
        entry(
            "rotated_hyper_ellipsoid",
            vec![(-65.536, 65.536)],
            vec![(vec![0.0, 0.0], 0.0)],
            "Ill-conditioned convex bowl",
            false,
            vec![2, 5],
        ),
        entry("zakharov", vec![(-5.0, 10.0)], vec![(vec![0.0, 0.0], 0.0)], "Plate-shaped", false, vec![2, 5]),
        entry("booth", vec![(-10.0, 10.0); 2], vec![(vec![1.0, 3.0], 0.0)], "Plate-shaped 2D", false, vec![2]),
        entry(
            "ackley",
            vec![(-32.768, 32.768)],
            vec![(vec![0.0, 0.0], 0.0)],
            "Nearly flat outer region, deep central hole",
            true,
            vec![2, 5, 10],
        ),
        entry(
            "rastrigin",
            vec![(-5.12, 5.12)],
            vec![(vec![0.0, 0.0], 0.0)],
            "Regular lattice of local minima",
            true,
            vec![2, 5],
        ),
        entry("griewank", vec![(-600.0, 600.0)], vec![(vec![0.0, 0.0], 0.0)], "Product of cosines", true, vec![2, 5]),
        entry(
            "himmelblau",
            vec![(-5.0, 5.0); 2],
            vec![
                (vec![3.0, 2.0], 0.0),
                (vec![-2.805118, 3.131312], 0.0),
                (vec![-3.779310, -3.283186], 0.0),
                (vec![3.584428, -1.848126], 0.0),
            ],
            "Four identical global minima",
            true,
            vec![2],
        ),
        entry(
            "six_hump_camel",
            vec![(-3.0, 3.0), (-2.0, 2.0)],
            vec![(vec![0.0898, -0.7126], -1.0316), (vec![-0.0898, 0.7126], -1.0316)],
            "Six local minima, two global",
            true,
            vec![2],
        ),
        entry(
            "chebyshev8",
            vec![(-100.0, 100.0); 9],
            vec![(polynomial::CHEBYSHEV8_COEFFS.to_vec(), 0.0)],
            "Storn & Price polynomial fitting (T8)",
            true,
            vec![9],
        ),
    ];

    let mut disk = entry(
        "rosenbrock_disk",
        vec![(-1.5, 1.5); 2],
        vec![(vec![1.0, 1.0], 0.0)],
        "Rosenbrock restricted to x^2 + y^2 <= 2",
        false,
        vec![2],
    );
    disk.inequality_constraints.push(rosenbrock_disk_constraint);
    all.push(disk);

    let mut binh = entry(
        "binh_korn",
        vec![(0.0, 5.0), (0.0, 3.0)],
        vec![(vec![0.0, 0.0], 0.0)],
        "Binh and Korn first objective with two constraints",
        false,
        vec![2],
    );
    binh.inequality_constraints.push(binh_korn_constraint1);
    binh.inequality_constraints.push(binh_korn_constraint2);
    all.push(binh);

    all.into_iter().map(|m| (m.name.clone(), m)).collect()
}

/// Map of function name to callable objective
pub fn get_function_registry() -> HashMap<&'static str, TestFunction> {
    let mut registry: HashMap<&'static str, TestFunction> = HashMap::new();
    registry.insert("sphere", sphere);
    registry.insert("quadratic", quadratic);
    registry.insert("rosenbrock", rosenbrock);
    registry.insert("rotated_hyper_ellipsoid", rotated_hyper_ellipsoid);
    registry.insert("zakharov", zakharov);
    registry.insert("booth", booth);
    registry.insert("ackley", ackley);
    registry.insert("rastrigin", rastrigin);
    registry.insert("griewank", griewank);
    registry.insert("himmelblau", himmelblau);
    registry.insert("six_hump_camel", six_hump_camel);
    registry.insert("chebyshev8", chebyshev8_cost);
    registry.insert("rosenbrock_disk", rosenbrock_objective);
    registry.insert("binh_korn", binh_korn_objective);
    registry
}

/// Helper function to get bounds for a specific function from metadata
/// Returns None if function is not found in metadata
pub fn get_function_bounds(function_name: &str) -> Option<Vec<(f64, f64)>> {
    get_function_metadata().get(function_name).map(|meta| meta.bounds.clone())
}

/// Bounds expanded (or truncated) to `dim` dimensions; `default_bounds` when unknown
pub fn get_function_bounds_dim(
    function_name: &str,
    dim: usize,
    default_bounds: (f64, f64),
) -> Vec<(f64, f64)> {
    match get_function_bounds(function_name) {
        Some(bounds) if !bounds.is_empty() => (0..dim).map(|i| bounds[i % bounds.len()]).collect(),
        _ => vec![default_bounds; dim],
    }
}
