//! Objectives paired with constraint functions (g(x) <= 0 when feasible)

use ndarray::Array1;

/// Rosenbrock objective used with the disk constraint below
pub fn rosenbrock_objective(x: &Array1<f64>) -> f64 {
    (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
}

/// Disk constraint x^2 + y^2 <= 2, expressed as g(x) <= 0
pub fn rosenbrock_disk_constraint(x: &Array1<f64>) -> f64 {
    x[0] * x[0] + x[1] * x[1] - 2.0
}

/// Binh and Korn first objective
pub fn binh_korn_objective(x: &Array1<f64>) -> f64 {
    4.0 * x[0] * x[0] + 4.0 * x[1] * x[1]
}

/// Binh and Korn constraint: (x - 5)^2 + y^2 <= 25
pub fn binh_korn_constraint1(x: &Array1<f64>) -> f64 {
    (x[0] - 5.0).powi(2) + x[1] * x[1] - 25.0
}

/// Binh and Korn constraint: (x - 8)^2 + (y + 3)^2 >= 7.7
pub fn binh_korn_constraint2(x: &Array1<f64>) -> f64 {
    7.7 - (x[0] - 8.0).powi(2) - (x[1] + 3.0).powi(2)
}
