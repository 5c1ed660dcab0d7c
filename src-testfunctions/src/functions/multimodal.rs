//! Landscapes with many local minima

use ndarray::Array1;
use std::f64::consts::{E, PI};

/// Ackley function - N-dimensional multimodal
/// Global minimum: f(x) = 0 at x = (0, 0, ..., 0)
pub fn ackley(x: &Array1<f64>) -> f64 {
    let n = x.len() as f64;
    let sum_sq: f64 = x.iter().map(|&xi| xi.powi(2)).sum();
    let sum_cos: f64 = x.iter().map(|&xi| (2.0 * PI * xi).cos()).sum();

    -20.0 * (-0.2 * (sum_sq / n).sqrt()).exp() - (sum_cos / n).exp() + 20.0 + E
}

/// Rastrigin function
/// Global minimum: f(x) = 0 at the origin
pub fn rastrigin(x: &Array1<f64>) -> f64 {
    let n = x.len() as f64;
    10.0 * n + x.iter().map(|&xi| xi * xi - 10.0 * (2.0 * PI * xi).cos()).sum::<f64>()
}

/// Griewank function
/// Global minimum: f(x) = 0 at the origin
pub fn griewank(x: &Array1<f64>) -> f64 {
    let sum: f64 = x.iter().map(|&xi| xi * xi / 4000.0).sum();
    let prod: f64 = x
        .iter()
        .enumerate()
        .map(|(i, &xi)| (xi / ((i + 1) as f64).sqrt()).cos())
        .product();
    sum - prod + 1.0
}

/// Himmelblau function (2D), four global minima with f = 0
pub fn himmelblau(x: &Array1<f64>) -> f64 {
    (x[0] * x[0] + x[1] - 11.0).powi(2) + (x[0] + x[1] * x[1] - 7.0).powi(2)
}

/// Six-hump camel function (2D)
/// Global minima: f = -1.0316 at (0.0898, -0.7126) and (-0.0898, 0.7126)
pub fn six_hump_camel(x: &Array1<f64>) -> f64 {
    let (x1, x2) = (x[0], x[1]);
    (4.0 - 2.1 * x1 * x1 + x1.powi(4) / 3.0) * x1 * x1 + x1 * x2 + (-4.0 + 4.0 * x2 * x2) * x2 * x2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multimodal_minima() {
        assert!(ackley(&Array1::zeros(3)).abs() < 1e-12);
        assert!(rastrigin(&Array1::zeros(3)).abs() < 1e-12);
        assert!(griewank(&Array1::zeros(3)).abs() < 1e-12);
        assert!(himmelblau(&Array1::from(vec![3.0, 2.0])).abs() < 1e-12);
        assert!((six_hump_camel(&Array1::from(vec![0.0898, -0.7126])) + 1.0316).abs() < 1e-4);
    }
}
