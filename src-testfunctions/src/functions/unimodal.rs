//! Single-optimum landscapes

use ndarray::Array1;

/// Sphere function - N-dimensional
/// Global minimum: f(x) = 0 at x = (0, 0, ..., 0)
pub fn sphere(x: &Array1<f64>) -> f64 {
    x.iter().map(|&v| v * v).sum()
}

/// Simple quadratic, same landscape as the sphere, kept for API compatibility
pub fn quadratic(x: &Array1<f64>) -> f64 {
    x.iter().map(|&xi| xi * xi).sum()
}

/// Rosenbrock function - N-dimensional
/// Global minimum: f(x) = 0 at x = (1, 1, ..., 1)
pub fn rosenbrock(x: &Array1<f64>) -> f64 {
    x.windows(2)
        .into_iter()
        .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

/// Rotated hyper-ellipsoid: sum of partial sums squared
/// Global minimum: f(x) = 0 at the origin
pub fn rotated_hyper_ellipsoid(x: &Array1<f64>) -> f64 {
    let mut partial = 0.0;
    let mut total = 0.0;
    for &xi in x.iter() {
        partial += xi;
        total += partial * partial;
    }
    total
}

/// Zakharov function
/// Global minimum: f(x) = 0 at the origin
pub fn zakharov(x: &Array1<f64>) -> f64 {
    let sum1: f64 = x.iter().map(|&xi| xi * xi).sum();
    let sum2: f64 = x.iter().enumerate().map(|(i, &xi)| 0.5 * (i as f64 + 1.0) * xi).sum();
    sum1 + sum2.powi(2) + sum2.powi(4)
}

/// Booth function (2D)
/// Global minimum: f(1, 3) = 0
pub fn booth(x: &Array1<f64>) -> f64 {
    (x[0] + 2.0 * x[1] - 7.0).powi(2) + (2.0 * x[0] + x[1] - 5.0).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unimodal_minima() {
        assert_eq!(sphere(&Array1::zeros(4)), 0.0);
        assert_eq!(rosenbrock(&Array1::ones(5)), 0.0);
        assert_eq!(rotated_hyper_ellipsoid(&Array1::zeros(3)), 0.0);
        assert_eq!(zakharov(&Array1::zeros(3)), 0.0);
        assert_eq!(booth(&Array1::from(vec![1.0, 3.0])), 0.0);
    }

    #[test]
    fn test_rosenbrock_off_minimum() {
        let x = Array1::from(vec![0.0, 0.0]);
        assert_eq!(rosenbrock(&x), 1.0);
    }
}
