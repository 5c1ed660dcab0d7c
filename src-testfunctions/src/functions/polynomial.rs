//! Storn and Price polynomial fitting problem
//!
//! Find the coefficients of an order-8 polynomial that stays within [-1, 1]
//! on [-1, 1] and grows at least as fast as T8 at +/-1.2. The exact answer is
//! the Chebyshev polynomial of the first kind T8.

use ndarray::Array1;

/// Coefficients of T8, highest order first
pub const CHEBYSHEV8_COEFFS: [f64; 9] = [128.0, 0.0, -256.0, 0.0, 160.0, 0.0, -32.0, 0.0, 1.0];

/// Number of sample points on [-1, 1]
const SAMPLES: usize = 61;

/// Horner evaluation, coefficients highest order first
pub fn polyeval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Cost for the T8 fitting problem; zero at `CHEBYSHEV8_COEFFS`
pub fn chebyshev8_cost(trial: &Array1<f64>) -> f64 {
    let coeffs = trial.as_slice().map(|s| s.to_vec()).unwrap_or_else(|| trial.to_vec());
    let mut result = 0.0;
    let dx = 2.0 / (SAMPLES - 1) as f64;
    for i in 0..SAMPLES {
        let x = -1.0 + i as f64 * dx;
        let px = polyeval(&coeffs, x);
        if !(-1.0..=1.0).contains(&px) {
            result += (1.0 - px) * (1.0 - px);
        }
    }
    for edge in [1.2, -1.2] {
        let px = polyeval(&coeffs, edge) - polyeval(&CHEBYSHEV8_COEFFS, edge);
        if px < 0.0 {
            result += px * px;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyeval_horner() {
        assert_eq!(polyeval(&[1.0, 0.0, -1.0], 2.0), 3.0);
    }

    #[test]
    fn test_chebyshev8_exact_answer() {
        let x = Array1::from(CHEBYSHEV8_COEFFS.to_vec());
        assert!(chebyshev8_cost(&x) < 1e-10);
        assert!(chebyshev8_cost(&Array1::zeros(9)) > 0.0);
    }
}
