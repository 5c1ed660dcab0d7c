use ndarray::Array2;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::bounds::Bounds;

/// Latin hypercube population: every dimension is split into `npop` strata,
/// one sample per stratum, strata shuffled independently per dimension.
pub(crate) fn init_latin_hypercube<R: Rng + ?Sized>(
    npop: usize,
    bounds: &Bounds,
    rng: &mut R,
) -> Array2<f64> {
    let n = bounds.dim();
    let (lower, upper) = (bounds.lower(), bounds.upper());
    let mut samples = Array2::<f64>::zeros((npop, n));
    for j in 0..n {
        if !bounds.is_free(j) {
            samples.column_mut(j).fill(lower[j]);
            continue;
        }
        let mut strata: Vec<f64> =
            (0..npop).map(|k| (k as f64 + rng.random::<f64>()) / npop as f64).collect();
        strata.shuffle(rng);
        for (i, u) in strata.into_iter().enumerate() {
            samples[(i, j)] = lower[j] + u * (upper[j] - lower[j]);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_one_sample_per_stratum() {
        let bounds = Bounds::from_pairs(&[(0.0, 10.0), (-1.0, 1.0), (3.0, 3.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let pop = init_latin_hypercube(10, &bounds, &mut rng);
        let mut strata: Vec<usize> = pop.column(0).iter().map(|v| v.floor() as usize).collect();
        strata.sort_unstable();
        assert_eq!(strata, (0..10).collect::<Vec<_>>());
        assert!(pop.column(2).iter().all(|&v| v == 3.0));
        assert!(pop.column(1).iter().all(|&v| (-1.0..=1.0).contains(&v)));
    }
}
