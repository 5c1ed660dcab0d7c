use ndarray::Array1;
use rand::Rng;

/// Uniform crossover; coordinate `jrand` always comes from the mutant.
pub(crate) fn binomial_crossover<R: Rng + ?Sized>(
    target: &Array1<f64>,
    mutant: &Array1<f64>,
    cr: f64,
    rng: &mut R,
) -> Array1<f64> {
    let n = target.len();
    let jrand = rng.random_range(0..n);
    let mut trial = target.clone();
    for j in 0..n {
        if j == jrand || rng.random::<f64>() < cr {
            trial[j] = mutant[j];
        }
    }
    trial
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_cr_zero_takes_exactly_one_coordinate() {
        let mut rng = StdRng::seed_from_u64(11);
        let target = array![0.0, 0.0, 0.0, 0.0];
        let mutant = array![1.0, 1.0, 1.0, 1.0];
        for _ in 0..20 {
            let trial = binomial_crossover(&target, &mutant, 0.0, &mut rng);
            assert_eq!(trial.sum(), 1.0);
        }
        let trial = binomial_crossover(&target, &mutant, 1.0, &mut rng);
        assert_eq!(trial, mutant);
    }
}
