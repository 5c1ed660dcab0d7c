//! Trial-vector generation.
//!
//! A [`Strategy`] turns the current population into one trial vector for a
//! target member. It never mutates the population and draws all randomness
//! from the solver-owned generator it is handed, so a run is reproducible
//! from its seed.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::argmin;
use crate::crossover_binomial::binomial_crossover;
use crate::crossover_exponential::exponential_crossover;
use crate::distinct_indices::distinct_indices;
use crate::error::{Result, SolverError};
use crate::mutant_best1::mutant_best1;
use crate::mutant_best2::mutant_best2;
use crate::mutant_current_to_best1::mutant_current_to_best1;
use crate::mutant_rand_to_best1::mutant_rand_to_best1;
use crate::mutant_rand1::mutant_rand1;
use crate::mutant_rand2::mutant_rand2;

/// Produces a trial vector for population member `target`.
pub trait Strategy: Send + Sync {
    fn generate(
        &self,
        population: &Array2<f64>,
        energies: &Array1<f64>,
        target: usize,
        rng: &mut StdRng,
    ) -> Result<Array1<f64>>;

    /// Number of distinct members, other than the target, sampled per trial.
    fn required_members(&self) -> usize;

    /// Smallest accepted population: the target, the sampled members and one more.
    fn min_population(&self) -> usize {
        self.required_members() + 2
    }

    fn name(&self) -> String;
}

/// Fails with [`SolverError::InsufficientPopulation`] when `npop` is below
/// the strategy's minimum population.
pub fn check_population<S: Strategy + ?Sized>(strategy: &S, npop: usize) -> Result<()> {
    let required = strategy.min_population();
    if npop < required {
        return Err(SolverError::InsufficientPopulation { required, available: npop });
    }
    Ok(())
}

/// Mutation setting: either a fixed factor or a uniform range (dithering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// Fixed mutation factor F in [0, 2]
    Factor(f64),
    /// Dithering range [min, max) with 0 <= min <= max <= 2, resampled per trial
    Range { min: f64, max: f64 },
}

impl Default for Mutation {
    fn default() -> Self {
        Mutation::Factor(0.8)
    }
}

impl Mutation {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Mutation::Factor(f) => f,
            Mutation::Range { min, max } if min < max => rng.random_range(min..max),
            Mutation::Range { min, .. } => min,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |f: f64| (0.0..=2.0).contains(&f);
        match *self {
            Mutation::Factor(factor) if !in_range(factor) => {
                Err(SolverError::InvalidMutationFactor { factor })
            }
            Mutation::Range { min, max } => {
                if !in_range(min) {
                    Err(SolverError::InvalidMutationFactor { factor: min })
                } else if !in_range(max) || max < min {
                    Err(SolverError::InvalidMutationFactor { factor: max })
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

/// Crossover type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    /// Binomial (uniform) crossover
    Binomial,
    /// Exponential crossover
    Exponential,
}

/// Differential Evolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StrategyVariant {
    Best1Bin,
    Best1Exp,
    Rand1Bin,
    Rand1Exp,
    Rand2Bin,
    Rand2Exp,
    CurrentToBest1Bin,
    CurrentToBest1Exp,
    Best2Bin,
    Best2Exp,
    RandToBest1Bin,
    RandToBest1Exp,
}

impl StrategyVariant {
    pub const ALL: [StrategyVariant; 12] = [
        StrategyVariant::Best1Bin,
        StrategyVariant::Best1Exp,
        StrategyVariant::Rand1Bin,
        StrategyVariant::Rand1Exp,
        StrategyVariant::Rand2Bin,
        StrategyVariant::Rand2Exp,
        StrategyVariant::CurrentToBest1Bin,
        StrategyVariant::CurrentToBest1Exp,
        StrategyVariant::Best2Bin,
        StrategyVariant::Best2Exp,
        StrategyVariant::RandToBest1Bin,
        StrategyVariant::RandToBest1Exp,
    ];

    pub fn crossover(&self) -> Crossover {
        use StrategyVariant::*;
        match self {
            Best1Bin | Rand1Bin | Rand2Bin | CurrentToBest1Bin | Best2Bin | RandToBest1Bin => {
                Crossover::Binomial
            }
            _ => Crossover::Exponential,
        }
    }

    /// Distinct non-target members the mutation formula samples.
    pub fn required_members(&self) -> usize {
        use StrategyVariant::*;
        match self {
            Best1Bin | Best1Exp | CurrentToBest1Bin | CurrentToBest1Exp => 2,
            Rand1Bin | Rand1Exp | RandToBest1Bin | RandToBest1Exp => 3,
            Best2Bin | Best2Exp => 4,
            Rand2Bin | Rand2Exp => 5,
        }
    }

    pub fn min_population(&self) -> usize {
        self.required_members() + 2
    }

    pub fn as_str(&self) -> &'static str {
        use StrategyVariant::*;
        match self {
            Best1Bin => "best1bin",
            Best1Exp => "best1exp",
            Rand1Bin => "rand1bin",
            Rand1Exp => "rand1exp",
            Rand2Bin => "rand2bin",
            Rand2Exp => "rand2exp",
            CurrentToBest1Bin => "currenttobest1bin",
            CurrentToBest1Exp => "currenttobest1exp",
            Best2Bin => "best2bin",
            Best2Exp => "best2exp",
            RandToBest1Bin => "randtobest1bin",
            RandToBest1Exp => "randtobest1exp",
        }
    }
}

impl FromStr for StrategyVariant {
    type Err = SolverError;
    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim().to_lowercase();
        match t.as_str() {
            "best1bin" | "best1" => Ok(StrategyVariant::Best1Bin),
            "best1exp" => Ok(StrategyVariant::Best1Exp),
            "rand1bin" | "rand1" => Ok(StrategyVariant::Rand1Bin),
            "rand1exp" => Ok(StrategyVariant::Rand1Exp),
            "rand2bin" | "rand2" => Ok(StrategyVariant::Rand2Bin),
            "rand2exp" => Ok(StrategyVariant::Rand2Exp),
            "currenttobest1bin" | "current-to-best1bin" | "current_to_best1bin" => {
                Ok(StrategyVariant::CurrentToBest1Bin)
            }
            "currenttobest1exp" | "current-to-best1exp" | "current_to_best1exp" => {
                Ok(StrategyVariant::CurrentToBest1Exp)
            }
            "best2bin" | "best2" => Ok(StrategyVariant::Best2Bin),
            "best2exp" => Ok(StrategyVariant::Best2Exp),
            "randtobest1bin" | "rand-to-best1bin" | "rand_to_best1bin" => {
                Ok(StrategyVariant::RandToBest1Bin)
            }
            "randtobest1exp" | "rand-to-best1exp" | "rand_to_best1exp" => {
                Ok(StrategyVariant::RandToBest1Exp)
            }
            _ => Err(SolverError::Configuration(format!("unknown strategy: {}", s))),
        }
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StrategyVariant {
    type Error = SolverError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<StrategyVariant> for String {
    fn from(v: StrategyVariant) -> Self {
        v.as_str().to_string()
    }
}

/// The classic DE/x/y/z family: mutation of sampled members followed by crossover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialStrategy {
    pub variant: StrategyVariant,
    pub mutation: Mutation,
    /// Crossover rate CR in [0, 1]
    pub recombination: f64,
}

impl DifferentialStrategy {
    pub fn new(variant: StrategyVariant, mutation: Mutation, recombination: f64) -> Result<Self> {
        mutation.validate()?;
        if !(0.0..=1.0).contains(&recombination) {
            return Err(SolverError::InvalidCrossoverRate { rate: recombination });
        }
        Ok(Self { variant, mutation, recombination })
    }

    /// Parse the variant name and validate the parameters.
    pub fn parse(name: &str, mutation: Mutation, recombination: f64) -> Result<Self> {
        Self::new(name.parse()?, mutation, recombination)
    }
}

impl Strategy for DifferentialStrategy {
    fn generate(
        &self,
        population: &Array2<f64>,
        energies: &Array1<f64>,
        target: usize,
        rng: &mut StdRng,
    ) -> Result<Array1<f64>> {
        let npop = population.nrows();
        check_population(self, npop)?;
        if target >= npop {
            return Err(SolverError::Configuration(format!(
                "target index {} outside population of {}",
                target, npop
            )));
        }
        if energies.len() != npop {
            return Err(SolverError::dimension("energies", npop, energies.len()));
        }

        let f = self.mutation.sample(rng);
        let r = distinct_indices(target, self.required_members(), npop, rng);
        let best = argmin(energies).0;

        use StrategyVariant::*;
        let mutant = match self.variant {
            Best1Bin | Best1Exp => mutant_best1(population, best, &r, f),
            Rand1Bin | Rand1Exp => mutant_rand1(population, &r, f),
            Rand2Bin | Rand2Exp => mutant_rand2(population, &r, f),
            CurrentToBest1Bin | CurrentToBest1Exp => {
                mutant_current_to_best1(population, target, best, &r, f)
            }
            Best2Bin | Best2Exp => mutant_best2(population, best, &r, f),
            RandToBest1Bin | RandToBest1Exp => mutant_rand_to_best1(population, best, &r, f),
        };

        let current = population.row(target).to_owned();
        Ok(match self.variant.crossover() {
            Crossover::Binomial => binomial_crossover(&current, &mutant, self.recombination, rng),
            Crossover::Exponential => {
                exponential_crossover(&current, &mutant, self.recombination, rng)
            }
        })
    }

    fn required_members(&self) -> usize {
        self.variant.required_members()
    }

    fn min_population(&self) -> usize {
        self.variant.min_population()
    }

    fn name(&self) -> String {
        self.variant.to_string()
    }
}
