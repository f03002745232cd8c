// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Seeded differential evolution for bound-constrained minimization.
//!
//! Strategy `best1bin`: the mutant is x_best + F·(x_r0 − x_r1) with two
//! distinct random members, crossed over binomially with the current
//! member. F is redrawn uniformly from the mutation range once per
//! generation (dither). The population lives in the unit cube and is
//! mapped onto the box for evaluation; trial vectors are clipped back into
//! the cube. Members are replaced as soon as a trial is at least as good.
//!
//! Ref: Storn & Price, "Differential Evolution" (1997), J. Global Optim. 11, 341.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::validation::{validate_count, validate_interval};

/// Optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub max_iterations: usize,
    /// Population size as a multiple of the dimension.
    pub population_size: usize,
    /// Relative convergence tolerance on the population energies.
    pub tolerance: f64,
    /// Absolute convergence tolerance.
    pub atol: f64,
    /// Dither range for the mutation factor.
    pub mutation: (f64, f64),
    pub recombination: f64,
    pub seed: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 120,
            population_size: 18,
            tolerance: 1e-4,
            atol: 0.0,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            seed: 0,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<()> {
        validate_count("max_iterations", self.max_iterations)?;
        validate_count("population_size", self.population_size)?;
        validate_interval("mutation", self.mutation.0, self.mutation.1)?;
        if !(0.0..=2.0).contains(&self.mutation.0) || self.mutation.1 > 2.0 {
            return Err(Error::Config(format!(
                "mutation range must lie in [0, 2], got {:?}",
                self.mutation
            )));
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(Error::Config(format!(
                "recombination must lie in [0, 1], got {}",
                self.recombination
            )));
        }
        if !(self.tolerance >= 0.0 && self.atol >= 0.0) {
            return Err(Error::Config("convergence tolerances must be non-negative".into()));
        }
        Ok(())
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionResult {
    pub x: Vec<f64>,
    pub fun: f64,
    /// Generations run.
    pub nit: usize,
    /// Objective evaluations.
    pub nfev: usize,
    pub converged: bool,
    /// Best energy in the initial population.
    pub initial_best: f64,
}

impl EvolutionResult {
    /// Whether the search beat its initial population.
    pub fn improved(&self) -> bool {
        self.fun < self.initial_best
    }
}

/// Latin-hypercube sample of `n` points in the unit cube of dimension `dim`.
fn latin_hypercube(n: usize, dim: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f64>> {
    let seg = 1.0 / n as f64;
    let mut pop = vec![vec![0.0; dim]; n];
    for j in 0..dim {
        let mut strata: Vec<usize> = (0..n).collect();
        strata.shuffle(rng);
        for (member, s) in pop.iter_mut().zip(strata) {
            member[j] = (s as f64 + rng.gen::<f64>()) * seg;
        }
    }
    pop
}

fn to_box(u: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    u.iter()
        .zip(bounds)
        .map(|(v, (lo, hi))| lo + v * (hi - lo))
        .collect()
}

fn to_unit(x: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(v, (lo, hi))| {
            if hi > lo {
                ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
            } else {
                0.5
            }
        })
        .collect()
}

fn spread_converged(energies: &[f64], tol: f64, atol: f64) -> bool {
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let var = energies.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / n;
    var.sqrt() <= atol + tol * mean.abs()
}

/// Minimize `objective` over the box `bounds`.
///
/// Evaluation is strictly sequential so the result depends only on the
/// seed. `initial_guess`, if given, replaces the first member of the
/// initial population (clipped into the box).
pub fn differential_evolution<F>(
    mut objective: F,
    bounds: &[(f64, f64)],
    config: &EvolutionConfig,
    initial_guess: Option<&[f64]>,
) -> Result<EvolutionResult>
where
    F: FnMut(&[f64]) -> f64,
{
    config.validate()?;
    let dim = bounds.len();
    if dim == 0 {
        return Err(Error::Config("cannot optimize over an empty box".into()));
    }
    for (k, (lo, hi)) in bounds.iter().enumerate() {
        validate_interval(&format!("bound[{}]", k), *lo, *hi)?;
    }
    let n_pop = (config.population_size * dim).max(5);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut pop = latin_hypercube(n_pop, dim, &mut rng);
    if let Some(x0) = initial_guess {
        if x0.len() != dim {
            return Err(Error::Shape(format!(
                "initial guess has {} entries for a {}-dimensional box",
                x0.len(),
                dim
            )));
        }
        pop[0] = to_unit(x0, bounds);
    }

    let mut nfev = 0;
    let mut energies: Vec<f64> = pop
        .iter()
        .map(|u| {
            nfev += 1;
            objective(&to_box(u, bounds))
        })
        .collect();
    let mut best = argmin(&energies);
    let initial_best = energies[best];
    debug!(n_pop, dim, initial_best, "Differential evolution initialised");

    let mut converged = false;
    let mut nit = 0;
    for generation in 0..config.max_iterations {
        nit = generation + 1;
        let scale = if config.mutation.1 > config.mutation.0 {
            rng.gen_range(config.mutation.0..config.mutation.1)
        } else {
            config.mutation.0
        };

        for i in 0..n_pop {
            let (r0, r1) = pick_two(n_pop, i, &mut rng);
            let fill = rng.gen_range(0..dim);
            let trial: Vec<f64> = (0..dim)
                .map(|j| {
                    if j == fill || rng.gen::<f64>() < config.recombination {
                        (pop[best][j] + scale * (pop[r0][j] - pop[r1][j])).clamp(0.0, 1.0)
                    } else {
                        pop[i][j]
                    }
                })
                .collect();

            let energy = objective(&to_box(&trial, bounds));
            nfev += 1;
            if energy <= energies[i] {
                pop[i] = trial;
                energies[i] = energy;
                if energy < energies[best] {
                    best = i;
                }
            }
        }

        if generation % 10 == 0 {
            debug!(generation, best = energies[best], "Differential evolution progress");
        }
        if spread_converged(&energies, config.tolerance, config.atol) {
            converged = true;
            break;
        }
    }

    Ok(EvolutionResult {
        x: to_box(&pop[best], bounds),
        fun: energies[best],
        nit,
        nfev,
        converged,
        initial_best,
    })
}

fn argmin(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Two distinct indices in 0..n, both different from `exclude`.
fn pick_two(n: usize, exclude: usize, rng: &mut ChaCha8Rng) -> (usize, usize) {
    let mut draw = |other: Option<usize>| loop {
        let k = rng.gen_range(0..n);
        if k != exclude && Some(k) != other {
            return k;
        }
    };
    let a = draw(None);
    let b = draw(Some(a));
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| (v - 0.3) * (v - 0.3)).sum()
    }

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    fn config(seed: u64) -> EvolutionConfig {
        EvolutionConfig {
            max_iterations: 300,
            population_size: 15,
            tolerance: 1e-10,
            seed,
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn test_sphere_minimum() {
        let bounds = vec![(-1.0, 1.0); 3];
        let r = differential_evolution(sphere, &bounds, &config(1), None).unwrap();
        for v in &r.x {
            assert_relative_eq!(*v, 0.3, epsilon = 1e-3);
        }
        assert!(r.improved());
        assert!(r.nfev > r.nit);
    }

    #[test]
    fn test_rosenbrock() {
        let bounds = [(-2.0, 2.0), (-2.0, 2.0)];
        let r = differential_evolution(rosenbrock, &bounds, &config(5), None).unwrap();
        assert!(r.fun < 1e-4, "f = {}", r.fun);
    }

    #[test]
    fn test_same_seed_same_result() {
        let bounds = vec![(-1.0, 1.0); 2];
        let cfg = EvolutionConfig {
            max_iterations: 20,
            ..config(9)
        };
        let a = differential_evolution(sphere, &bounds, &cfg, None).unwrap();
        let b = differential_evolution(sphere, &bounds, &cfg, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_points_stay_in_box() {
        let bounds = [(0.0, 1.0), (10.0, 20.0)];
        let mut outside = 0;
        let r = differential_evolution(
            |x: &[f64]| {
                if !(0.0..=1.0).contains(&x[0]) || !(10.0..=20.0).contains(&x[1]) {
                    outside += 1;
                }
                -x[0] - x[1]
            },
            &bounds,
            &config(2),
            None,
        )
        .unwrap();
        assert_eq!(outside, 0);
        assert_relative_eq!(r.x[1], 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_initial_guess_is_evaluated() {
        let bounds = vec![(-1.0, 1.0); 2];
        let cfg = EvolutionConfig {
            max_iterations: 1,
            ..config(3)
        };
        let r = differential_evolution(sphere, &bounds, &cfg, Some(&[0.3, 0.3])).unwrap();
        assert_relative_eq!(r.initial_best, 0.0, epsilon = 1e-15);
        assert!(!r.improved());
        assert!(differential_evolution(sphere, &bounds, &cfg, Some(&[0.3])).is_err());
    }

    #[test]
    fn test_flat_objective_converges_immediately() {
        let bounds = vec![(-1.0, 1.0); 2];
        let r = differential_evolution(|_: &[f64]| 1.0, &bounds, &config(0), None).unwrap();
        assert!(r.converged);
        assert_eq!(r.nit, 1);
    }

    #[test]
    fn test_invalid_config() {
        let bounds = vec![(-1.0, 1.0)];
        let bad = EvolutionConfig {
            recombination: 1.5,
            ..EvolutionConfig::default()
        };
        assert!(differential_evolution(sphere, &bounds, &bad, None).is_err());
        assert!(differential_evolution(sphere, &[(1.0, -1.0)], &config(0), None).is_err());
    }
}
