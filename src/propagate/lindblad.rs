// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lindblad master equation for the open regime.
//!
//!   dρ/dt = −i[H(t), ρ] + Σ_k γ_k (L_k ρ L_k† − ½{L_k†L_k, ρ})
//!
//! H(t) is piecewise constant over the pulse slices. Two solvers are
//! provided behind [`MasterEquationSolver`]:
//!
//! - [`ExponentialSolver`]: exact per-slice propagation with the
//!   superoperator exponential exp(𝓛_k·dt)
//! - [`Rk4Solver`]: classical 4th-order Runge–Kutta with sub-stepping
//!
//! Ref: Breuer & Petruccione, "The Theory of Open Quantum Systems" (2002), Ch. 3.
//! Ref: Press et al., "Numerical Recipes" (2007), §17.1.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::expm::matrix_exp;
use crate::error::{Error, Result};
use crate::physics::operators::{c, dagger, identity, kron};
use crate::physics::CollapseOperator;

/// Integrates a set of initial density matrices through piecewise-constant
/// slice Hamiltonians.
pub trait MasterEquationSolver: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Evolve every state in `initial` from t = 0 to t = dt·len(hamiltonians).
    fn evolve(
        &self,
        initial: &[Array2<Complex64>],
        hamiltonians: &[Array2<Complex64>],
        collapse_ops: &[CollapseOperator],
        dt: f64,
    ) -> Result<Vec<Array2<Complex64>>>;
}

/// D[L](ρ) = γ (L ρ L† − ½ L†L ρ − ½ ρ L†L)
pub fn dissipator(op: &CollapseOperator, rho: &Array2<Complex64>) -> Array2<Complex64> {
    if op.rate == 0.0 {
        return Array2::zeros(rho.raw_dim());
    }
    let l = &op.matrix;
    let l_dag = dagger(l);
    let l_dag_l = l_dag.dot(l);
    let jump = l.dot(rho).dot(&l_dag);
    let anti = l_dag_l.dot(rho) + rho.dot(&l_dag_l);
    (jump - anti * c(0.5)) * c(op.rate)
}

/// −i[H, ρ] + Σ_k D[L_k](ρ)
pub fn lindblad_rhs(
    hamiltonian: &Array2<Complex64>,
    collapse_ops: &[CollapseOperator],
    rho: &Array2<Complex64>,
) -> Array2<Complex64> {
    let commutator = (hamiltonian.dot(rho) - rho.dot(hamiltonian)) * Complex64::new(0.0, -1.0);
    collapse_ops
        .iter()
        .fold(commutator, |acc, op| acc + dissipator(op, rho))
}

/// Liouvillian superoperator in the column-stacking convention,
/// vec(A X B) = (Bᵀ ⊗ A) vec(X):
///
///   𝓛 = −i(I⊗H − Hᵀ⊗I) + Σ γ [ L̄⊗L − ½ I⊗L†L − ½ (L†L)ᵀ⊗I ]
pub fn liouvillian(
    hamiltonian: &Array2<Complex64>,
    collapse_ops: &[CollapseOperator],
) -> Array2<Complex64> {
    let d = hamiltonian.nrows();
    let eye = identity(d);
    let mut sup = (kron(&eye, hamiltonian) - kron(&hamiltonian.t().to_owned(), &eye))
        * Complex64::new(0.0, -1.0);
    for op in collapse_ops {
        if op.rate == 0.0 {
            continue;
        }
        let l = &op.matrix;
        let l_dag_l = dagger(l).dot(l);
        let term = kron(&l.mapv(|z| z.conj()), l)
            - kron(&eye, &l_dag_l) * c(0.5)
            - kron(&l_dag_l.t().to_owned(), &eye) * c(0.5);
        sup = sup + term * c(op.rate);
    }
    sup
}

/// Column-stack a d × d matrix into a d² vector.
pub fn vectorize(rho: &Array2<Complex64>) -> Array1<Complex64> {
    rho.t().iter().copied().collect()
}

/// Inverse of [`vectorize`].
pub fn unvectorize(v: &Array1<Complex64>, d: usize) -> Result<Array2<Complex64>> {
    if v.len() != d * d {
        return Err(Error::Shape(format!(
            "cannot reshape a vector of length {} into {} × {}",
            v.len(),
            d,
            d
        )));
    }
    Ok(Array2::from_shape_fn((d, d), |(i, j)| v[j * d + i]))
}

fn check_inputs(initial: &[Array2<Complex64>], hamiltonians: &[Array2<Complex64>]) -> Result<usize> {
    let Some(first) = hamiltonians.first() else {
        return Err(Error::Shape("no time slices to propagate".into()));
    };
    let d = first.nrows();
    if let Some(bad) = initial.iter().find(|rho| rho.dim() != (d, d)) {
        return Err(Error::Shape(format!(
            "density matrix shape {:?} does not match Hamiltonian dimension {}",
            bad.dim(),
            d
        )));
    }
    Ok(d)
}

/// Exact piecewise-constant solver: S = exp(𝓛_n dt) ⋯ exp(𝓛_1 dt),
/// then ρ_out = unvec(S · vec(ρ_in)) for every input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialSolver;

impl MasterEquationSolver for ExponentialSolver {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn evolve(
        &self,
        initial: &[Array2<Complex64>],
        hamiltonians: &[Array2<Complex64>],
        collapse_ops: &[CollapseOperator],
        dt: f64,
    ) -> Result<Vec<Array2<Complex64>>> {
        let d = check_inputs(initial, hamiltonians)?;
        let mut total = identity(d * d);
        for h in hamiltonians {
            let step = matrix_exp(&(liouvillian(h, collapse_ops) * c(dt)))?;
            total = step.dot(&total);
        }
        initial
            .iter()
            .map(|rho| unvectorize(&total.dot(&vectorize(rho)), d))
            .collect()
    }
}

/// RK4 on dρ/dt with `substeps` equal steps per pulse slice.
#[derive(Debug, Clone, Copy)]
pub struct Rk4Solver {
    pub substeps: usize,
}

impl Default for Rk4Solver {
    fn default() -> Self {
        Self { substeps: 8 }
    }
}

impl Rk4Solver {
    pub fn new(substeps: usize) -> Self {
        Self {
            substeps: substeps.max(1),
        }
    }
}

impl MasterEquationSolver for Rk4Solver {
    fn name(&self) -> &'static str {
        "rk4"
    }

    fn evolve(
        &self,
        initial: &[Array2<Complex64>],
        hamiltonians: &[Array2<Complex64>],
        collapse_ops: &[CollapseOperator],
        dt: f64,
    ) -> Result<Vec<Array2<Complex64>>> {
        check_inputs(initial, hamiltonians)?;
        let substeps = self.substeps.max(1);
        let h_step = dt / substeps as f64;
        let out = initial
            .iter()
            .map(|rho0| {
                let mut rho = rho0.clone();
                for h in hamiltonians {
                    for _ in 0..substeps {
                        rho = rk4_step(&rho, h, collapse_ops, h_step);
                    }
                }
                rho
            })
            .collect();
        Ok(out)
    }
}

/// One RK4 step; H is held constant over the step.
fn rk4_step(
    rho: &Array2<Complex64>,
    hamiltonian: &Array2<Complex64>,
    collapse_ops: &[CollapseOperator],
    dt: f64,
) -> Array2<Complex64> {
    let k1 = lindblad_rhs(hamiltonian, collapse_ops, rho);
    let k2 = lindblad_rhs(hamiltonian, collapse_ops, &(rho + &(&k1 * c(0.5 * dt))));
    let k3 = lindblad_rhs(hamiltonian, collapse_ops, &(rho + &(&k2 * c(0.5 * dt))));
    let k4 = lindblad_rhs(hamiltonian, collapse_ops, &(rho + &(&k3 * c(dt))));
    rho + &((k1 + k2 * c(2.0) + k3 * c(2.0) + k4) * c(dt / 6.0))
}

/// Solver selection as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Exponential,
    Rk4,
    /// No open-system capability; open models fail with a dependency error.
    None,
}

impl SolverKind {
    pub fn build(&self, rk4_substeps: usize) -> Option<Arc<dyn MasterEquationSolver>> {
        match self {
            SolverKind::Exponential => Some(Arc::new(ExponentialSolver)),
            SolverKind::Rk4 => Some(Arc::new(Rk4Solver::new(rk4_substeps))),
            SolverKind::None => None,
        }
    }
}

impl FromStr for SolverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exponential" | "expm" => Ok(SolverKind::Exponential),
            "rk4" => Ok(SolverKind::Rk4),
            "none" => Ok(SolverKind::None),
            other => Err(Error::Config(format!(
                "unknown solver '{}' (expected exponential, rk4 or none)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::operators::{cardinal_states, pauli_x, projector, trace};
    use crate::physics::PhysicalModel;
    use crate::test_utils::assert_matrix_close;
    use approx::assert_relative_eq;

    fn ground() -> Array2<Complex64> {
        projector(&cardinal_states()[0])
    }

    fn excited() -> Array2<Complex64> {
        projector(&cardinal_states()[1])
    }

    fn plus() -> Array2<Complex64> {
        projector(&cardinal_states()[2])
    }

    #[test]
    fn test_dissipator_ground_state_fixed_point() {
        let op = CollapseOperator::amplitude_damping(1e-6);
        for z in dissipator(&op, &ground()).iter() {
            assert_relative_eq!(z.norm(), 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_dissipator_excited_decays() {
        let op = CollapseOperator::amplitude_damping(1e-6);
        let d = dissipator(&op, &excited());
        assert_relative_eq!(d[[0, 0]].re, 1e6, epsilon = 1e-6);
        assert_relative_eq!(d[[1, 1]].re, -1e6, epsilon = 1e-6);
        assert_relative_eq!(trace(&d).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_liouvillian_matches_rhs() {
        let model = PhysicalModel::new(Some(30e-6), Some(20e-6));
        let ops = model.collapse_generators();
        let h = model.hamiltonian(2e6, 1e8, -3e7);
        let rho = plus() * c(0.7) + excited() * c(0.3);
        let expected = lindblad_rhs(&h, &ops, &rho);
        let got = unvectorize(&liouvillian(&h, &ops).dot(&vectorize(&rho)), 2).unwrap();
        assert_matrix_close(&got, &expected, 1e-3);
    }

    #[test]
    fn test_vectorize_round_trip_is_column_major() {
        let mut m = Array2::zeros((2, 2));
        m[[0, 1]] = c(5.0);
        let v = vectorize(&m);
        assert_eq!(v[2], c(5.0));
        assert_eq!(unvectorize(&v, 2).unwrap(), m);
        assert!(unvectorize(&v, 3).is_err());
    }

    #[test]
    fn test_t1_decay_matches_analytic() {
        let t1 = 1e-6;
        let ops = PhysicalModel::new(Some(t1), None).collapse_generators();
        let n = 100;
        let dt = 1e-8;
        let hs = vec![Array2::<Complex64>::zeros((2, 2)); n];
        let expected = (-(n as f64) * dt / t1).exp();
        for solver in [
            &ExponentialSolver as &dyn MasterEquationSolver,
            &Rk4Solver::new(4),
        ] {
            let out = solver.evolve(&[excited()], &hs, &ops, dt).unwrap();
            assert_relative_eq!(out[0][[1, 1]].re, expected, max_relative = 1e-8);
            assert_relative_eq!(trace(&out[0]).re, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_coherence_decays_at_t2() {
        let (t1, t2) = (10e-6, 2e-6);
        let ops = PhysicalModel::new(Some(t1), Some(t2)).collapse_generators();
        let n = 50;
        let dt = 2e-8;
        let t = n as f64 * dt;
        let hs = vec![Array2::<Complex64>::zeros((2, 2)); n];
        let out = ExponentialSolver.evolve(&[plus()], &hs, &ops, dt).unwrap();
        assert_relative_eq!(out[0][[0, 1]].re, 0.5 * (-t / t2).exp(), max_relative = 1e-9);
        assert_relative_eq!(out[0][[1, 1]].re, 0.5 * (-t / t1).exp(), max_relative = 1e-9);
    }

    #[test]
    fn test_solvers_agree_under_drive() {
        let model = PhysicalModel::new(Some(5e-6), Some(4e-6));
        let ops = model.collapse_generators();
        let hs: Vec<_> = (0..40)
            .map(|k| model.hamiltonian(1e6, 6e7 * (k as f64 * 0.1).sin(), 1e7))
            .collect();
        let inputs: Vec<_> = cardinal_states().iter().map(projector).collect();
        let a = ExponentialSolver.evolve(&inputs, &hs, &ops, 1e-9).unwrap();
        let b = Rk4Solver::new(4).evolve(&inputs, &hs, &ops, 1e-9).unwrap();
        for (ra, rb) in a.iter().zip(&b) {
            assert_matrix_close(ra, rb, 1e-8);
        }
    }

    #[test]
    fn test_closed_limit_matches_unitary() {
        let h = pauli_x() * c(0.5 * 1e8);
        let dt = 1e-9;
        let out = ExponentialSolver.evolve(&[ground()], &[h.clone()], &[], dt).unwrap();
        let u = matrix_exp(&(h * Complex64::new(0.0, -dt))).unwrap();
        let expected = u.dot(&ground()).dot(&dagger(&u));
        assert_matrix_close(&out[0], &expected, 1e-12);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let hs = vec![Array2::<Complex64>::zeros((2, 2))];
        let bad = Array2::<Complex64>::zeros((3, 3));
        assert!(ExponentialSolver.evolve(&[bad], &hs, &[], 1e-9).is_err());
        assert!(Rk4Solver::default().evolve(&[ground()], &[], &[], 1e-9).is_err());
    }

    #[test]
    fn test_solver_kind() {
        assert_eq!("RK4".parse::<SolverKind>().unwrap(), SolverKind::Rk4);
        assert!("euler".parse::<SolverKind>().is_err());
        assert!(SolverKind::None.build(8).is_none());
        assert_eq!(SolverKind::Rk4.build(8).unwrap().name(), "rk4");
    }
}
