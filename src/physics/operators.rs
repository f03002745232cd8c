// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-qubit operator basis and small complex-matrix helpers.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

#[inline]
pub(crate) fn c(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// σx = [[0, 1], [1, 0]]
pub fn pauli_x() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 1]] = c(1.0);
    m[[1, 0]] = c(1.0);
    m
}

/// σy = [[0, -i], [i, 0]]
pub fn pauli_y() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 1]] = Complex64::new(0.0, -1.0);
    m[[1, 0]] = Complex64::new(0.0, 1.0);
    m
}

/// σz = [[1, 0], [0, -1]]
pub fn pauli_z() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 0]] = c(1.0);
    m[[1, 1]] = c(-1.0);
    m
}

/// σ⁻ = |0⟩⟨1|
pub fn sigma_minus() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 1]] = c(1.0);
    m
}

pub fn identity(d: usize) -> Array2<Complex64> {
    Array2::from_diag_elem(d, c(1.0))
}

/// Conjugate transpose (dagger) of a matrix.
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

pub fn trace(m: &Array2<Complex64>) -> Complex64 {
    (0..m.nrows().min(m.ncols())).map(|i| m[[i, i]]).sum()
}

/// Kronecker product A ⊗ B.
pub fn kron(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    let mut out = Array2::zeros((ar * br, ac * bc));
    for i in 0..ar {
        for j in 0..ac {
            let aij = a[[i, j]];
            for k in 0..br {
                for l in 0..bc {
                    out[[i * br + k, j * bc + l]] = aij * b[[k, l]];
                }
            }
        }
    }
    out
}

/// Pure-state density matrix |ψ⟩⟨ψ|.
pub fn projector(psi: &Array1<Complex64>) -> Array2<Complex64> {
    let n = psi.len();
    Array2::from_shape_fn((n, n), |(i, j)| psi[i] * psi[j].conj())
}

/// The fixed input-state basis used for open-system characterisation:
/// |0⟩, |1⟩, |+⟩ = (|0⟩+|1⟩)/√2, |+i⟩ = (|0⟩+i|1⟩)/√2, in that order.
pub fn cardinal_states() -> [Array1<Complex64>; 4] {
    let h = std::f64::consts::FRAC_1_SQRT_2;
    [
        Array1::from(vec![c(1.0), c(0.0)]),
        Array1::from(vec![c(0.0), c(1.0)]),
        Array1::from(vec![c(h), c(h)]),
        Array1::from(vec![c(h), Complex64::new(0.0, h)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_matrix_close;

    #[test]
    fn test_paulis_anticommute() {
        let xy = pauli_x().dot(&pauli_y());
        let yx = pauli_y().dot(&pauli_x());
        let sum = &xy + &yx;
        assert_matrix_close(&sum, &Array2::zeros((2, 2)), 1e-15);
        // σx σy = i σz
        assert_matrix_close(&xy, &(pauli_z() * Complex64::new(0.0, 1.0)), 1e-15);
    }

    #[test]
    fn test_dagger() {
        let mut m = Array2::zeros((2, 2));
        m[[0, 1]] = Complex64::new(1.0, 2.0);
        m[[1, 0]] = Complex64::new(3.0, 4.0);
        let d = dagger(&m);
        assert_eq!(d[[0, 1]], Complex64::new(3.0, -4.0));
        assert_eq!(d[[1, 0]], Complex64::new(1.0, -2.0));
    }

    #[test]
    fn test_kron_identity_shape() {
        let k = kron(&identity(2), &pauli_z());
        assert_eq!(k.dim(), (4, 4));
        assert_eq!(k[[0, 0]], c(1.0));
        assert_eq!(k[[1, 1]], c(-1.0));
        assert_eq!(k[[2, 2]], c(1.0));
        assert_eq!(k[[3, 3]], c(-1.0));
    }

    #[test]
    fn test_cardinal_states_are_normalized() {
        for psi in cardinal_states() {
            let norm: f64 = psi.iter().map(|z| z.norm_sqr()).sum();
            assert!((norm - 1.0).abs() < 1e-14);
            let rho = projector(&psi);
            assert!((trace(&rho).re - 1.0).abs() < 1e-14);
        }
    }
}
