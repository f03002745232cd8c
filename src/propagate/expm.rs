// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Matrix exponential via scaling-and-squaring with a Padé(13) approximant.
//!
//! Higham (2005), "The Scaling and Squaring Method for the Matrix
//! Exponential Revisited", SIAM J. Matrix Anal. Appl. 26(4), 1179.
//!
//! Used for 2 × 2 slice propagators and 4 × 4 Liouvillian superoperators,
//! so everything is dense and unblocked.

use ndarray::{s, Array2};
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::physics::operators::{c, identity};

/// Largest 1-norm for which Padé(13) is accurate without scaling
/// (Higham, Table 10.2).
const THETA_13: f64 = 5.37;

/// Padé(13,13) coefficients b_0 … b_13.
const PADE_COEFFS: [f64; 14] = [
    1.0,
    0.5,
    0.12,
    1.833_333_333_333_333_4e-2,
    1.992_753_623_188_405_8e-3,
    1.630_434_782_608_696e-4,
    1.035_196_687_401_6e-5,
    5.175_983_437_008_01e-7,
    2.043_151_356_652_5e-8,
    6.306_022_705_717_593e-10,
    1.483_770_048_404_14e-11,
    2.529_153_491_597_966e-13,
    2.810_170_546_219_962_4e-15,
    1.544_049_750_670_309e-17,
];

/// exp(A) for a square complex matrix.
///
/// # Errors
/// [`Error::Shape`] if `a` is not square, has non-finite entries, or the
/// Padé denominator is numerically singular.
pub fn matrix_exp(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let (n, m) = a.dim();
    if n != m {
        return Err(Error::Shape(format!(
            "matrix exponential needs a square matrix, got {} × {}",
            n, m
        )));
    }
    if a.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(Error::Shape("matrix exponential of non-finite input".into()));
    }
    match n {
        0 => return Ok(Array2::zeros((0, 0))),
        1 => return Ok(Array2::from_elem((1, 1), a[[0, 0]].exp())),
        _ => {}
    }

    let norm = one_norm(a);
    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as i32
    } else {
        0
    };

    let scaled = a * c(2f64.powi(-squarings));
    let mut result = pade13(&scaled)?;
    for _ in 0..squarings {
        result = result.dot(&result);
    }
    Ok(result)
}

/// r13(A) = (V − U)⁻¹ (V + U), with U odd and V even in A.
fn pade13(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let b = &PADE_COEFFS;
    let eye = identity(a.nrows());
    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    let u_inner = (&a6 * c(b[13]) + &a4 * c(b[11]) + &a2 * c(b[9])).dot(&a6)
        + &a6 * c(b[7])
        + &a4 * c(b[5])
        + &a2 * c(b[3])
        + &eye * c(b[1]);
    let u = a.dot(&u_inner);

    let v = (&a6 * c(b[12]) + &a4 * c(b[10]) + &a2 * c(b[8])).dot(&a6)
        + &a6 * c(b[6])
        + &a4 * c(b[4])
        + &a2 * c(b[2])
        + &eye * c(b[0]);

    solve(&v - &u, &v + &u)
}

/// Solve A·X = B by Gaussian elimination with partial pivoting.
fn solve(a: Array2<Complex64>, b: Array2<Complex64>) -> Result<Array2<Complex64>> {
    let n = a.nrows();
    let m = b.ncols();
    let mut aug = Array2::zeros((n, n + m));
    aug.slice_mut(s![.., ..n]).assign(&a);
    aug.slice_mut(s![.., n..]).assign(&b);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| aug[[i, col]].norm().total_cmp(&aug[[j, col]].norm()))
            .unwrap_or(col);
        if pivot_row != col {
            for j in 0..(n + m) {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        if pivot.norm() < 1e-15 {
            return Err(Error::Shape("singular Padé denominator".into()));
        }
        for row in (col + 1)..n {
            let factor = aug[[row, col]] / pivot;
            for j in col..(n + m) {
                let v = aug[[col, j]];
                aug[[row, j]] -= factor * v;
            }
        }
    }

    let mut x = Array2::<Complex64>::zeros((n, m));
    for row in (0..n).rev() {
        let pivot = aug[[row, row]];
        for j in 0..m {
            let mut acc = aug[[row, n + j]];
            for k in (row + 1)..n {
                acc -= aug[[row, k]] * x[[k, j]];
            }
            x[[row, j]] = acc / pivot;
        }
    }
    Ok(x)
}

/// Max absolute column sum.
fn one_norm(a: &Array2<Complex64>) -> f64 {
    a.columns()
        .into_iter()
        .map(|col| col.iter().map(|z| z.norm()).sum::<f64>())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::operators::{dagger, pauli_x, pauli_y};
    use crate::test_utils::assert_matrix_close;
    use std::f64::consts::PI;

    #[test]
    fn test_zero_is_identity() {
        let result = matrix_exp(&Array2::zeros((4, 4))).unwrap();
        assert_matrix_close(&result, &identity(4), 1e-14);
    }

    #[test]
    fn test_diagonal() {
        let mut a = Array2::zeros((2, 2));
        a[[0, 0]] = c(1.0);
        a[[1, 1]] = c(-2.0);
        let result = matrix_exp(&a).unwrap();
        assert!((result[[0, 0]] - c(1f64.exp())).norm() < 1e-12);
        assert!((result[[1, 1]] - c((-2f64).exp())).norm() < 1e-12);
        assert!(result[[0, 1]].norm() < 1e-14);
    }

    #[test]
    fn test_pauli_rotation() {
        // exp(−iθ/2 σx)
        let theta = PI / 3.0;
        let a = pauli_x() * Complex64::new(0.0, -theta / 2.0);
        let result = matrix_exp(&a).unwrap();
        let (s, co) = (theta / 2.0).sin_cos();
        assert!((result[[0, 0]] - c(co)).norm() < 1e-12);
        assert!((result[[0, 1]] - Complex64::new(0.0, -s)).norm() < 1e-12);
    }

    #[test]
    fn test_large_norm_is_unitary() {
        // ‖A‖ ≫ θ13 forces several squarings.
        let a = pauli_y() * Complex64::new(0.0, -250.0);
        let u = matrix_exp(&a).unwrap();
        assert_matrix_close(&dagger(&u).dot(&u), &identity(2), 1e-9);
        let (s, co) = 250f64.sin_cos();
        assert!((u[[0, 0]] - c(co)).norm() < 1e-9);
        assert!((u[[1, 0]] - c(s)).norm() < 1e-9);
    }

    #[test]
    fn test_scalar() {
        let a = Array2::from_elem((1, 1), Complex64::new(0.5, 2.0));
        let result = matrix_exp(&a).unwrap();
        assert!((result[[0, 0]] - Complex64::new(0.5, 2.0).exp()).norm() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(matrix_exp(&Array2::zeros((2, 3))), Err(Error::Shape(_))));
        let mut a = Array2::zeros((2, 2));
        a[[0, 1]] = c(f64::NAN);
        assert!(matrix_exp(&a).is_err());
    }
}
