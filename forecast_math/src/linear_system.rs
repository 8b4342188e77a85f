//! Dense linear system solver
//!
//! Gaussian elimination with partial pivoting for the small systems that
//! come out of least-squares normal equations.

use crate::{MathError, Result};

/// Solve `matrix * x = rhs` for `x`.
///
/// Each column is pivoted on its largest-magnitude entry. When a pivot is
/// numerically zero the matching unknown is set to 0 instead of dividing,
/// so singular systems still yield a finite answer.
///
/// # Errors
/// Returns `InvalidInput` when the matrix is not square or `rhs` has the
/// wrong length.
pub fn solve_linear_system(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
    let n = rhs.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "expected a {n}x{n} matrix for {n} right-hand-side values"
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .zip(rhs)
        .map(|(row, &b)| {
            let mut r = row.clone();
            r.push(b);
            r
        })
        .collect();

    let scale = aug
        .iter()
        .flat_map(|row| row[..n].iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = f64::EPSILON * scale.max(1.0) * n as f64;

    // Forward elimination
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))
            .unwrap_or(col);
        aug.swap(col, pivot_row);

        let pivot = aug[col][col];
        if pivot.abs() <= tolerance {
            continue;
        }

        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                aug[row][k] -= factor * aug[col][k];
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let pivot = aug[i][i];
        if pivot.abs() <= tolerance {
            x[i] = 0.0;
            continue;
        }
        let sum: f64 = ((i + 1)..n).map(|j| aug[i][j] * x[j]).sum();
        x[i] = (aug[i][n] - sum) / pivot;
    }

    Ok(x)
}
