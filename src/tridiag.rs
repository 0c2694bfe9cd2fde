use nalgebra::{DMatrix, DVector};

use crate::error::{RichardsError, Result};

// Tridiagonal system `lower[i] x[i-1] + main[i] x[i] + upper[i] x[i+1] = rhs[i]`
// `lower[0]` and `upper[n-1]` lie outside the matrix and are ignored
#[derive(Clone, Debug, PartialEq)]
pub struct LinearSystem {
    pub lower: DVector<f64>,
    pub main: DVector<f64>,
    pub upper: DVector<f64>,
    pub rhs: DVector<f64>,
}

impl LinearSystem {
    pub fn zeros(n: usize) -> Self {
        LinearSystem {
            lower: DVector::zeros(n),
            main: DVector::zeros(n),
            upper: DVector::zeros(n),
            rhs: DVector::zeros(n),
        }
    }

    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    pub fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let n = self.len();
        DVector::from_fn(n, |i, _| {
            let mut y = self.main[i] * x[i];
            if i > 0 {
                y += self.lower[i] * x[i - 1];
            }
            if i + 1 < n {
                y += self.upper[i] * x[i + 1];
            }
            y
        })
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.len();
        let mut a = DMatrix::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = self.main[i];
            if i > 0 {
                a[(i, i - 1)] = self.lower[i];
            }
            if i + 1 < n {
                a[(i, i + 1)] = self.upper[i];
            }
        }
        a
    }

    // Solve with the system's own right-hand side
    pub fn solve(&self, pivot_epsilon: f64) -> Result<DVector<f64>> {
        thomas_solve(&self.lower, &self.main, &self.upper, &self.rhs, pivot_epsilon)
    }
}

/// Thomas algorithm: forward elimination then back substitution.
///
/// Fails with [`RichardsError::SingularSystem`] when a pivot is not finite
/// or its magnitude is below `pivot_epsilon`.
pub fn thomas_solve(
    lower: &DVector<f64>,
    main: &DVector<f64>,
    upper: &DVector<f64>,
    rhs: &DVector<f64>,
    pivot_epsilon: f64,
) -> Result<DVector<f64>> {
    let n = rhs.len();
    debug_assert!(lower.len() == n && main.len() == n && upper.len() == n);
    let check = |row: usize, pivot: f64| {
        if !pivot.is_finite() || pivot.abs() <= pivot_epsilon {
            Err(RichardsError::SingularSystem { row, pivot })
        } else {
            Ok(pivot)
        }
    };

    let mut c_prime = DVector::zeros(n);
    let mut x = DVector::zeros(n);
    if n == 0 {
        return Ok(x);
    }

    let pivot = check(0, main[0])?;
    c_prime[0] = upper[0] / pivot;
    x[0] = rhs[0] / pivot;
    for i in 1..n {
        let pivot = check(i, main[i] - lower[i] * c_prime[i - 1])?;
        if i + 1 < n {
            c_prime[i] = upper[i] / pivot;
        }
        x[i] = (rhs[i] - lower[i] * x[i - 1]) / pivot;
    }

    for i in (0..n - 1).rev() {
        let next = x[i + 1];
        x[i] -= c_prime[i] * next;
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn laplacian(n: usize) -> LinearSystem {
        let mut system = LinearSystem::zeros(n);
        for i in 0..n {
            system.main[i] = 2.0;
            system.lower[i] = if i > 0 { -1.0 } else { 0.0 };
            system.upper[i] = if i + 1 < n { -1.0 } else { 0.0 };
            system.rhs[i] = (i as f64 + 1.0).sin();
        }
        system
    }

    #[test]
    fn identity_returns_rhs() {
        let mut system = LinearSystem::zeros(5);
        system.main.fill(1.0);
        system.rhs = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let x = system.solve(1e-14).unwrap();
        assert_eq!(x, system.rhs);
    }

    #[test]
    fn matches_dense_lu() {
        let system = laplacian(12);
        let x = system.solve(1e-14).unwrap();
        let reference = system.to_dense().lu().solve(&system.rhs).unwrap();
        for i in 0..12 {
            assert_relative_eq!(x[i], reference[i], max_relative = 1e-10);
        }
        let residual = system.apply(&x) - &system.rhs;
        assert!(residual.amax() < 1e-12);
    }

    #[test]
    fn zero_pivot_is_singular() {
        let mut system = laplacian(4);
        system.main[0] = 0.0;
        assert!(matches!(
            system.solve(1e-14),
            Err(RichardsError::SingularSystem { row: 0, .. })
        ));

        // second pivot cancels: 1 - 1 * 1 = 0
        let mut system = LinearSystem::zeros(3);
        system.main = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        system.upper[0] = 1.0;
        system.lower[1] = 1.0;
        assert!(matches!(
            system.solve(1e-14),
            Err(RichardsError::SingularSystem { row: 1, .. })
        ));
    }

    #[test]
    fn non_finite_pivot_is_singular() {
        let mut system = laplacian(3);
        system.main[2] = f64::NAN;
        assert!(system.solve(0.0).is_err());
    }
}
