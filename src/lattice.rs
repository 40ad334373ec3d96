//! Coppersmith lattice construction
//!
//! Builds the Howgrave-Graham coefficient lattice for a degree-1 defining
//! polynomial f: rows M^(m-j) * f(x)^j for j = 0..m-1 followed by
//! x^i * f(x)^m for i = 0..t-1. Coefficient k of each row is scaled by X^k,
//! so the matrix is square of dimension n = m + t and lower triangular.

use crate::poly::Polynomial;
use anyhow::{bail, ensure, Result};
use rug::ops::Pow;
use rug::Integer;

/// A square integer basis matrix, owned exclusively by one reduction run.
#[derive(Debug, Clone)]
pub struct LatticeBasis {
    rows: Vec<Vec<Integer>>,
}

impl LatticeBasis {
    pub fn dimension(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Integer>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Integer>> {
        self.rows
    }

    /// Determinant of the lattice. The basis is lower triangular by
    /// construction, so this is the product of the diagonal entries.
    pub fn determinant(&self) -> Integer {
        let mut det = Integer::from(1);
        for (i, row) in self.rows.iter().enumerate() {
            det *= &row[i];
        }
        det
    }
}

pub fn build_basis(
    f: &Polynomial,
    modulus: &Integer,
    bound: &Integer,
    m: u32,
    t: u32,
) -> Result<LatticeBasis> {
    if m < 1 {
        bail!("lattice parameter m must be >= 1, got {}", m);
    }
    if *bound <= 0 {
        bail!("root bound X must be positive");
    }
    if *modulus <= 0 {
        bail!("modulus M must be positive");
    }
    if f.degree() != 1 {
        bail!("defining polynomial must have degree 1, got {}", f.degree());
    }

    let n = (m + t) as usize;

    // f^0 .. f^m
    let mut f_powers = Vec::with_capacity(m as usize + 1);
    f_powers.push(Polynomial::constant(Integer::from(1)));
    for j in 1..=m as usize {
        f_powers.push(f_powers[j - 1].mul(f));
    }

    // X^0 .. X^(n-1)
    let mut bound_powers = Vec::with_capacity(n);
    bound_powers.push(Integer::from(1));
    for k in 1..n {
        bound_powers.push(Integer::from(&bound_powers[k - 1] * bound));
    }

    let mut shifts = Vec::with_capacity(n);
    for j in 0..m {
        let scale = Integer::from(modulus.pow(m - j));
        shifts.push(f_powers[j as usize].scale(&scale));
    }
    for i in 0..t {
        shifts.push(f_powers[m as usize].mul_xpow(i as usize));
    }

    let mut rows = Vec::with_capacity(n);
    for (r, poly) in shifts.iter().enumerate() {
        ensure!(
            poly.degree() == r,
            "lattice row {} has degree {}, expected {}",
            r,
            poly.degree(),
            r
        );
        let mut row = vec![Integer::new(); n];
        for (k, c) in poly.coeffs().iter().enumerate() {
            row[k] = Integer::from(c * &bound_powers[k]);
        }
        rows.push(row);
    }

    Ok(LatticeBasis { rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(b: i64, a: i64) -> Polynomial {
        Polynomial::new(vec![Integer::from(b), Integer::from(a)]).unwrap()
    }

    #[test]
    fn test_dimension_and_shape() {
        let f = linear(7, 3);
        let basis = build_basis(&f, &Integer::from(101), &Integer::from(4), 3, 2).unwrap();
        assert_eq!(basis.dimension(), 5);
        assert!(basis.rows().iter().all(|r| r.len() == 5));
    }

    #[test]
    fn test_lower_triangular() {
        let f = linear(7, 3);
        let basis = build_basis(&f, &Integer::from(101), &Integer::from(4), 3, 2).unwrap();
        for (i, row) in basis.rows().iter().enumerate() {
            assert!(row[i] != 0, "zero diagonal at {}", i);
            for entry in &row[i + 1..] {
                assert_eq!(*entry, 0, "nonzero above diagonal in row {}", i);
            }
        }
    }

    #[test]
    fn test_row_contents() {
        // f = 3x + 7, M = 101, X = 4, m = 2, t = 1
        let f = linear(7, 3);
        let basis = build_basis(&f, &Integer::from(101), &Integer::from(4), 2, 1).unwrap();
        // Row 0: M^2
        assert_eq!(basis.rows()[0][0], 101 * 101);
        // Row 1: M * f scaled -> [101*7, 101*3*4]
        assert_eq!(basis.rows()[1][0], 101 * 7);
        assert_eq!(basis.rows()[1][1], 101 * 3 * 4);
        // Row 2: f^2 = 9x^2 + 42x + 49 -> [49, 42*4, 9*16]
        assert_eq!(basis.rows()[2][0], 49);
        assert_eq!(basis.rows()[2][1], 42 * 4);
        assert_eq!(basis.rows()[2][2], 9 * 16);
    }

    #[test]
    fn test_determinant_is_diagonal_product() {
        let f = linear(7, 3);
        let basis = build_basis(&f, &Integer::from(101), &Integer::from(4), 2, 1).unwrap();
        let expected = Integer::from(101i64 * 101) * (101 * 3 * 4) * (9 * 16);
        assert_eq!(basis.determinant(), expected);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let f = linear(7, 3);
        assert!(build_basis(&f, &Integer::from(101), &Integer::from(4), 0, 1).is_err());
        assert!(build_basis(&f, &Integer::from(101), &Integer::from(0), 2, 1).is_err());
        assert!(build_basis(&f, &Integer::from(0), &Integer::from(4), 2, 1).is_err());
        let quad = Polynomial::new(vec![
            Integer::from(1),
            Integer::from(1),
            Integer::from(1),
        ])
        .unwrap();
        assert!(build_basis(&quad, &Integer::from(101), &Integer::from(4), 2, 1).is_err());
    }
}
