//! Univariate integer polynomials with exact arithmetic

use anyhow::{bail, Result};
use rug::Integer;
use std::fmt;

/// An immutable polynomial over the integers, coefficients stored in
/// increasing degree order. Every operation returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coeffs: Vec<Integer>,
}

impl Polynomial {
    /// Constructs a polynomial from coefficients in increasing degree order.
    /// An empty coefficient sequence is rejected.
    pub fn new(coeffs: Vec<Integer>) -> Result<Self> {
        if coeffs.is_empty() {
            bail!("Polynomial requires at least one coefficient");
        }
        Ok(Self { coeffs }.normalized())
    }

    pub fn constant(c: Integer) -> Self {
        Self { coeffs: vec![c] }
    }

    /// c * x^degree
    pub fn monomial(c: Integer, degree: usize) -> Self {
        let mut coeffs = vec![Integer::new(); degree + 1];
        coeffs[degree] = c;
        Self { coeffs }.normalized()
    }

    fn normalized(mut self) -> Self {
        while self.coeffs.len() > 1 && self.coeffs.last().map_or(false, |c| *c == 0) {
            self.coeffs.pop();
        }
        self
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.len() == 1 && self.coeffs[0] == 0
    }

    pub fn coeffs(&self) -> &[Integer] {
        &self.coeffs
    }

    pub fn leading(&self) -> &Integer {
        self.coeffs.last().unwrap()
    }

    /// Exact evaluation at an integer point (Horner's rule).
    pub fn evaluate(&self, x: &Integer) -> Integer {
        let mut acc = Integer::new();
        for c in self.coeffs.iter().rev() {
            acc *= x;
            acc += c;
        }
        acc
    }

    /// Product of two polynomials, coefficients by exact convolution.
    pub fn mul(&self, other: &Polynomial) -> Polynomial {
        let mut coeffs = vec![Integer::new(); self.degree() + other.degree() + 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            if *a == 0 {
                continue;
            }
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += Integer::from(a * b);
            }
        }
        Self { coeffs }.normalized()
    }

    pub fn scale(&self, c: &Integer) -> Polynomial {
        let coeffs = self.coeffs.iter().map(|a| Integer::from(a * c)).collect();
        Self { coeffs }.normalized()
    }

    /// Multiplies by x^k, shifting every coefficient up k degrees.
    pub fn mul_xpow(&self, k: usize) -> Polynomial {
        if self.is_zero() {
            return self.clone();
        }
        let mut coeffs = vec![Integer::new(); k];
        coeffs.extend(self.coeffs.iter().cloned());
        Self { coeffs }
    }

    pub fn pow(&self, exp: u32) -> Polynomial {
        let mut result = Self::constant(Integer::from(1));
        for _ in 0..exp {
            result = result.mul(self);
        }
        result
    }

    pub fn derivative(&self) -> Polynomial {
        if self.degree() == 0 {
            return Self::constant(Integer::new());
        }
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, c)| Integer::from(c * k as u32))
            .collect();
        Self { coeffs }.normalized()
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms = Vec::new();
        for (k, c) in self.coeffs.iter().enumerate() {
            if *c == 0 {
                continue;
            }
            match k {
                0 => terms.push(format!("{}", c)),
                1 => terms.push(format!("{}*x", c)),
                _ => terms.push(format!("{}*x^{}", c, k)),
            }
        }
        if terms.is_empty() {
            return write!(f, "0");
        }
        write!(f, "{}", terms.join(" + "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly(coeffs: &[i64]) -> Polynomial {
        Polynomial::new(coeffs.iter().map(|&c| Integer::from(c)).collect()).unwrap()
    }

    #[test]
    fn test_empty_coefficients_rejected() {
        assert!(Polynomial::new(vec![]).is_err());
    }

    #[test]
    fn test_trailing_zeros_trimmed() {
        let p = poly(&[1, 2, 0, 0]);
        assert_eq!(p.degree(), 1);
    }

    #[test]
    fn test_evaluate_horner() {
        // 3 + 2x + x^2 at x = 5 -> 3 + 10 + 25 = 38
        let p = poly(&[3, 2, 1]);
        assert_eq!(p.evaluate(&Integer::from(5)), 38);
        assert_eq!(p.evaluate(&Integer::from(-5)), 18);
    }

    #[test]
    fn test_mul_convolution() {
        // (1 + x)(2 + 3x) = 2 + 5x + 3x^2
        let p = poly(&[1, 1]).mul(&poly(&[2, 3]));
        assert_eq!(p, poly(&[2, 5, 3]));
    }

    #[test]
    fn test_scale_and_mul_xpow() {
        let p = poly(&[1, 2]).scale(&Integer::from(10));
        assert_eq!(p, poly(&[10, 20]));
        let q = poly(&[1, 2]).mul_xpow(2);
        assert_eq!(q, poly(&[0, 0, 1, 2]));
    }

    #[test]
    fn test_pow() {
        // (1 + x)^3 = 1 + 3x + 3x^2 + x^3
        let p = poly(&[1, 1]).pow(3);
        assert_eq!(p, poly(&[1, 3, 3, 1]));
        assert_eq!(poly(&[7, 2]).pow(0), poly(&[1]));
    }

    #[test]
    fn test_derivative() {
        // d/dx (3 + 2x + 5x^3) = 2 + 15x^2
        let p = poly(&[3, 2, 0, 5]).derivative();
        assert_eq!(p, poly(&[2, 0, 15]));
        assert!(poly(&[9]).derivative().is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(poly(&[3, 2, 1]).to_string(), "3 + 2*x + 1*x^2");
        assert_eq!(poly(&[0]).to_string(), "0");
    }
}
