//! Integer root extraction from reduced lattice rows
//!
//! A reduced row encodes a polynomial h with coefficient k scaled by X^k.
//! Descaling recovers h, and any candidate for the hidden value must be an
//! integer root of h over the plain integers. Roots are located without
//! factoring: the derivative recursion splits (-X, X) into intervals where
//! h is monotone, and each interval is searched by exact integer bisection.

use crate::poly::Polynomial;
use rug::Integer;
use std::cmp::Ordering;

/// Recovers the polynomial encoded by a scaled lattice row, dividing
/// coefficient k by X^k. Returns `None` when a coefficient is not divisible
/// by its scale factor or the row encodes the zero polynomial.
pub fn descale_row(row: &[Integer], bound: &Integer) -> Option<Polynomial> {
    let mut coeffs = Vec::with_capacity(row.len());
    let mut scale = Integer::from(1);
    for (k, entry) in row.iter().enumerate() {
        if k > 0 {
            scale *= bound;
        }
        if !entry.is_divisible(&scale) {
            return None;
        }
        coeffs.push(Integer::from(entry.div_exact_ref(&scale)));
    }
    let poly = Polynomial::new(coeffs).ok()?;
    if poly.is_zero() {
        return None;
    }
    Some(poly)
}

/// All integer roots r of `poly` with |r| < `bound`, ordered by increasing
/// absolute value (ties broken by value).
pub fn integer_roots(poly: &Polynomial, bound: &Integer) -> Vec<Integer> {
    let mut candidates = Vec::new();
    if poly.is_zero() || *bound <= 0 {
        return candidates;
    }

    // Strip the largest power of x dividing the polynomial; it contributes
    // the root 0 and nothing else.
    let mut start = 0;
    while start < poly.coeffs().len() && poly.coeffs()[start] == 0 {
        start += 1;
    }
    if start > 0 {
        candidates.push(Integer::new());
    }
    let stripped = Polynomial::new(poly.coeffs()[start..].to_vec()).expect("nonzero polynomial");
    if stripped.degree() == 0 {
        return finalize(candidates, bound);
    }

    let hi = Integer::from(bound - 1u32);
    let lo = Integer::from(-&hi);
    if lo > hi {
        return finalize(candidates, bound);
    }

    if stripped.degree() == 1 {
        // a*x + b = 0 has the single rational root -b/a.
        let b = &stripped.coeffs()[0];
        let a = &stripped.coeffs()[1];
        if b.is_divisible(a) {
            let mut r = Integer::from(b.div_exact_ref(a));
            r = -r;
            candidates.push(r);
        }
        return finalize(candidates, bound);
    }

    let mut pts = monotone_breakpoints(&stripped, &lo, &hi);
    pts.push(lo);
    pts.push(hi);
    pts.sort();
    pts.dedup();

    for pt in &pts {
        if stripped.evaluate(pt) == 0 {
            candidates.push(pt.clone());
        }
    }
    for w in pts.windows(2) {
        if let Some((a, b)) = crossing(&stripped, &w[0], &w[1]) {
            if a == b {
                candidates.push(a);
            }
        }
    }

    finalize(candidates, bound)
}

fn finalize(mut candidates: Vec<Integer>, bound: &Integer) -> Vec<Integer> {
    candidates.retain(|r| Integer::from(r.abs_ref()) < *bound);
    candidates.sort_by(|a, b| {
        match Integer::from(a.abs_ref()).cmp(&Integer::from(b.abs_ref())) {
            Ordering::Equal => a.cmp(b),
            other => other,
        }
    });
    candidates.dedup();
    candidates
}

/// Integer points splitting [lo, hi] into intervals on which `poly` is
/// monotone. Each real critical point is bracketed by the two integers
/// around it (or hit exactly), so no integer between consecutive returned
/// points straddles a sign change of the derivative.
fn monotone_breakpoints(poly: &Polynomial, lo: &Integer, hi: &Integer) -> Vec<Integer> {
    if poly.degree() <= 1 {
        return Vec::new();
    }
    let deriv = poly.derivative();
    let mut pts = monotone_breakpoints(&deriv, lo, hi);
    pts.push(lo.clone());
    pts.push(hi.clone());
    pts.sort();
    pts.dedup();

    let mut out = Vec::new();
    for w in pts.windows(2) {
        if let Some((a, b)) = crossing(&deriv, &w[0], &w[1]) {
            out.push(a.clone());
            if b != a {
                out.push(b);
            }
        }
    }
    out.sort();
    out.dedup();
    out
}

/// For `poly` monotone on [lo, hi], brackets a sign change to a unit
/// interval (a, a+1), or pins it to an exact zero (a, a). `None` when the
/// sign is constant across the interval.
fn crossing(poly: &Polynomial, lo: &Integer, hi: &Integer) -> Option<(Integer, Integer)> {
    let sign_lo = poly.evaluate(lo).cmp0() as i32;
    if sign_lo == 0 {
        return Some((lo.clone(), lo.clone()));
    }
    let sign_hi = poly.evaluate(hi).cmp0() as i32;
    if sign_hi == 0 {
        return Some((hi.clone(), hi.clone()));
    }
    if sign_lo == sign_hi {
        return None;
    }

    let mut lo = lo.clone();
    let mut hi = hi.clone();
    while Integer::from(&hi - &lo) > 1 {
        let mid = Integer::from(&lo + &hi) >> 1;
        let sign_mid = poly.evaluate(&mid).cmp0() as i32;
        if sign_mid == 0 {
            return Some((mid.clone(), mid));
        }
        if sign_mid == sign_lo {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly(coeffs: &[i64]) -> Polynomial {
        Polynomial::new(coeffs.iter().map(|&c| Integer::from(c)).collect()).unwrap()
    }

    fn roots(coeffs: &[i64], bound: i64) -> Vec<i64> {
        integer_roots(&poly(coeffs), &Integer::from(bound))
            .iter()
            .map(|r| r.to_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_degree_one_exact_division() {
        assert_eq!(roots(&[-6, 3], 10), vec![2]);
        // 2x - 3 has no integer root
        assert_eq!(roots(&[-3, 2], 10), Vec::<i64>::new());
    }

    #[test]
    fn test_cubic_with_three_roots() {
        // (x - 3)(x + 5)(x - 12) = x^3 - 10x^2 - 39x + 180
        assert_eq!(roots(&[180, -39, -10, 1], 20), vec![3, -5, 12]);
    }

    #[test]
    fn test_bound_filters_roots() {
        assert_eq!(roots(&[180, -39, -10, 1], 6), vec![3, -5]);
        assert_eq!(roots(&[180, -39, -10, 1], 3), Vec::<i64>::new());
    }

    #[test]
    fn test_zero_root_from_stripped_power() {
        // x^2 * (x - 3)
        assert_eq!(roots(&[0, 0, -3, 1], 10), vec![0, 3]);
    }

    #[test]
    fn test_no_real_integer_roots() {
        // x^2 + 1
        assert_eq!(roots(&[1, 0, 1], 100), Vec::<i64>::new());
        // x^2 - 2: real roots are irrational
        assert_eq!(roots(&[-2, 0, 1], 100), Vec::<i64>::new());
    }

    #[test]
    fn test_repeated_root_reported_once() {
        // (x - 4)^2 = x^2 - 8x + 16
        assert_eq!(roots(&[16, -8, 1], 10), vec![4]);
    }

    #[test]
    fn test_descale_row_roundtrip() {
        // h = 5 + 7x + 2x^2 scaled with X = 3 -> [5, 21, 18]
        let bound = Integer::from(3);
        let row = vec![Integer::from(5), Integer::from(21), Integer::from(18)];
        let h = descale_row(&row, &bound).unwrap();
        assert_eq!(h, poly(&[5, 7, 2]));
    }

    #[test]
    fn test_descale_row_rejects_indivisible() {
        let bound = Integer::from(3);
        let row = vec![Integer::from(5), Integer::from(20)];
        assert!(descale_row(&row, &bound).is_none());
    }

    #[test]
    fn test_descale_row_rejects_zero_row() {
        let bound = Integer::from(3);
        let row = vec![Integer::new(), Integer::new()];
        assert!(descale_row(&row, &bound).is_none());
    }
}
