//! Arbitrary-precision number theory helpers

use anyhow::{anyhow, bail, Result};
use rug::integer::IsPrime;
use rug::rand::RandState;
use rug::Integer;

/// Miller-Rabin rounds used for primality checks.
const PRIME_TEST_REPS: u32 = 30;

pub fn parse_integer_decimal_strict(s: &str) -> Result<Integer> {
    if s.is_empty() {
        bail!("Empty decimal string");
    }
    if !s.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid decimal string: only digits 0-9 allowed");
    }
    if s.len() > 1 && s.starts_with('0') {
        bail!("Invalid decimal string: no leading zeros allowed");
    }

    Integer::parse(s)
        .map(Integer::from)
        .map_err(|e| anyhow!("Failed to parse decimal: {}", e))
}

pub fn mod_inverse(a: &Integer, modulus: &Integer) -> Option<Integer> {
    a.clone().invert(modulus).ok()
}

pub fn is_probably_prime(n: &Integer) -> bool {
    n.is_probably_prime(PRIME_TEST_REPS) != IsPrime::No
}

/// Samples a random prime with exactly `bits` significant bits.
///
/// The top and bottom bits are forced so candidates stay odd and full-width;
/// the candidate is then advanced by 2 until it passes Miller-Rabin.
pub fn random_prime(bits: u32, rng: &mut RandState) -> Integer {
    assert!(bits >= 2, "prime must have at least 2 bits");

    let mut candidate = Integer::from(Integer::random_bits(bits, rng));
    candidate.set_bit(bits - 1, true);
    if bits > 1 {
        candidate.set_bit(0, true);
    }

    while !is_probably_prime(&candidate) {
        candidate += 2;
        if candidate.significant_bits() > bits {
            candidate = Integer::from(1) << (bits - 1);
            candidate += 1;
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_decimal_strict_valid() {
        let n = parse_integer_decimal_strict("90802716437687").unwrap();
        assert_eq!(n, 90802716437687u64);
    }

    #[test]
    fn test_parse_integer_rejects_leading_zero() {
        assert!(parse_integer_decimal_strict("0123").is_err());
    }

    #[test]
    fn test_parse_integer_rejects_non_digits() {
        assert!(parse_integer_decimal_strict("12a3").is_err());
        assert!(parse_integer_decimal_strict("-5").is_err());
        assert!(parse_integer_decimal_strict("").is_err());
    }

    #[test]
    fn test_parse_integer_allows_zero() {
        assert_eq!(parse_integer_decimal_strict("0").unwrap(), 0);
    }

    #[test]
    fn test_mod_inverse() {
        let a = Integer::from(65537);
        let m = Integer::from(90798519799904u64);
        let inv = mod_inverse(&a, &m).unwrap();
        let product = Integer::from(&a * &inv) % &m;
        assert_eq!(product, 1);
    }

    #[test]
    fn test_mod_inverse_none_when_not_coprime() {
        let a = Integer::from(6);
        let m = Integer::from(9);
        assert!(mod_inverse(&a, &m).is_none());
    }

    #[test]
    fn test_random_prime_has_requested_width() {
        let mut rng = RandState::new();
        rng.seed(&Integer::from(42));
        for bits in [12u32, 18, 24] {
            let p = random_prime(bits, &mut rng);
            assert_eq!(p.significant_bits(), bits);
            assert!(is_probably_prime(&p));
        }
    }
}
