//! Independent checks on recovered keys

use rug::Integer;

/// Whether e * d is congruent to 1 modulo `modulus`.
pub fn key_consistent(e: &Integer, d: &Integer, modulus: &Integer) -> bool {
    if *modulus <= 0 {
        return false;
    }
    let mut lhs = Integer::from(e * d);
    lhs -= 1;
    lhs.is_divisible(modulus)
}

/// Encrypts `message` under (n, e) and decrypts with d; true when the
/// round trip restores the message.
pub fn encryption_roundtrip(n: &Integer, e: &Integer, d: &Integer, message: &Integer) -> bool {
    if *message < 0 || message >= n {
        return false;
    }
    let cipher = match message.clone().pow_mod(e, n) {
        Ok(c) => c,
        Err(_) => return false,
    };
    match cipher.pow_mod(d, n) {
        Ok(plain) => plain == *message,
        Err(_) => false,
    }
}
