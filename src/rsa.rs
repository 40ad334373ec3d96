//! Prime-power RSA key generation for demos and self-tests

use crate::math::{mod_inverse, random_prime};
use anyhow::{bail, Result};
use rug::ops::Pow;
use rug::rand::RandState;
use rug::Integer;

/// Parameters for a prime-power modulus N = p^r * q^s.
#[derive(Debug, Clone)]
pub struct RsaConfig {
    /// Bit length of each prime factor.
    pub bit_length: u32,
    pub r: u32,
    pub s: u32,
    pub e: Integer,
}

impl Default for RsaConfig {
    fn default() -> Self {
        Self {
            bit_length: 20,
            r: 2,
            s: 1,
            e: Integer::from(65537),
        }
    }
}

impl RsaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bit_length < 8 {
            bail!("Prime bit length must be at least 8, got {}", self.bit_length);
        }
        if self.r < 1 || self.s < 1 {
            bail!("Prime-power exponents r and s must be at least 1");
        }
        if self.e < 3 || self.e.is_even() {
            bail!("Public exponent must be an odd integer >= 3");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RsaKey {
    pub n: Integer,
    pub e: Integer,
    pub d: Integer,
    pub p: Integer,
    pub q: Integer,
    pub r: u32,
    pub s: u32,
    /// Euler phi of the modulus: p^(r-1)(p-1) * q^(s-1)(q-1).
    pub phi: Integer,
}

/// Generates a prime-power RSA key. A fixed `seed` makes the draw
/// reproducible.
pub fn generate(config: &RsaConfig, seed: Option<u64>) -> Result<RsaKey> {
    config.validate()?;

    let mut rng = RandState::new();
    if let Some(seed) = seed {
        rng.seed(&Integer::from(seed));
    }

    loop {
        let p = random_prime(config.bit_length, &mut rng);
        let mut q = random_prime(config.bit_length, &mut rng);
        while q == p {
            q = random_prime(config.bit_length, &mut rng);
        }

        let n = Integer::from((&p).pow(config.r)) * Integer::from((&q).pow(config.s));
        let phi = Integer::from((&p).pow(config.r - 1))
            * Integer::from(&p - 1u32)
            * Integer::from((&q).pow(config.s - 1))
            * Integer::from(&q - 1u32);

        // gcd(e, phi) must be 1 for d to exist; redraw the primes otherwise.
        let d = match mod_inverse(&config.e, &phi) {
            Some(d) => d,
            None => continue,
        };

        return Ok(RsaKey {
            n,
            e: config.e.clone(),
            d,
            p,
            q,
            r: config.r,
            s: config.s,
            phi,
        });
    }
}
