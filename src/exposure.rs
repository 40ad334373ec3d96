//! Partial exposure model for the private exponent
//!
//! Both exposure directions reduce to the same affine form
//! d = d0 + x * 2^shift with |x| < bound: MSB exposure fixes the high bits
//! (shift = 0, x is the unknown low block), LSB exposure fixes the low
//! `shift` bits (x is the unknown high block).

use anyhow::{bail, Result};
use rug::Integer;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureKind {
    Msb,
    Lsb,
}

impl fmt::Display for ExposureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExposureKind::Msb => write!(f, "msb"),
            ExposureKind::Lsb => write!(f, "lsb"),
        }
    }
}

impl FromStr for ExposureKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "msb" => Ok(ExposureKind::Msb),
            "lsb" => Ok(ExposureKind::Lsb),
            other => bail!("Unknown exposure kind '{}', expected msb or lsb", other),
        }
    }
}

/// A known fragment of the private exponent plus the search bound for the
/// missing block.
#[derive(Debug, Clone)]
pub struct Exposure {
    pub kind: ExposureKind,
    pub d0: Integer,
    pub shift: u32,
    pub bound: Integer,
}

impl Exposure {
    pub fn new(kind: ExposureKind, d0: Integer, shift: u32, bound: Integer) -> Result<Self> {
        if d0 < 0 {
            bail!("Known fragment d0 must be non-negative");
        }
        if bound <= 0 {
            bail!("Root bound X must be positive");
        }
        match kind {
            ExposureKind::Msb => {
                if shift != 0 {
                    bail!("MSB exposure does not take a shift");
                }
            }
            ExposureKind::Lsb => {
                if shift == 0 {
                    bail!("LSB exposure requires a positive bit count for the known block");
                }
                if d0.significant_bits() > shift {
                    bail!(
                        "LSB fragment has {} bits but only {} are declared known",
                        d0.significant_bits(),
                        shift
                    );
                }
            }
        }
        Ok(Self {
            kind,
            d0,
            shift,
            bound,
        })
    }

    /// Splits a full exponent into a known fragment and hidden block, keeping
    /// `ratio` of its bits. Returns the exposure together with the true
    /// hidden value, for demos and tests.
    pub fn simulate(d: &Integer, ratio: f64, kind: ExposureKind) -> Result<(Self, Integer)> {
        if !(0.0..1.0).contains(&ratio) || ratio == 0.0 {
            bail!("Exposure ratio must lie in (0, 1), got {}", ratio);
        }
        let total = d.significant_bits();
        let known = (total as f64 * ratio).floor() as u32;
        if known == 0 || known >= total {
            bail!(
                "Ratio {} leaves no usable split of a {}-bit exponent",
                ratio,
                total
            );
        }
        let unknown = total - known;
        let bound = Integer::from(1) << unknown;

        match kind {
            ExposureKind::Msb => {
                let hidden = Integer::from(d.keep_bits_ref(unknown));
                let d0 = Integer::from(d - &hidden);
                Ok((Self::new(kind, d0, 0, bound)?, hidden))
            }
            ExposureKind::Lsb => {
                let d0 = Integer::from(d.keep_bits_ref(known));
                let hidden = Integer::from(d >> known);
                Ok((Self::new(kind, d0, known, bound)?, hidden))
            }
        }
    }

    /// Reassembles the full exponent from a recovered hidden block.
    pub fn reconstruct(&self, x: &Integer) -> Integer {
        let mut d = Integer::from(x << self.shift);
        d += &self.d0;
        d
    }

    /// Whether e * (d0 + x * 2^shift) is congruent to 1 modulo `modulus`.
    /// Always evaluated against the original modulus, regardless of any
    /// rewriting the attack applied to its working congruence.
    pub fn congruence_holds(&self, e: &Integer, modulus: &Integer, x: &Integer) -> bool {
        let d = self.reconstruct(x);
        let mut lhs = Integer::from(e * &d);
        lhs -= 1;
        lhs.is_divisible(modulus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: u64 = 90076698098945;
    const E: u64 = 65537;
    const PHI: u64 = 90798519799904;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(ExposureKind::from_str("msb").unwrap(), ExposureKind::Msb);
        assert_eq!(ExposureKind::from_str("LSB").unwrap(), ExposureKind::Lsb);
        assert!(ExposureKind::from_str("middle").is_err());
    }

    #[test]
    fn test_simulate_msb_split() {
        let d = Integer::from(D);
        let (exposure, hidden) = Exposure::simulate(&d, 0.75, ExposureKind::Msb).unwrap();
        // 47-bit exponent, 35 bits kept, 12 hidden
        assert_eq!(exposure.d0, 90076698095616u64);
        assert_eq!(hidden, 3329);
        assert_eq!(exposure.bound, 4096);
        assert_eq!(exposure.shift, 0);
        assert_eq!(exposure.reconstruct(&hidden), d);
    }

    #[test]
    fn test_simulate_lsb_split() {
        let d = Integer::from(D);
        let (exposure, hidden) = Exposure::simulate(&d, 0.75, ExposureKind::Lsb).unwrap();
        assert_eq!(exposure.d0, 19823836417u64);
        assert_eq!(hidden, 2621);
        assert_eq!(exposure.shift, 35);
        assert_eq!(exposure.bound, 4096);
        assert_eq!(exposure.reconstruct(&hidden), d);
    }

    #[test]
    fn test_simulate_rejects_degenerate_ratio() {
        let d = Integer::from(D);
        assert!(Exposure::simulate(&d, 0.0, ExposureKind::Msb).is_err());
        assert!(Exposure::simulate(&d, 1.0, ExposureKind::Msb).is_err());
        assert!(Exposure::simulate(&Integer::from(3), 0.1, ExposureKind::Msb).is_err());
    }

    #[test]
    fn test_congruence_holds() {
        let d = Integer::from(D);
        let (exposure, hidden) = Exposure::simulate(&d, 0.75, ExposureKind::Msb).unwrap();
        let e = Integer::from(E);
        let phi = Integer::from(PHI);
        assert!(exposure.congruence_holds(&e, &phi, &hidden));
        let wrong = Integer::from(&hidden + 1u32);
        assert!(!exposure.congruence_holds(&e, &phi, &wrong));
    }

    #[test]
    fn test_new_validation() {
        assert!(Exposure::new(ExposureKind::Msb, Integer::from(5), 3, Integer::from(16)).is_err());
        assert!(Exposure::new(ExposureKind::Lsb, Integer::from(5), 0, Integer::from(16)).is_err());
        assert!(Exposure::new(ExposureKind::Lsb, Integer::from(9), 3, Integer::from(16)).is_err());
        assert!(Exposure::new(ExposureKind::Msb, Integer::from(5), 0, Integer::new()).is_err());
    }
}
