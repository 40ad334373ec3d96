//! Partial key exposure attacks on RSA with prime-power moduli
//!
//! This library recovers an RSA private exponent d from a contiguous block
//! of known most- or least-significant bits, using a Coppersmith-style
//! lattice attack: the unknown remainder of d is a small root of a modular
//! polynomial, found by LLL reduction of a scaled coefficient lattice.

pub mod attack;
pub mod exposure;
pub mod lattice;
pub mod lll;
pub mod math;
pub mod poly;
pub mod provider;
pub mod roots;
pub mod rsa;
pub mod verify;

pub use attack::{AttackOutcome, AttackTarget, CoppersmithAttack, FailureReason};
pub use exposure::{Exposure, ExposureKind};
