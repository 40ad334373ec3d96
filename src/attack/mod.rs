//! Attack strategies for recovering the hidden exponent block

pub mod brute_force;
pub mod coppersmith;

pub use brute_force::BruteForceAttack;
pub use coppersmith::{recommended_parameters, sweep, CoppersmithAttack, SweepReport};

use crate::exposure::Exposure;
use rug::Integer;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One key to attack: public parameters plus the exposed fragment of d.
/// `modulus` is the modulus of the defining congruence e*d = 1 (mod M),
/// typically Euler phi of n or a known multiple structure.
#[derive(Debug, Clone)]
pub struct AttackTarget {
    pub n: Integer,
    pub e: Integer,
    pub modulus: Integer,
    pub exposure: Exposure,
}

/// Why an attack run ended without the key. These are expected outcomes of
/// the search, distinct from programming errors, which surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    InvalidParameters(String),
    /// The lattice determinant fails the Howgrave-Graham feasibility bound,
    /// so no reduced vector can be short enough.
    BoundExceeded,
    /// Reduction hit its step budget before converging.
    ReductionTimeout,
    /// The exhaustive search hit its attempt cap before covering the full
    /// bound, so absence of a hit says nothing about the rest of the range.
    AttemptsExhausted,
    /// The search covered its whole range but no candidate satisfied the
    /// defining congruence.
    NoValidRoot,
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            FailureReason::BoundExceeded => {
                write!(f, "bound exceeded: lattice cannot produce a short enough vector")
            }
            FailureReason::ReductionTimeout => write!(f, "reduction step budget exhausted"),
            FailureReason::AttemptsExhausted => {
                write!(f, "attempt cap reached before covering the bound")
            }
            FailureReason::NoValidRoot => write!(f, "no extracted root satisfies the congruence"),
            FailureReason::Cancelled => write!(f, "attack cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackOutcome {
    /// The hidden block and the reassembled private exponent.
    Recovered { x: Integer, d: Integer },
    Failed(FailureReason),
}

impl AttackOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, AttackOutcome::Recovered { .. })
    }
}

/// Cooperative cancellation shared between an attack run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub(crate) fn as_atomic(&self) -> &AtomicBool {
        &self.flag
    }
}
