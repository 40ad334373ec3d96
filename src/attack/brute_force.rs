//! Exhaustive search over the hidden block
//!
//! Baseline for small bounds and a cross-check for the lattice attack. The
//! congruence e*(d0 + x*2^shift) = 1 (mod M) is rearranged to a*x = c
//! (mod M), and each worker walks a stride of x values keeping a*x mod M
//! incrementally instead of multiplying afresh.

use crate::attack::{AttackOutcome, AttackTarget, CancelToken, FailureReason};
use anyhow::Result;
use log::debug;
use rug::ops::RemRounding;
use rug::Integer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

pub struct BruteForceAttack {
    threads: usize,
    max_attempts: Option<u64>,
}

impl BruteForceAttack {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u64>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn run(&self, target: &AttackTarget) -> Result<AttackOutcome> {
        self.run_cancellable(target, None)
    }

    pub fn run_cancellable(
        &self,
        target: &AttackTarget,
        cancel: Option<&CancelToken>,
    ) -> Result<AttackOutcome> {
        if target.modulus <= 0 {
            return Ok(AttackOutcome::Failed(FailureReason::InvalidParameters(
                "congruence modulus M must be positive".into(),
            )));
        }
        if target.exposure.bound <= 0 {
            return Ok(AttackOutcome::Failed(FailureReason::InvalidParameters(
                "root bound X must be positive".into(),
            )));
        }
        if target.e <= 0 {
            return Ok(AttackOutcome::Failed(FailureReason::InvalidParameters(
                "public exponent e must be positive".into(),
            )));
        }

        let modulus = &target.modulus;
        let a = Integer::from(&target.e << target.exposure.shift).rem_euc(modulus);
        let mut residue = Integer::from(&target.e * &target.exposure.d0);
        residue = (1u32 - residue).rem_euc(modulus);

        let mut limit = target.exposure.bound.clone();
        let mut truncated = false;
        if let Some(max) = self.max_attempts {
            let cap = Integer::from(max);
            if cap < limit {
                limit = cap;
                truncated = true;
            }
        }
        debug!(
            "exhaustive search over [0, {}) with {} workers",
            limit, self.threads
        );

        let found = AtomicBool::new(false);
        let step = Integer::from(&a * self.threads as u64).rem_euc(modulus);
        let hits: Vec<Option<Integer>> = thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.threads);
            for worker in 0..self.threads {
                let a = &a;
                let residue = &residue;
                let limit = &limit;
                let found = &found;
                let step = &step;
                handles.push(s.spawn(move || {
                    let mut x = Integer::from(worker as u64);
                    let mut acc = Integer::from(a * &x).rem_euc(modulus);
                    while x < *limit {
                        if found.load(Ordering::Relaxed) {
                            return None;
                        }
                        if let Some(token) = cancel {
                            if token.is_cancelled() {
                                return None;
                            }
                        }
                        if acc == *residue {
                            found.store(true, Ordering::Relaxed);
                            return Some(x);
                        }
                        x += self.threads as u64;
                        acc += step;
                        if acc >= *modulus {
                            acc -= modulus;
                        }
                    }
                    None
                }));
            }
            handles
                .into_iter()
                .map(|h| h.join().expect("search worker panicked"))
                .collect()
        });

        let best = hits.into_iter().flatten().min();
        match best {
            Some(x) => {
                let d = target.exposure.reconstruct(&x);
                debug!("exhaustive search hit x={}", x);
                Ok(AttackOutcome::Recovered { x, d })
            }
            None => {
                if cancel.map_or(false, CancelToken::is_cancelled) {
                    return Ok(AttackOutcome::Failed(FailureReason::Cancelled));
                }
                // A truncated search says nothing about the rest of (-X, X);
                // only a full pass can rule a root out.
                if truncated {
                    return Ok(AttackOutcome::Failed(FailureReason::AttemptsExhausted));
                }
                Ok(AttackOutcome::Failed(FailureReason::NoValidRoot))
            }
        }
    }
}
