//! Coppersmith-style lattice attack on a partially exposed exponent
//!
//! The defining congruence e*(d0 + x*2^shift) = 1 (mod M) turns the hidden
//! block into a small root of a degree-1 modular polynomial. Powers and
//! shifts of that polynomial span a lattice whose short vectors, found by
//! LLL, vanish at the root over the plain integers.

use crate::attack::{AttackOutcome, AttackTarget, CancelToken, FailureReason};
use crate::exposure::ExposureKind;
use crate::lattice::build_basis;
use crate::lll::{LllError, LllReducer};
use crate::math::mod_inverse;
use crate::poly::Polynomial;
use crate::roots::{descale_row, integer_roots};
use anyhow::{anyhow, bail, Result};
use log::debug;
use rug::ops::{Pow, RemRounding};
use rug::{Integer, Rational};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

pub struct CoppersmithAttack {
    m: u32,
    t: u32,
    delta: Rational,
    max_steps: Option<u64>,
}

impl CoppersmithAttack {
    pub fn new(m: u32, t: u32) -> Self {
        Self {
            m,
            t,
            delta: Rational::from((99, 100)),
            max_steps: None,
        }
    }

    pub fn with_delta(mut self, delta: Rational) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
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
        if let Some(msg) = self.validate(target) {
            return Ok(AttackOutcome::Failed(FailureReason::InvalidParameters(msg)));
        }

        let (f, working_modulus) = match self.defining_congruence(target)? {
            Some(pair) => pair,
            // The known fragment contradicts the congruence outright.
            None => return Ok(AttackOutcome::Failed(FailureReason::NoValidRoot)),
        };
        debug!(
            "defining polynomial {} over a {}-bit working modulus",
            f,
            working_modulus.significant_bits()
        );

        let n = self.m + self.t;
        if n == 1 {
            return self.solve_direct(&f, &working_modulus, target);
        }

        let bound = &target.exposure.bound;
        let basis = build_basis(&f, &working_modulus, bound, self.m, self.t)?;
        let det = basis.determinant();
        debug!(
            "lattice dimension {}, determinant {} bits",
            basis.dimension(),
            det.significant_bits()
        );
        if !feasibility_holds(&det, &working_modulus, n, self.m, &self.delta) {
            debug!("determinant fails the short-vector feasibility bound");
            return Ok(AttackOutcome::Failed(FailureReason::BoundExceeded));
        }

        let mut rows = basis.into_rows();
        let reducer = LllReducer::new(self.delta.clone()).with_max_steps(self.max_steps);
        let stats = match reducer.reduce(&mut rows, cancel.map(CancelToken::as_atomic)) {
            Ok(stats) => stats,
            Err(LllError::StepBudgetExhausted { .. }) => {
                return Ok(AttackOutcome::Failed(FailureReason::ReductionTimeout))
            }
            Err(LllError::Cancelled) => {
                return Ok(AttackOutcome::Failed(FailureReason::Cancelled))
            }
            Err(err @ LllError::RankDeficient { .. }) => return Err(err.into()),
        };
        debug!(
            "reduction finished: {} steps, {} swaps, {} size reductions",
            stats.steps, stats.swaps, stats.size_reductions
        );

        for row in &rows {
            let h = match descale_row(row, bound) {
                Some(h) => h,
                None => continue,
            };
            for root in integer_roots(&h, bound) {
                if target
                    .exposure
                    .congruence_holds(&target.e, &target.modulus, &root)
                {
                    debug!("hidden block {} validated against the congruence", root);
                    let d = target.exposure.reconstruct(&root);
                    return Ok(AttackOutcome::Recovered { x: root, d });
                }
            }
        }
        Ok(AttackOutcome::Failed(FailureReason::NoValidRoot))
    }

    fn validate(&self, target: &AttackTarget) -> Option<String> {
        if self.m < 1 {
            return Some(format!("lattice parameter m must be >= 1, got {}", self.m));
        }
        if target.e <= 0 {
            return Some("public exponent e must be positive".into());
        }
        if target.modulus <= 0 {
            return Some("congruence modulus M must be positive".into());
        }
        if target.exposure.bound <= 0 {
            return Some("root bound X must be positive".into());
        }
        if target.exposure.d0 < 0 {
            return Some("known fragment d0 must be non-negative".into());
        }
        let quarter = Rational::from((1, 4));
        if self.delta <= quarter || self.delta >= 1 {
            return Some(format!("delta must lie in (1/4, 1), got {}", self.delta));
        }
        let g = Integer::from(target.e.gcd_ref(&target.modulus));
        if g != 1 {
            return Some("e is not invertible modulo M".into());
        }
        None
    }

    /// Rewrites the key equation as a degree-1 polynomial with a small root.
    ///
    /// MSB: f(x) = e*x + (e*d0 - 1) over M itself. LSB: the leading
    /// coefficient e*2^shift shares a factor g with M; after dividing the
    /// congruence through by g the polynomial is made monic over M/g.
    /// Returns `None` when g does not divide the constant term, which means
    /// no integer x can satisfy the congruence at all.
    fn defining_congruence(
        &self,
        target: &AttackTarget,
    ) -> Result<Option<(Polynomial, Integer)>> {
        let e = &target.e;
        let modulus = &target.modulus;
        let exposure = &target.exposure;

        match exposure.kind {
            ExposureKind::Msb => {
                let mut b = Integer::from(e * &exposure.d0);
                b -= 1;
                b = b.rem_euc(modulus);
                let f = Polynomial::new(vec![b, e.clone()])?;
                Ok(Some((f, modulus.clone())))
            }
            ExposureKind::Lsb => {
                let a = Integer::from(e << exposure.shift);
                let mut b = Integer::from(e * &exposure.d0);
                b -= 1;
                let g = Integer::from(a.gcd_ref(modulus));
                if !b.is_divisible(&g) {
                    return Ok(None);
                }
                let working = Integer::from(modulus.div_exact_ref(&g));
                let a_red = Integer::from(a.div_exact_ref(&g)).rem_euc(&working);
                let b_red = Integer::from(b.div_exact_ref(&g)).rem_euc(&working);
                // a/g and M/g are coprime: g absorbs the full shared power
                // of every common prime.
                let inv = mod_inverse(&a_red, &working)
                    .ok_or_else(|| anyhow!("reduced leading coefficient not invertible"))?;
                let c = Integer::from(&inv * &b_red).rem_euc(&working);
                let f = Polynomial::new(vec![c, Integer::from(1)])?;
                Ok(Some((f, working)))
            }
        }
    }

    /// Dimension-1 case: the congruence determines x modulo the working
    /// modulus, so the two representatives nearest zero are the only
    /// candidates.
    fn solve_direct(
        &self,
        f: &Polynomial,
        working_modulus: &Integer,
        target: &AttackTarget,
    ) -> Result<AttackOutcome> {
        let inv = mod_inverse(f.leading(), working_modulus)
            .ok_or_else(|| anyhow!("leading coefficient not invertible in direct solve"))?;
        let x0 = (-Integer::from(&inv * &f.coeffs()[0])).rem_euc(working_modulus);
        let mut candidates = vec![x0.clone(), x0 - working_modulus];
        candidates.sort_by_key(|c| Integer::from(c.abs_ref()));

        for candidate in candidates {
            if Integer::from(candidate.abs_ref()) >= target.exposure.bound {
                continue;
            }
            if target
                .exposure
                .congruence_holds(&target.e, &target.modulus, &candidate)
            {
                let d = target.exposure.reconstruct(&candidate);
                return Ok(AttackOutcome::Recovered { x: candidate, d });
            }
        }
        Ok(AttackOutcome::Failed(FailureReason::NoValidRoot))
    }
}

/// Howgrave-Graham feasibility: a reduced vector is short enough to vanish
/// over the integers only when
/// (4/(4*delta-1))^(n(n-1)) * det^4 * n^(2n) < M^(4nm).
fn feasibility_holds(det: &Integer, modulus: &Integer, n: u32, m: u32, delta: &Rational) -> bool {
    let spread = Rational::from(4) / (Rational::from(4) * delta.clone() - Rational::from(1));
    let mut lhs = spread.pow(n * (n - 1));
    lhs *= Rational::from(Integer::from(det.abs_ref()).pow(4));
    lhs *= Rational::from(Integer::from(n).pow(2 * n));
    let rhs = Rational::from(Integer::from(modulus.pow(4 * n * m)));
    lhs < rhs
}

/// Suggested (m, t) for a given prime bit length: small keys reduce fast
/// with a 3-dimensional lattice, larger ones need more rows for the
/// feasibility bound to hold.
pub fn recommended_parameters(bit_length: u32) -> (u32, u32) {
    if bit_length <= 20 {
        (2, 1)
    } else if bit_length <= 30 {
        (3, 2)
    } else {
        (4, 2)
    }
}

#[derive(Debug, Clone)]
pub struct SweepAttempt {
    pub m: u32,
    pub t: u32,
    pub reason: FailureReason,
}

#[derive(Debug)]
pub struct SweepReport {
    pub outcome: AttackOutcome,
    /// The (m, t) pair that recovered the key, when one did.
    pub winner: Option<(u32, u32)>,
    pub attempts: Vec<SweepAttempt>,
}

/// Runs the attack over a grid of (m, t) pairs on a pool of worker threads,
/// stopping the remaining work as soon as one pair recovers the key.
pub fn sweep(
    target: &AttackTarget,
    grid: &[(u32, u32)],
    delta: &Rational,
    max_steps: Option<u64>,
    threads: usize,
) -> Result<SweepReport> {
    if grid.is_empty() {
        bail!("sweep grid is empty");
    }
    let threads = threads.max(1).min(grid.len());
    let token = CancelToken::new();
    let next = AtomicUsize::new(0);

    type Hit = (u32, u32, Integer, Integer);
    let worker_results: Vec<Result<(Option<Hit>, Vec<SweepAttempt>)>> = thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            let token = &token;
            let next = &next;
            handles.push(s.spawn(
                move || -> Result<(Option<Hit>, Vec<SweepAttempt>)> {
                    let mut attempts = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        if i >= grid.len() || token.is_cancelled() {
                            return Ok((None, attempts));
                        }
                        let (m, t) = grid[i];
                        debug!("sweep trying m={} t={}", m, t);
                        let attack = CoppersmithAttack::new(m, t)
                            .with_delta(delta.clone())
                            .with_max_steps(max_steps);
                        match attack.run_cancellable(target, Some(token))? {
                            AttackOutcome::Recovered { x, d } => {
                                token.cancel();
                                return Ok((Some((m, t, x, d)), attempts));
                            }
                            AttackOutcome::Failed(reason) => {
                                attempts.push(SweepAttempt { m, t, reason })
                            }
                        }
                    }
                },
            ));
        }
        handles
            .into_iter()
            .map(|h| h.join().expect("sweep worker panicked"))
            .collect()
    });

    let mut attempts = Vec::new();
    let mut hit: Option<Hit> = None;
    for result in worker_results {
        let (won, worker_attempts) = result?;
        attempts.extend(worker_attempts);
        if hit.is_none() {
            hit = won;
        }
    }

    if let Some((m, t, x, d)) = hit {
        return Ok(SweepReport {
            outcome: AttackOutcome::Recovered { x, d },
            winner: Some((m, t)),
            attempts,
        });
    }
    let reason = attempts
        .iter()
        .map(|a| a.reason.clone())
        .max_by_key(failure_priority)
        .unwrap_or(FailureReason::Cancelled);
    Ok(SweepReport {
        outcome: AttackOutcome::Failed(reason),
        winner: None,
        attempts,
    })
}

/// Orders failures by how close the attempt got: a clean reduction with no
/// valid root outranks a timeout, which outranks an infeasible lattice.
fn failure_priority(reason: &FailureReason) -> u8 {
    match reason {
        FailureReason::NoValidRoot => 5,
        FailureReason::ReductionTimeout => 4,
        FailureReason::AttemptsExhausted => 3,
        FailureReason::BoundExceeded => 2,
        FailureReason::InvalidParameters(_) => 1,
        FailureReason::Cancelled => 0,
    }
}
