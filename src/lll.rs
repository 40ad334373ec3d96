//! Exact-arithmetic LLL lattice reduction
//!
//! Gram-Schmidt coefficients are kept as `rug::Rational`, never floats:
//! basis entries reach magnitudes around M^m * X^(n-1), far beyond what
//! floating point can orthogonalize stably.

use rug::{Integer, Rational};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub enum LllError {
    /// The input rows are linearly dependent. Lattices produced by the
    /// builder are full rank by construction, so this is a caller defect,
    /// not an expected attack outcome.
    RankDeficient { index: usize },
    /// The step budget ran out before the basis converged.
    StepBudgetExhausted { steps: u64 },
    /// A cooperative cancellation request was observed between steps.
    Cancelled,
}

impl fmt::Display for LllError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LllError::RankDeficient { index } => {
                write!(f, "basis is rank deficient at row {}", index)
            }
            LllError::StepBudgetExhausted { steps } => {
                write!(f, "reduction did not converge within {} steps", steps)
            }
            LllError::Cancelled => write!(f, "reduction cancelled"),
        }
    }
}

impl Error for LllError {}

#[derive(Debug, Clone, Default)]
pub struct LllStats {
    /// Iterations of the main loop, each handling one index k. A full pass
    /// over an n-row basis takes at least n-1 of these.
    pub steps: u64,
    pub swaps: u64,
    pub size_reductions: u64,
}

pub struct LllReducer {
    delta: Rational,
    max_steps: Option<u64>,
}

impl LllReducer {
    /// `delta` must lie in (1/4, 1); the attack layer validates this before
    /// construction.
    pub fn new(delta: Rational) -> Self {
        Self {
            delta,
            max_steps: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Reduces `basis` in place until it is size-reduced and satisfies the
    /// Lovász condition for `delta`. Rows end up ordered so that row 0 is
    /// short by the LLL guarantee.
    pub fn reduce(
        &self,
        basis: &mut [Vec<Integer>],
        cancel: Option<&AtomicBool>,
    ) -> Result<LllStats, LllError> {
        let mut stats = LllStats::default();
        let dim = basis.len();
        if dim <= 1 {
            return Ok(stats);
        }
        let vec_len = basis[0].len();
        let half = Rational::from((1, 2));

        let mut k = 1usize;
        while k < dim {
            stats.steps += 1;
            if let Some(cap) = self.max_steps {
                if stats.steps > cap {
                    return Err(LllError::StepBudgetExhausted { steps: cap });
                }
            }
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    return Err(LllError::Cancelled);
                }
            }

            for j in (0..k).rev() {
                let (mu, _) = gram_schmidt(basis)?;
                if Rational::from(mu[k][j].abs_ref()) > half {
                    let (_, q) = mu[k][j].clone().fract_round(Integer::new());
                    if q != 0 {
                        let row_j = basis[j].clone();
                        for idx in 0..vec_len {
                            basis[k][idx] -= &q * &row_j[idx];
                        }
                        stats.size_reductions += 1;
                    }
                }
            }

            let (mu, norms) = gram_schmidt(basis)?;
            let mu_k = mu[k][k - 1].clone();
            let lhs = norms[k].clone();
            let rhs = (self.delta.clone() - Rational::from(&mu_k * &mu_k)) * norms[k - 1].clone();
            if lhs < rhs {
                basis.swap(k, k - 1);
                stats.swaps += 1;
                k = k.saturating_sub(1).max(1);
            } else {
                k += 1;
            }
        }
        Ok(stats)
    }
}

/// Gram-Schmidt projection coefficients and squared norms of the
/// orthogonalized vectors, computed exactly from the current basis.
pub fn gram_schmidt(
    basis: &[Vec<Integer>],
) -> Result<(Vec<Vec<Rational>>, Vec<Rational>), LllError> {
    let dim = basis.len();
    let vec_len = basis[0].len();
    let mut b_star = vec![vec![Rational::new(); vec_len]; dim];
    let mut mu = vec![vec![Rational::new(); dim]; dim];
    let mut norms = vec![Rational::new(); dim];

    for i in 0..dim {
        let mut v: Vec<Rational> = basis[i].iter().map(|x| Rational::from(x)).collect();
        for j in 0..i {
            let dot = dot_int_rat(&basis[i], &b_star[j]);
            mu[i][j] = dot / norms[j].clone();
            for k in 0..vec_len {
                v[k] -= mu[i][j].clone() * b_star[j][k].clone();
            }
        }
        norms[i] = dot_rat(&v, &v);
        if norms[i] == 0 {
            return Err(LllError::RankDeficient { index: i });
        }
        b_star[i] = v;
    }

    Ok((mu, norms))
}

/// Checks the two LLL output conditions: |mu_ij| <= 1/2 for i > j, and the
/// Lovász condition between consecutive rows.
pub fn satisfies_lll(basis: &[Vec<Integer>], delta: &Rational) -> Result<bool, LllError> {
    let (mu, norms) = gram_schmidt(basis)?;
    let half = Rational::from((1, 2));
    for i in 1..basis.len() {
        for j in 0..i {
            if Rational::from(mu[i][j].abs_ref()) > half {
                return Ok(false);
            }
        }
        let mu_k = mu[i][i - 1].clone();
        let rhs = (delta.clone() - Rational::from(&mu_k * &mu_k)) * norms[i - 1].clone();
        if norms[i] < rhs {
            return Ok(false);
        }
    }
    Ok(true)
}

fn dot_int_rat(a: &[Integer], b: &[Rational]) -> Rational {
    a.iter().zip(b.iter()).fold(Rational::new(), |acc, (ai, bi)| {
        acc + Rational::from(ai) * bi.clone()
    })
}

fn dot_rat(a: &[Rational], b: &[Rational]) -> Rational {
    a.iter()
        .zip(b.iter())
        .fold(Rational::new(), |acc, (ai, bi)| acc + ai.clone() * bi.clone())
}
