//! Prune fragments none of whose refinements can be significant.
//!
//! Refining a fragment only ever removes compounds from its matching set, so
//! the best score any refinement can reach is bounded by the best score over
//! all sub-multisets of the current matching set. Both tests are convex (χ²)
//! or monotone (KS) in the right quantities, which makes that maximum cheap
//! to find:
//!
//! - χ²: the maximum over the box `0 <= a_c <= observed_c` lies on a vertex,
//!   i.e. on some subset of classes kept whole (Morishita & Sese, 2000).
//! - KS: the statistic is at most 1, so the score is bounded by the one
//!   reached with D = 1 at the most balanced admissible split.
//!
//! The dynamic variant additionally requires every refinement to keep at
//! least the minimum frequency, cutting the box with the half-space
//! `Σ a_c >= lo`; its vertices are those of the box plus the points where the
//! hyperplane crosses a box edge.

use bit_set::BitSet;
use clap::ValueEnum;

use crate::significance::{chi_square, effective_size, kolmogorov_q, Labels};

/// Type of upper bound used to prune the search.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Bound {
    /// Prune a fragment's refinements once the best score reachable by any
    /// subset of its matching compounds falls below the threshold.
    Significance,
    /// Like `Significance`, but only subsets whose weighted size reaches the
    /// minimum frequency are considered, which tightens the bound for
    /// fragments close to the frequency limit.
    Dynamic,
}

/// Bounds are not computed for more classes than this; more classes give an
/// infinite bound (no pruning).
pub const MAX_BOUND_CLASSES: usize = 12;

/// Upper bound on the score of any refinement of a fragment matching
/// `matching`, where refinements must keep a weighted support of at least
/// `min_support` (use 0 for no such requirement).
pub fn upper_bound(labels: &Labels, matching: &BitSet, min_support: u64) -> f64 {
    match labels {
        Labels::Categorical(classes) => {
            chi_square_bound(&classes.observed(matching), classes.totals(), min_support)
        }
        Labels::Continuous(activities) => ks_bound(
            activities.total(),
            activities.matched_weight(matching),
            min_support,
        ),
    }
}

/// Maximum χ² over `{a : 0 <= a <= observed, Σ a >= lo}`.
pub fn chi_square_bound(observed: &[u64], totals: &[u64], lo: u64) -> f64 {
    let k = observed.len();
    if k > MAX_BOUND_CLASSES {
        return f64::INFINITY;
    }
    if observed.iter().sum::<u64>() < lo {
        return 0.0;
    }

    let mut best = 0.0f64;
    let mut point = vec![0.0; k];
    for mask in 0u32..(1 << k) {
        let mut kept = 0;
        for c in 0..k {
            if mask & (1 << c) != 0 {
                point[c] = observed[c] as f64;
                kept += observed[c];
            } else {
                point[c] = 0.0;
            }
        }
        if kept >= lo {
            best = best.max(chi_square(&point, totals));
            continue;
        }

        // Walk each box edge leaving this vertex until Σ a reaches lo.
        let need = lo - kept;
        for c in 0..k {
            if mask & (1 << c) == 0 && observed[c] > need {
                point[c] = need as f64;
                best = best.max(chi_square(&point, totals));
                point[c] = 0.0;
            }
        }
    }
    best
}

/// Maximum KS score reachable by a matching multiset of weight at most
/// `matched` and at least `lo`, out of `total`.
pub fn ks_bound(total: u64, matched: u64, lo: u64) -> f64 {
    if total < 2 {
        return 0.0;
    }
    let lo = lo.max(1);
    let hi = matched.min(total - 1);
    if hi < lo {
        return 0.0;
    }
    let half = total / 2;
    let en = [half, half + 1]
        .iter()
        .map(|m| (*m).clamp(lo, hi))
        .map(|m| effective_size(m, total - m))
        .fold(0.0, f64::max);
    1.0 - kolmogorov_q(en + 0.12 + 0.11 / en)
}
