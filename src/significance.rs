//! Score fragments against compound activities.
//!
//! Categorical activities (every distinct value is a class) are tested with a
//! chi-square test on the 2×k table of fragment presence against class;
//! continuous activities are tested with a two-sample Kolmogorov–Smirnov test
//! between the activities of matching and non-matching compounds. Weights
//! act as multiplicities in both tests.

use bit_set::BitSet;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::MiningError;

/// Whether a fragment is associated with higher or lower activity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Activating,
    Deactivating,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Activating => write!(f, "activating"),
            Direction::Deactivating => write!(f, "deactivating"),
        }
    }
}

/// Outcome of testing one fragment.
///
/// `score` is what gets compared against the threshold: the chi-square value
/// itself for categorical labels and `1 - p` for the KS test.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Significance {
    pub statistic: f64,
    pub p_value: f64,
    pub score: f64,
    pub direction: Direction,
}

/// Class labels, one class per distinct activity value.
#[derive(Debug, Clone)]
pub struct Classes {
    values: Vec<f64>,
    class_of: Vec<usize>,
    multiplicity: Vec<u64>,
    totals: Vec<u64>,
    total: u64,
    distribution: Option<ChiSquared>,
}

/// Continuous activities.
#[derive(Debug, Clone)]
pub struct Activities {
    values: Vec<f64>,
    multiplicity: Vec<u64>,
    order: Vec<usize>,
    total: u64,
}

/// The activity labels of all compounds, indexed by store slot.
#[derive(Debug, Clone)]
pub enum Labels {
    Categorical(Classes),
    Continuous(Activities),
}

impl Labels {
    /// Treat every distinct value in `values` as a class.
    pub fn categorical(values: &[f64], multiplicity: &[u64]) -> Self {
        let mut classes: Vec<f64> = values.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        let class_of: Vec<usize> = values
            .iter()
            .map(|v| classes.partition_point(|c| c < v))
            .collect();
        let mut totals = vec![0; classes.len()];
        for (c, m) in class_of.iter().zip(multiplicity) {
            totals[*c] += m;
        }
        let distribution = if classes.len() >= 2 {
            ChiSquared::new((classes.len() - 1) as f64).ok()
        } else {
            None
        };
        Labels::Categorical(Classes {
            values: classes,
            class_of,
            multiplicity: multiplicity.to_vec(),
            total: totals.iter().sum(),
            totals,
            distribution,
        })
    }

    pub fn continuous(values: &[f64], multiplicity: &[u64]) -> Self {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));
        Labels::Continuous(Activities {
            values: values.to_vec(),
            multiplicity: multiplicity.to_vec(),
            order,
            total: multiplicity.iter().sum(),
        })
    }

    /// Convert a confidence level into a threshold on [`Significance::score`].
    /// `None` means nothing is filtered.
    pub fn critical_value(&self, confidence: f64) -> Result<Option<f64>, MiningError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MiningError::InvalidSetting(format!(
                "significance level {confidence} is not within [0, 1]"
            )));
        }
        if confidence == 0.0 {
            return Ok(None);
        }
        match self {
            Labels::Categorical(classes) => match &classes.distribution {
                Some(_) if confidence >= 1.0 => Ok(Some(f64::INFINITY)),
                Some(dist) => Ok(Some(dist.inverse_cdf(confidence))),
                None => Ok(Some(f64::INFINITY)),
            },
            Labels::Continuous(_) => Ok(Some(confidence)),
        }
    }

    /// Test the fragment occurring in the compounds of `matching`.
    pub fn evaluate(&self, matching: &BitSet) -> Significance {
        match self {
            Labels::Categorical(classes) => classes.evaluate(matching),
            Labels::Continuous(activities) => activities.evaluate(matching),
        }
    }

    /// Total multiplicity of all compounds.
    pub fn total(&self) -> u64 {
        match self {
            Labels::Categorical(classes) => classes.total,
            Labels::Continuous(activities) => activities.total,
        }
    }
}

impl Classes {
    /// Distinct class values, ascending.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Class index of the compound in `slot`.
    pub fn class_of(&self, slot: usize) -> usize {
        self.class_of[slot]
    }

    /// Multiplicity of every class over all compounds.
    pub fn totals(&self) -> &[u64] {
        &self.totals
    }

    /// Multiplicity of every class among the compounds in `matching`.
    pub fn observed(&self, matching: &BitSet) -> Vec<u64> {
        let mut observed = vec![0; self.values.len()];
        for slot in matching.iter() {
            observed[self.class_of[slot]] += self.multiplicity[slot];
        }
        observed
    }

    fn evaluate(&self, matching: &BitSet) -> Significance {
        let observed = self.observed(matching);
        let a: Vec<f64> = observed.iter().map(|o| *o as f64).collect();
        let statistic = chi_square(&a, &self.totals);
        let p_value = match &self.distribution {
            Some(dist) => (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0),
            None => 1.0,
        };

        let m: u64 = observed.iter().sum();
        let rest = self.total - m;
        let direction = if m == 0 || rest == 0 {
            Direction::Deactivating
        } else {
            let inside: f64 = observed
                .iter()
                .zip(&self.values)
                .map(|(o, v)| *o as f64 * v)
                .sum::<f64>()
                / m as f64;
            let outside: f64 = self
                .totals
                .iter()
                .zip(&observed)
                .zip(&self.values)
                .map(|((t, o), v)| (t - o) as f64 * v)
                .sum::<f64>()
                / rest as f64;
            if inside > outside {
                Direction::Activating
            } else {
                Direction::Deactivating
            }
        };

        Significance {
            statistic,
            p_value,
            score: statistic,
            direction,
        }
    }
}

/// Pearson's chi-square for a 2×k table whose first row is `a` and whose
/// column totals are `totals`. Rows or columns without expectation add
/// nothing.
pub fn chi_square(a: &[f64], totals: &[u64]) -> f64 {
    let n: f64 = totals.iter().sum::<u64>() as f64;
    let m: f64 = a.iter().sum();
    if m <= 0.0 || m >= n {
        return 0.0;
    }
    a.iter()
        .zip(totals)
        .filter(|(_, t)| **t > 0)
        .map(|(a, t)| {
            let t = *t as f64;
            let expected = m * t / n;
            let dev = a - expected;
            dev * dev * n * n / (t * m * (n - m))
        })
        .sum()
}

impl Activities {
    /// Total multiplicity of all compounds.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Total multiplicity of the compounds in `matching`.
    pub fn matched_weight(&self, matching: &BitSet) -> u64 {
        matching.iter().map(|s| self.multiplicity[s]).sum()
    }

    fn evaluate(&self, matching: &BitSet) -> Significance {
        let n_a = self.matched_weight(matching);
        let n_b = self.total - n_a;
        if n_a == 0 || n_b == 0 {
            return Significance {
                statistic: 0.0,
                p_value: 1.0,
                score: 0.0,
                direction: Direction::Deactivating,
            };
        }

        // Sweep the pooled sample in ascending order, moving past all ties
        // before comparing the two empirical distribution functions.
        let (mut f_a, mut f_b, mut d) = (0.0f64, 0.0f64, 0.0f64);
        let mut i = 0;
        while i < self.order.len() {
            let value = self.values[self.order[i]];
            while i < self.order.len() && self.values[self.order[i]] == value {
                let slot = self.order[i];
                let w = self.multiplicity[slot] as f64;
                if matching.contains(slot) {
                    f_a += w / n_a as f64;
                } else {
                    f_b += w / n_b as f64;
                }
                i += 1;
            }
            d = d.max((f_a - f_b).abs());
        }

        let p_value = ks_p_value(d, n_a, n_b);
        let inside = self.weighted_median(|s| matching.contains(s));
        let outside = self.weighted_median(|s| !matching.contains(s));
        Significance {
            statistic: d,
            p_value,
            score: 1.0 - p_value,
            direction: if inside > outside {
                Direction::Activating
            } else {
                Direction::Deactivating
            },
        }
    }

    fn weighted_median(&self, include: impl Fn(usize) -> bool) -> f64 {
        let sample: Vec<(f64, u64)> = self
            .order
            .iter()
            .filter(|s| include(**s))
            .map(|s| (self.values[*s], self.multiplicity[*s]))
            .collect();
        let total: u64 = sample.iter().map(|(_, m)| m).sum();
        if total == 0 {
            return f64::NAN;
        }
        let nth = |k: u64| {
            let mut seen = 0;
            for (v, m) in &sample {
                seen += m;
                if seen > k {
                    return *v;
                }
            }
            f64::NAN
        };
        if total % 2 == 1 {
            nth(total / 2)
        } else {
            (nth(total / 2 - 1) + nth(total / 2)) / 2.0
        }
    }
}

/// Asymptotic p-value of a two-sample KS statistic `d` for sample sizes
/// `n_a` and `n_b`, with the usual small-sample correction.
pub fn ks_p_value(d: f64, n_a: u64, n_b: u64) -> f64 {
    let en = effective_size(n_a, n_b);
    kolmogorov_q((en + 0.12 + 0.11 / en) * d)
}

pub(crate) fn effective_size(n_a: u64, n_b: u64) -> f64 {
    let (a, b) = (n_a as f64, n_b as f64);
    (a * b / (a + b)).sqrt()
}

/// Kolmogorov distribution tail `Q(λ) = 2 Σ (-1)^(j-1) exp(-2 j² λ²)`.
pub fn kolmogorov_q(lambda: f64) -> f64 {
    const EPS1: f64 = 0.001;
    const EPS2: f64 = 1.0e-8;
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0f64;
    for j in 1..=100 {
        let term = fac * (a2 * (j * j) as f64).exp();
        sum += term;
        if term.abs() <= EPS1 * previous || term.abs() <= EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }
    // No convergence: λ is tiny and the tail is 1.
    1.0
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn set(slots: &[usize]) -> BitSet {
        slots.iter().copied().collect()
    }

    #[test]
    fn chi_square_two_by_two() {
        // 3 actives, 3 inactives; fragment in all actives only.
        let labels = Labels::categorical(&[1.0, 1.0, 1.0, 0.0, 0.0, 0.0], &[1; 6]);
        let sig = labels.evaluate(&set(&[0, 1, 2]));
        assert_relative_eq!(sig.statistic, 6.0, epsilon = 1e-12);
        assert_eq!(sig.direction, Direction::Activating);
        assert!(sig.p_value < 0.05);

        let sig = labels.evaluate(&set(&[3, 4]));
        assert_relative_eq!(sig.statistic, 3.0, epsilon = 1e-12);
        assert_eq!(sig.direction, Direction::Deactivating);
    }

    #[test]
    fn chi_square_is_zero_without_split() {
        let labels = Labels::categorical(&[1.0, 0.0], &[1, 1]);
        assert_eq!(labels.evaluate(&set(&[0, 1])).statistic, 0.0);
        assert_eq!(labels.evaluate(&set(&[])).statistic, 0.0);
        assert_eq!(labels.evaluate(&set(&[0, 1])).direction, Direction::Deactivating);
    }

    #[test]
    fn weights_are_multiplicities() {
        let weighted = Labels::categorical(&[1.0, 0.0], &[3, 1]);
        let expanded = Labels::categorical(&[1.0, 1.0, 1.0, 0.0], &[1; 4]);
        assert_relative_eq!(
            weighted.evaluate(&set(&[0])).statistic,
            expanded.evaluate(&set(&[0, 1, 2])).statistic,
            epsilon = 1e-12
        );
    }

    #[test]
    fn critical_values() {
        let labels = Labels::categorical(&[1.0, 0.0], &[1, 1]);
        let critical = labels.critical_value(0.95).unwrap().unwrap();
        assert_relative_eq!(critical, 3.841458820694124, epsilon = 1e-3);
        assert_eq!(labels.critical_value(0.0).unwrap(), None);
        assert!(labels.critical_value(1.5).is_err());

        let single = Labels::categorical(&[1.0, 1.0], &[1, 1]);
        assert_eq!(single.critical_value(0.95).unwrap(), Some(f64::INFINITY));

        let continuous = Labels::continuous(&[0.5, 1.5], &[1, 1]);
        assert_eq!(continuous.critical_value(0.9).unwrap(), Some(0.9));
    }

    #[test]
    fn kolmogorov_tail() {
        assert_relative_eq!(kolmogorov_q(0.0), 1.0);
        assert_relative_eq!(kolmogorov_q(1.0), 0.26999967, epsilon = 1e-6);
        assert!(kolmogorov_q(3.0) < 1e-6);
    }

    #[test]
    fn ks_separated_samples() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let labels = Labels::continuous(&values, &[1; 8]);
        let high = labels.evaluate(&set(&[4, 5, 6, 7]));
        assert_relative_eq!(high.statistic, 1.0);
        assert_eq!(high.direction, Direction::Activating);
        assert_relative_eq!(high.score, 1.0 - high.p_value);

        let low = labels.evaluate(&set(&[0, 1, 2, 3]));
        assert_relative_eq!(low.statistic, 1.0);
        assert_eq!(low.direction, Direction::Deactivating);

        let mixed = labels.evaluate(&set(&[0, 2, 4, 6]));
        assert_relative_eq!(mixed.statistic, 0.25);
        assert!(mixed.score < high.score);
    }

    #[test]
    fn ks_ties_move_together() {
        let labels = Labels::continuous(&[1.0, 1.0, 2.0, 2.0], &[1; 4]);
        let sig = labels.evaluate(&set(&[0, 2]));
        assert_relative_eq!(sig.statistic, 0.0);
        assert_eq!(sig.direction, Direction::Deactivating);
    }
}
