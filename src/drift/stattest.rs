//! Default drift oracle built from two classic per-feature tests.
//!
//! Numeric columns are compared with the two-sample Kolmogorov–Smirnov test
//! (asymptotic p-value); everything else with the Jensen–Shannon distance
//! between category frequencies.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::common::config::DriftSettings;
use crate::common::error::ShipResult;
use crate::data::domain::{Column, ColumnKind, ColumnValues, Dataset};

use super::domain::{DriftOracle, DriftReport, FeatureDrift, StatTest};

/// Oracle comparing every column present in both datasets.
#[derive(Clone, Debug, Default)]
pub struct StatTestOracle {
    settings: DriftSettings,
}

impl StatTestOracle {
    pub fn new(settings: DriftSettings) -> Self {
        Self { settings }
    }

    fn compare(&self, reference: &Column, production: &Column) -> FeatureDrift {
        match (&reference.values, &production.values) {
            (ColumnValues::Numeric(a), ColumnValues::Numeric(b)) => {
                let a: Vec<f64> = a.iter().flatten().copied().filter(|x| x.is_finite()).collect();
                let b: Vec<f64> = b.iter().flatten().copied().filter(|x| x.is_finite()).collect();
                let p_value = ks_p_value(&a, &b);
                FeatureDrift {
                    column_type: ColumnKind::Numerical,
                    stattest: StatTest::Ks,
                    threshold: self.settings.ks_threshold,
                    drift_score: p_value,
                    drift_detected: StatTest::Ks.is_drift(p_value, self.settings.ks_threshold),
                }
            }
            (a, b) => {
                let distance = jensen_shannon_distance(&frequencies(a), &frequencies(b));
                FeatureDrift {
                    column_type: ColumnKind::Categorical,
                    stattest: StatTest::JensenShannon,
                    threshold: self.settings.js_threshold,
                    drift_score: distance,
                    drift_detected: StatTest::JensenShannon
                        .is_drift(distance, self.settings.js_threshold),
                }
            }
        }
    }
}

impl DriftOracle for StatTestOracle {
    fn compute(&self, reference: &Dataset, production: &Dataset) -> ShipResult<DriftReport> {
        let mut per_feature = BTreeMap::new();
        for column in reference.columns() {
            let Some(other) = production.column(&column.name) else {
                debug!(column = %column.name, "column missing from production set, skipped");
                continue;
            };
            let verdict = self.compare(column, other);
            debug!(
                column = %column.name,
                stattest = verdict.stattest.as_str(),
                score = verdict.drift_score,
                drifted = verdict.drift_detected,
                "feature compared"
            );
            per_feature.insert(column.name.clone(), verdict);
        }
        Ok(DriftReport::from_features(per_feature, self.settings.drift_share))
    }
}

/// Two-sample KS statistic: the largest gap between the empirical CDFs.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// Asymptotic p-value of the two-sample KS test. Empty samples give 1.0.
pub fn ks_p_value(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }
    let d = ks_statistic(a, b);
    let (n, m) = (a.len() as f64, b.len() as f64);
    let en = (n * m / (n + m)).sqrt();
    kolmogorov_q((en + 0.12 + 0.11 / en) * d)
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_q(lambda: f64) -> f64 {
    const EPS1: f64 = 1e-3;
    const EPS2: f64 = 1e-8;

    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;
    for j in 1..=100 {
        let j = j as f64;
        let term = fac * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= EPS1 * previous || term.abs() <= EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }
    // No convergence only happens for lambda near zero.
    1.0
}

fn frequencies(values: &ColumnValues) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in 0..values.len() {
        if let Some(cell) = values.text_at(row) {
            *counts.entry(category_key(cell)).or_insert(0) += 1;
        }
    }
    counts
}

/// Numeric-looking cells are keyed by their `f64` rendering so "2", "2.0"
/// and a numeric 2 land in the same bucket.
fn category_key(cell: String) -> String {
    match cell.trim().parse::<f64>() {
        Ok(x) if x.is_finite() => x.to_string(),
        _ => cell,
    }
}

/// Jensen–Shannon distance (natural log) between two frequency tables.
/// Lies in `[0, sqrt(ln 2)]`; an empty table gives 0.
pub fn jensen_shannon_distance(p: &BTreeMap<String, usize>, q: &BTreeMap<String, usize>) -> f64 {
    let p_total: usize = p.values().sum();
    let q_total: usize = q.values().sum();
    if p_total == 0 || q_total == 0 {
        return 0.0;
    }

    let categories: BTreeSet<&String> = p.keys().chain(q.keys()).collect();
    let mut divergence = 0.0;
    for category in categories {
        let pi = p.get(category).copied().unwrap_or(0) as f64 / p_total as f64;
        let qi = q.get(category).copied().unwrap_or(0) as f64 / q_total as f64;
        let mi = 0.5 * (pi + qi);
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mi).ln();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mi).ln();
        }
    }
    divergence.max(0.0).sqrt()
}
