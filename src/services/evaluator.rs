//! Significance evaluator: two-proportion z-test over variant counters.
//!
//! Evaluation is a pure function of the cached counters plus the test's
//! `min_sample_size` and `confidence_level`, so repeated calls over the same
//! data always return the same verdict. Results are advisory; they never
//! change test state on their own.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{compute_rate, TestStatus, Variant};
use crate::domain::ports::TestRepository;

/// Per-variant figures included in an evaluation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantStats {
    pub variant_id: Uuid,
    pub name: String,
    pub is_control: bool,
    pub impressions: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
}

impl VariantStats {
    fn from_variant(variant: &Variant) -> Self {
        Self {
            variant_id: variant.id,
            name: variant.name.clone(),
            is_control: variant.is_control,
            impressions: variant.impressions,
            conversions: variant.conversions,
            conversion_rate: compute_rate(variant.conversions, variant.impressions),
        }
    }
}

/// Outcome of a significance evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "winner_id")]
pub enum Verdict {
    /// At least one variant is below the test's minimum sample size.
    InsufficientData,
    /// Samples are adequate but the observed difference is within noise.
    NoSignificantDifference,
    /// A non-control variant is significantly different from the control at
    /// the configured confidence level; the highest-rate such variant.
    Winner(Uuid),
}

/// Full evaluation report for a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub test_id: Uuid,
    pub test_name: String,
    pub status: TestStatus,
    pub min_sample_size: u32,
    pub confidence_level: f64,
    pub verdict: Verdict,
    /// Two-tailed p-value of the winner's comparison against the control,
    /// or the closest-to-significant comparison when there is no winner.
    pub p_value: Option<f64>,
    pub variants: Vec<VariantStats>,
}

pub struct SignificanceEvaluator<T: TestRepository> {
    test_repo: Arc<T>,
}

impl<T: TestRepository> SignificanceEvaluator<T> {
    pub fn new(test_repo: Arc<T>) -> Self {
        Self { test_repo }
    }

    /// Evaluate a test's current counters. Valid for running and terminal
    /// tests; draft tests have nothing to evaluate.
    pub async fn evaluate(&self, test_id: Uuid) -> EngineResult<Evaluation> {
        let loaded = self
            .test_repo
            .get_with_variants(test_id)
            .await?
            .ok_or_else(|| EngineError::test_not_found(test_id))?;

        if loaded.test.status == TestStatus::Draft {
            return Err(EngineError::Precondition(format!(
                "test {test_id} is in draft; start it before evaluating"
            )));
        }

        let (verdict, p_value) = decide(
            &loaded.variants,
            loaded.test.min_sample_size,
            loaded.test.confidence_level,
        );
        debug!(test_id = %test_id, verdict = ?verdict, "evaluated test");

        Ok(Evaluation {
            test_id,
            test_name: loaded.test.name.clone(),
            status: loaded.test.status,
            min_sample_size: loaded.test.min_sample_size,
            confidence_level: loaded.test.confidence_level,
            verdict,
            p_value,
            variants: loaded.variants.iter().map(VariantStats::from_variant).collect(),
        })
    }
}

/// Pure verdict computation over a variant set.
///
/// Every variant must reach `min_sample_size` impressions before any verdict
/// beyond `InsufficientData` is reachable. Each non-control variant is then
/// tested against the control; among the variants that clear the significance
/// threshold, the one with the highest conversion rate wins, with rate ties
/// breaking toward the lowest variant id so the answer is deterministic.
pub fn decide(variants: &[Variant], min_sample_size: u32, confidence_level: f64) -> (Verdict, Option<f64>) {
    if variants.is_empty()
        || variants.iter().any(|v| v.impressions < u64::from(min_sample_size))
    {
        return (Verdict::InsufficientData, None);
    }

    let Some(control) = variants.iter().find(|v| v.is_control) else {
        return (Verdict::InsufficientData, None);
    };

    let alpha = 1.0 - confidence_level;
    let mut closest_p: Option<f64> = None;
    let mut winner: Option<(&Variant, f64, f64)> = None;

    for variant in variants.iter().filter(|v| !v.is_control) {
        let p = two_proportion_p_value(
            control.conversions,
            control.impressions,
            variant.conversions,
            variant.impressions,
        );
        closest_p = Some(closest_p.map_or(p, |best| best.min(p)));
        if p > alpha {
            continue;
        }

        let rate = compute_rate(variant.conversions, variant.impressions);
        let leads = match winner {
            None => true,
            Some((current, current_rate, _)) => {
                rate > current_rate || (rate == current_rate && variant.id < current.id)
            }
        };
        if leads {
            winner = Some((variant, rate, p));
        }
    }

    match winner {
        Some((variant, _, p)) => (Verdict::Winner(variant.id), Some(p)),
        None => (Verdict::NoSignificantDifference, closest_p),
    }
}

/// Two-tailed p-value of a two-proportion z-test with a pooled standard
/// error. Degenerate inputs (empty samples, zero pooled variance) report
/// p = 1.0 rather than a spurious significance.
pub fn two_proportion_p_value(c_a: u64, n_a: u64, c_b: u64, n_b: u64) -> f64 {
    if n_a == 0 || n_b == 0 {
        return 1.0;
    }

    let rate_a = c_a as f64 / n_a as f64;
    let rate_b = c_b as f64 / n_b as f64;

    let pooled = (c_a + c_b) as f64 / (n_a + n_b) as f64;
    let variance = pooled * (1.0 - pooled) * (1.0 / n_a as f64 + 1.0 / n_b as f64);
    if variance <= 0.0 {
        return 1.0;
    }

    let z = (rate_b - rate_a) / variance.sqrt();
    2.0 * (1.0 - normal_cdf(z.abs()))
}

/// Standard normal CDF via the Abramowitz & Stegun erf approximation
/// (formula 7.1.26, max absolute error 1.5e-7).
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t) * (-x * x).exp();
    sign * y
}
