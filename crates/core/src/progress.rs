//! Weighted earned/possible roll-ups shared by homework, exercise and lesson
//! progress views.

use serde::{Deserialize, Serialize};

/// One earned/possible pair. Either side may be missing in raw data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    pub earned: Option<f64>,
    pub possible: Option<f64>,
}

impl ScorePair {
    pub fn new(earned: f64, possible: f64) -> Self {
        Self {
            earned: Some(earned),
            possible: Some(possible),
        }
    }
}

/// Aggregate of earned and possible points.
///
/// `percentage` is `round(earned / possible * 100)` when `possible > 0`,
/// otherwise `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub earned: f64,
    pub possible: f64,
    pub percentage: u32,
}

impl ProgressSummary {
    /// Build from already-summed totals, clamping bad inputs to zero.
    pub fn from_totals(earned: f64, possible: f64) -> Self {
        let earned = sanitize(Some(earned));
        let possible = sanitize(Some(possible));
        Self {
            earned,
            possible,
            percentage: percentage(earned, possible),
        }
    }

    /// Completion progress for count-based views (lessons, exercises).
    pub fn from_counts(done: usize, total: usize) -> Self {
        Self::from_totals(done as f64, total as f64)
    }

    /// Fold another pair into this summary. Sums saturate at `f64::MAX`.
    pub fn add(&mut self, pair: ScorePair) {
        self.earned = (self.earned + sanitize(pair.earned)).min(f64::MAX);
        self.possible = (self.possible + sanitize(pair.possible)).min(f64::MAX);
        self.percentage = percentage(self.earned, self.possible);
    }
}

/// Roll a set of earned/possible pairs into a single summary.
///
/// Missing, negative, NaN and infinite values count as zero. The result never
/// carries NaN or infinity; an empty input yields all zeros.
pub fn rollup<I>(pairs: I) -> ProgressSummary
where
    I: IntoIterator<Item = ScorePair>,
{
    let mut summary = ProgressSummary::default();
    for pair in pairs {
        summary.add(pair);
    }
    summary
}

fn sanitize(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

fn percentage(earned: f64, possible: f64) -> u32 {
    if possible <= 0.0 {
        return 0;
    }
    let pct = (earned / possible * 100.0).round();
    if pct.is_finite() && pct > 0.0 {
        pct as u32
    } else {
        0
    }
}
