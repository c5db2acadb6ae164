//! Streaming aggregation per measurement kind
//!
//! Numeric kinds fold into Welford running statistics, categorical kinds into
//! label frequency tables. Neither keeps raw history, so a session can run
//! for hours at constant memory per kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{MeasurementKind, MeasurementValue};

/// Welford running mean and sample variance
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    /// Sum of squared deviations from the running mean (Welford's M2)
    m2: f64,
    last: Option<f64>,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.last = Some(x);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean; `None` before the first value
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance (n - 1 denominator); 0 for fewer than two values
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }

    /// Sum of squared deviations from the mean
    pub fn sum_squared_deviation(&self) -> f64 {
        self.m2
    }
}

/// Occurrence counts per category label
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryCounter {
    counts: BTreeMap<String, u64>,
}

impl CategoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a categorical value; numeric values are ignored
    pub fn update(&mut self, value: &MeasurementValue) {
        if let MeasurementValue::Category(category) = value {
            self.increment(category.label());
        }
    }

    /// Count a raw label; empty labels are ignored
    pub fn increment(&mut self, label: &str) {
        if label.is_empty() {
            return;
        }
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Most frequent label; ties resolve to the lexically smallest
    pub fn mode(&self) -> Option<&str> {
        let mut best: Option<(&str, u64)> = None;
        for (label, &count) in &self.counts {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((label.as_str(), count)),
            }
        }
        best.map(|(label, _)| label)
    }

    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }
}

/// Both aggregator tables, one entry per kind observed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateTables {
    pub numeric: BTreeMap<MeasurementKind, RunningStats>,
    pub categorical: BTreeMap<MeasurementKind, CategoryCounter>,
}

impl AggregateTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a value to the table its variant belongs to
    pub fn record(&mut self, kind: MeasurementKind, value: &MeasurementValue) {
        match value {
            MeasurementValue::Numeric(x) => self.numeric.entry(kind).or_default().update(*x),
            MeasurementValue::Category(_) => self.categorical.entry(kind).or_default().update(value),
        }
    }

    pub fn numeric(&self, kind: MeasurementKind) -> Option<&RunningStats> {
        self.numeric.get(&kind)
    }

    pub fn categorical(&self, kind: MeasurementKind) -> Option<&CategoryCounter> {
        self.categorical.get(&kind)
    }

    pub fn summary(&self) -> AggregateSummary {
        AggregateSummary {
            numeric: self
                .numeric
                .iter()
                .map(|(kind, stats)| (*kind, NumericSummary::from(stats)))
                .collect(),
            categorical: self
                .categorical
                .iter()
                .map(|(kind, counter)| (*kind, counter.counts().clone()))
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn clear(&mut self) {
        self.numeric.clear();
        self.categorical.clear();
    }
}

/// Export view of one numeric aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: u64,
    pub mean: Option<f64>,
    pub variance: f64,
    pub std_dev: f64,
    pub last: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl From<&RunningStats> for NumericSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            mean: stats.mean(),
            variance: stats.variance(),
            std_dev: stats.std_dev(),
            last: stats.last(),
            unit: None,
        }
    }
}

/// Export view of both aggregator tables
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub numeric: BTreeMap<MeasurementKind, NumericSummary>,
    pub categorical: BTreeMap<MeasurementKind, BTreeMap<String, u64>>,
}

impl AggregateSummary {
    /// Attach the unit of each numeric kind for human-facing output
    pub fn with_units(mut self) -> Self {
        for (kind, summary) in self.numeric.iter_mut() {
            summary.unit = kind.unit().map(str::to_string);
        }
        self
    }
}
