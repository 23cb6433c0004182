// One time bucket's aggregate state.
// Each Option is populated only when the matching aggregation kind is active.

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct TimeBin {
    /// Running mean (AVG).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    /// Running sum of squared deviations (Welford M2); divide by `count` for the variance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<f64>,
    /// Samples folded into `avg`/`var`.
    pub count: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Sum of deltas, not values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<f64>,
}

impl TimeBin {
    /// `var / count`; None before the first AVG sample.
    pub fn population_variance(&self) -> Option<f64> {
        match self.var {
            Some(m2) if self.count > 0.0 => Some(m2 / self.count),
            _ => None,
        }
    }

    /// Unbiased estimator `var / (count - 1)`; None with fewer than two samples.
    pub fn sample_variance(&self) -> Option<f64> {
        match self.var {
            Some(m2) if self.count > 1.0 => Some(m2 / (self.count - 1.0)),
            _ => None,
        }
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }
}
