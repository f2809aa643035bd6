//! Price alert condition evaluation
//!
//! Alert rules are tagged unions evaluated against the previous and current
//! observation of a metric. Delivery is a caller concern; this module only
//! answers whether a rule tripped.

use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Quantity an alert rule watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertMetric {
    Price,
    PercentChange,
    PeRatio,
}

/// Comparison applied to the watched metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCondition {
    GreaterThan,
    LessThan,
    CrossesAbove,
    CrossesBelow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub symbol: Symbol,
    pub metric: AlertMetric,
    pub condition: AlertCondition,
    pub threshold: f64,
}

impl AlertRule {
    pub fn new(
        symbol: Symbol,
        metric: AlertMetric,
        condition: AlertCondition,
        threshold: f64,
    ) -> Self {
        Self {
            symbol,
            metric,
            condition,
            threshold,
        }
    }

    /// Evaluate the rule against the previous and current observation of its
    /// metric. Crossing conditions need a previous sample on the other side
    /// of the threshold; plain comparisons ignore it. Non-finite observations
    /// never trip a rule.
    pub fn evaluate(&self, previous: Option<f64>, current: f64) -> bool {
        if !current.is_finite() {
            return false;
        }
        match self.condition {
            AlertCondition::GreaterThan => current > self.threshold,
            AlertCondition::LessThan => current < self.threshold,
            AlertCondition::CrossesAbove => {
                matches!(previous, Some(prev) if prev <= self.threshold)
                    && current > self.threshold
            }
            AlertCondition::CrossesBelow => {
                matches!(previous, Some(prev) if prev >= self.threshold)
                    && current < self.threshold
            }
        }
    }
}
