//! Risk aggregators
//!
//! Two independent scoring strategies share one interface:
//! - [`DailyRiskAggregator`]: per-window weighted scores aggregated per UTC day
//! - [`LegacyRiskAggregator`]: single best summary with most-recent-first early exit
//!
//! They share no scoring code; the trait only unifies how callers invoke them.

mod daily;
mod legacy;

pub use daily::DailyRiskAggregator;
pub use legacy::{
    LegacyRiskAggregator, LEGACY_ATTENUATION_BREAKPOINTS_DB, LEGACY_DURATION_BREAKPOINTS_MINUTES,
};

use serde::{Deserialize, Serialize};

use crate::config::RiskCalculationConfiguration;
use crate::error::RiskError;
use crate::types::{DailyRiskScore, ExposureSummary, ExposureWindow};

/// Trait for risk aggregation strategies
pub trait RiskAggregator {
    /// Score the windows against a configuration snapshot
    fn assess(
        &self,
        windows: &[ExposureWindow],
        config: &RiskCalculationConfiguration,
    ) -> Result<RiskAssessment, RiskError>;
}

/// Which aggregation strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAlgorithm {
    Daily,
    Legacy,
}

impl RiskAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskAlgorithm::Daily => "daily",
            RiskAlgorithm::Legacy => "legacy",
        }
    }

    /// Aggregator implementing this strategy
    pub fn aggregator(&self) -> &'static dyn RiskAggregator {
        match self {
            RiskAlgorithm::Daily => &DailyRiskAggregator,
            RiskAlgorithm::Legacy => &LegacyRiskAggregator,
        }
    }
}

/// Outcome of a risk assessment
#[derive(Debug, Clone, PartialEq)]
pub enum RiskAssessment {
    /// Current algorithm: per-day scores and the day that warrants notification, if any
    Daily {
        scores: Vec<DailyRiskScore>,
        exposure: Option<DailyRiskScore>,
    },
    /// Legacy algorithm: best summary seen, `None` when there were no windows
    Legacy { summary: Option<ExposureSummary> },
}

impl RiskAssessment {
    pub fn algorithm(&self) -> RiskAlgorithm {
        match self {
            RiskAssessment::Daily { .. } => RiskAlgorithm::Daily,
            RiskAssessment::Legacy { .. } => RiskAlgorithm::Legacy,
        }
    }

    /// Whether the assessment warrants notifying the user
    pub fn is_exposed(&self) -> bool {
        match self {
            RiskAssessment::Daily { exposure, .. } => exposure.is_some(),
            RiskAssessment::Legacy { summary } => {
                summary.as_ref().is_some_and(|s| s.meets_threshold)
            }
        }
    }

    /// Day of the exposure that triggered notification
    pub fn most_recent_exposure_day(&self) -> Option<i64> {
        match self {
            RiskAssessment::Daily { exposure, .. } => exposure.map(|day| day.days_since_epoch),
            RiskAssessment::Legacy { summary } => summary
                .as_ref()
                .filter(|s| s.meets_threshold)
                .map(|s| s.days_since_epoch),
        }
    }
}
