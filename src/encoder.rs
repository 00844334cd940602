//! Report encoding
//!
//! Wraps a [`RiskAssessment`] in a [`RiskReport`] envelope carrying engine
//! provenance and calendar dates for every scored day.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::aggregator::RiskAssessment;
use crate::error::RiskError;
use crate::types::{DailyRiskScore, ReportDailyScore, ReportEngine, ReportExposure, RiskReport};
use crate::{ENGINE_NAME, ENGINE_VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder producing JSON risk reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build the report for an assessment over `window_count` windows
    pub fn encode(&self, assessment: &RiskAssessment, window_count: usize) -> RiskReport {
        let engine = ReportEngine {
            name: ENGINE_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let (daily_scores, exposure) = match assessment {
            RiskAssessment::Daily { scores, exposure } => (
                scores.iter().map(encode_daily_score).collect(),
                ReportExposure {
                    exposed: exposure.is_some(),
                    date: exposure.and_then(|day| iso_date(day.date())),
                    days_since_epoch: exposure.map(|day| day.days_since_epoch),
                    score: exposure.map(|day| day.score_sum),
                    legacy_summary: None,
                },
            ),
            RiskAssessment::Legacy { summary } => (
                Vec::new(),
                ReportExposure {
                    exposed: assessment.is_exposed(),
                    date: summary.as_ref().and_then(|s| iso_date(s.date())),
                    days_since_epoch: summary.as_ref().map(|s| s.days_since_epoch),
                    score: summary.as_ref().map(|s| s.score),
                    legacy_summary: summary.clone(),
                },
            ),
        };

        RiskReport {
            report_version: REPORT_VERSION.to_string(),
            engine,
            computed_at_utc: Utc::now().to_rfc3339(),
            algorithm: assessment.algorithm().as_str().to_string(),
            window_count,
            daily_scores,
            exposure,
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        assessment: &RiskAssessment,
        window_count: usize,
    ) -> Result<String, RiskError> {
        let report = self.encode(assessment, window_count);
        serde_json::to_string_pretty(&report).map_err(|e| RiskError::EncodingError(e.to_string()))
    }
}

fn encode_daily_score(score: &DailyRiskScore) -> ReportDailyScore {
    ReportDailyScore {
        date: iso_date(score.date()),
        days_since_epoch: score.days_since_epoch,
        maximum_score: score.maximum_score,
        score_sum: score.score_sum,
    }
}

fn iso_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|date| date.format("%Y-%m-%d").to_string())
}
