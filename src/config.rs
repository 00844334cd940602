//! Risk calculation configuration
//!
//! The configuration is a versioned snapshot produced by the remote-config
//! collaborator. The engine only ever reads it: every scoring call receives the
//! snapshot by reference and nothing here is mutated mid-computation.
//!
//! Weight tables are keyed by the platform's integer enum indices. A missing
//! entry is not an error; it resolves to a weight of 0.0. Keys that are not a
//! valid index are dropped when the snapshot is parsed.
//!
//! Decision thresholds are different: a snapshot that omits them has no
//! threshold, and the legacy algorithm refuses to run without one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RiskError;
use crate::types::WeightIndex;

/// Number of attenuation buckets used by the current algorithm
pub const ATTENUATION_BUCKETS: usize = 4;

/// Number of buckets in the legacy attenuation and duration score tables
pub const LEGACY_BUCKETS: usize = 8;

/// Number of legacy transmission-risk levels
pub const TRANSMISSION_RISK_LEVELS: usize = 3;

/// Index-keyed weight table with an explicit 0.0 default for missing keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct WeightTable(BTreeMap<u8, f64>);

impl From<BTreeMap<String, f64>> for WeightTable {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        let entries = raw
            .into_iter()
            .filter_map(|(key, weight)| match key.trim().parse::<u8>() {
                Ok(index) => Some((index, weight)),
                Err(_) => {
                    debug!(key = %key, "ignoring weight for unknown index");
                    None
                }
            })
            .collect();
        Self(entries)
    }
}

impl From<WeightTable> for BTreeMap<String, f64> {
    fn from(table: WeightTable) -> Self {
        table
            .0
            .into_iter()
            .map(|(index, weight)| (index.to_string(), weight))
            .collect()
    }
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl WeightIndex, weight: f64) -> Self {
        self.0.insert(key.index(), weight);
        self
    }

    /// Weight for `key`, or 0.0 when the table has no entry
    pub fn weight(&self, key: impl WeightIndex) -> f64 {
        self.weight_at(key.index())
    }

    /// Weight for a raw index, or 0.0 when the table has no entry
    pub fn weight_at(&self, index: u8) -> f64 {
        self.0.get(&index).copied().unwrap_or(0.0)
    }

    fn iter(&self) -> impl Iterator<Item = (&u8, &f64)> {
        self.0.iter()
    }
}

/// Score tables consumed only by the legacy aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyScoreTables {
    /// One score per legacy attenuation bucket (8 entries)
    pub attenuation_scores: Vec<f64>,
    /// One score per legacy duration bucket (8 entries)
    pub duration_scores: Vec<f64>,
    /// One score per transmission-risk level (3 entries)
    pub transmission_risk_scores: Vec<f64>,
}

impl LegacyScoreTables {
    /// Reject tables that are too short or hold non-finite scores
    pub fn validate(&self) -> Result<(), RiskError> {
        check_table("attenuation_scores", &self.attenuation_scores, LEGACY_BUCKETS)?;
        check_table("duration_scores", &self.duration_scores, LEGACY_BUCKETS)?;
        check_table(
            "transmission_risk_scores",
            &self.transmission_risk_scores,
            TRANSMISSION_RISK_LEVELS,
        )
    }
}

impl Default for LegacyScoreTables {
    fn default() -> Self {
        Self {
            attenuation_scores: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            duration_scores: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0],
            transmission_risk_scores: vec![1.0, 4.0, 8.0],
        }
    }
}

fn check_table(name: &str, scores: &[f64], required: usize) -> Result<(), RiskError> {
    if scores.len() < required {
        return Err(RiskError::InvalidConfiguration(format!(
            "{name} has {} entries, expected {required}",
            scores.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(RiskError::InvalidConfiguration(format!(
            "{name} contains non-finite score {bad}"
        )));
    }
    Ok(())
}

/// Immutable risk calculation snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCalculationConfiguration {
    /// Weight per report-type index
    pub report_type_weights: WeightTable,
    /// Ascending boundaries (dB) separating the four attenuation buckets
    pub attenuation_bucket_thresholds_db: [i32; 3],
    /// Weight per attenuation bucket, nearest first
    pub attenuation_bucket_weights: [f64; ATTENUATION_BUCKETS],
    /// Weight per infectiousness index
    pub infectiousness_weights: WeightTable,
    /// Windows scoring strictly below this are discarded
    pub minimum_window_score: f64,
    /// Legacy exposure threshold (compared with >=); required by the legacy algorithm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_risk_score: Option<f64>,
    /// Daily score sum at which a day warrants notification. When unset any
    /// day with a positive score sum does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_daily_score: Option<f64>,
    /// Score tables for the legacy algorithm, if the snapshot carries them
    #[serde(default)]
    pub legacy: Option<LegacyScoreTables>,
}

impl Default for RiskCalculationConfiguration {
    /// Bundled fallback snapshot for callers whose remote fetch failed
    fn default() -> Self {
        use crate::types::{Infectiousness, ReportType};

        Self {
            report_type_weights: WeightTable::new()
                .with(ReportType::ConfirmedTest, 1.0)
                .with(ReportType::ConfirmedClinicalDiagnosis, 1.0)
                .with(ReportType::SelfReport, 1.0),
            attenuation_bucket_thresholds_db: [30, 50, 70],
            attenuation_bucket_weights: [1.0, 0.5, 0.25, 0.0],
            infectiousness_weights: WeightTable::new()
                .with(Infectiousness::Standard, 1.0)
                .with(Infectiousness::High, 1.0),
            minimum_window_score: 0.0,
            minimum_risk_score: Some(1.0),
            // 15 minutes at the nearest bucket
            minimum_daily_score: Some(900.0),
            legacy: Some(LegacyScoreTables::default()),
        }
    }
}

impl RiskCalculationConfiguration {
    /// Parse a configuration snapshot from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, RiskError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        info!(
            thresholds = ?config.attenuation_bucket_thresholds_db,
            minimum_window_score = config.minimum_window_score,
            legacy = config.legacy.is_some(),
            "loaded risk configuration"
        );
        Ok(config)
    }

    /// Serialize the snapshot to pretty JSON
    pub fn to_json(&self) -> Result<String, RiskError> {
        serde_json::to_string_pretty(self).map_err(RiskError::JsonError)
    }

    /// Check the preconditions the scoring functions rely on.
    ///
    /// Thresholds must be non-decreasing and every weight, score and minimum
    /// finite. A minimum risk score, when set, must be positive so a zero
    /// score can never qualify. Legacy tables are checked when present.
    pub fn validate(&self) -> Result<(), RiskError> {
        let thresholds = &self.attenuation_bucket_thresholds_db;
        if thresholds.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(RiskError::InvalidConfiguration(format!(
                "attenuation_bucket_thresholds_db must be ascending, got {thresholds:?}"
            )));
        }

        if let Some(bad) = self
            .attenuation_bucket_weights
            .iter()
            .find(|w| !w.is_finite())
        {
            return Err(RiskError::InvalidConfiguration(format!(
                "attenuation_bucket_weights contains non-finite weight {bad}"
            )));
        }

        for (name, table) in [
            ("report_type_weights", &self.report_type_weights),
            ("infectiousness_weights", &self.infectiousness_weights),
        ] {
            if let Some((index, weight)) = table.iter().find(|(_, w)| !w.is_finite()) {
                return Err(RiskError::InvalidConfiguration(format!(
                    "{name}[{index}] is non-finite ({weight})"
                )));
            }
        }

        let minimums = [
            ("minimum_window_score", Some(self.minimum_window_score)),
            ("minimum_risk_score", self.minimum_risk_score),
            ("minimum_daily_score", self.minimum_daily_score),
        ];
        for (name, value) in minimums
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
        {
            if !value.is_finite() {
                return Err(RiskError::InvalidConfiguration(format!(
                    "{name} is non-finite ({value})"
                )));
            }
        }

        if let Some(minimum) = self.minimum_risk_score {
            if minimum <= 0.0 {
                return Err(RiskError::InvalidConfiguration(format!(
                    "minimum_risk_score must be positive, got {minimum}"
                )));
            }
        }

        if let Some(legacy) = &self.legacy {
            legacy.validate()?;
        }

        Ok(())
    }

    /// Legacy score tables, or a configuration error when the snapshot has none
    pub fn legacy_tables(&self) -> Result<&LegacyScoreTables, RiskError> {
        self.legacy.as_ref().ok_or_else(|| {
            RiskError::InvalidConfiguration("legacy score tables are missing".to_string())
        })
    }

    /// Legacy exposure threshold, or a configuration error when the snapshot has none
    pub fn legacy_minimum_risk_score(&self) -> Result<f64, RiskError> {
        self.minimum_risk_score.ok_or_else(|| {
            RiskError::InvalidConfiguration("minimum_risk_score is missing".to_string())
        })
    }
}
