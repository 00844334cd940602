//! Core types for the exposure risk engine
//!
//! This module defines the data that flows through scoring: exposure windows as
//! delivered by the platform proximity API, the per-day scores produced by the
//! current algorithm, the single summary produced by the legacy algorithm, and
//! the JSON report envelope.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Milliseconds in one UTC calendar day
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Types whose values map onto an integer index in a configuration weight table
pub trait WeightIndex {
    /// Index used as the key in configuration tables
    fn index(&self) -> u8;
}

/// Report type attached to the diagnosis keys that produced a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Unknown,
    ConfirmedTest,
    ConfirmedClinicalDiagnosis,
    SelfReport,
    Recursive,
    Revoked,
}

impl ReportType {
    pub const ALL: [ReportType; 6] = [
        ReportType::Unknown,
        ReportType::ConfirmedTest,
        ReportType::ConfirmedClinicalDiagnosis,
        ReportType::SelfReport,
        ReportType::Recursive,
        ReportType::Revoked,
    ];
}

impl WeightIndex for ReportType {
    fn index(&self) -> u8 {
        match self {
            ReportType::Unknown => 0,
            ReportType::ConfirmedTest => 1,
            ReportType::ConfirmedClinicalDiagnosis => 2,
            ReportType::SelfReport => 3,
            ReportType::Recursive => 4,
            ReportType::Revoked => 5,
        }
    }
}

/// Infectiousness of the reporting key on the day of the exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Infectiousness {
    None,
    Standard,
    High,
}

impl Infectiousness {
    pub const ALL: [Infectiousness; 3] = [
        Infectiousness::None,
        Infectiousness::Standard,
        Infectiousness::High,
    ];
}

impl WeightIndex for Infectiousness {
    fn index(&self) -> u8 {
        match self {
            Infectiousness::None => 0,
            Infectiousness::Standard => 1,
            Infectiousness::High => 2,
        }
    }
}

/// One Bluetooth scan sample within an exposure window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInstance {
    /// Typical signal attenuation during the scan (dB)
    pub typical_attenuation_db: i32,
    /// Seconds elapsed since the previous scan
    pub seconds_since_last_scan: u32,
}

impl ScanInstance {
    pub fn new(typical_attenuation_db: i32, seconds_since_last_scan: u32) -> Self {
        Self {
            typical_attenuation_db,
            seconds_since_last_scan,
        }
    }
}

/// A contiguous proximity observation reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureWindow {
    /// Midnight UTC of the observation day, in milliseconds since the epoch
    pub date_millis_since_epoch: i64,
    pub report_type: ReportType,
    pub infectiousness: Infectiousness,
    /// Scan samples; may be empty
    #[serde(default)]
    pub scan_instances: Vec<ScanInstance>,
}

impl ExposureWindow {
    /// Whole UTC days since the epoch (floored, so pre-epoch dates stay on their own day)
    pub fn days_since_epoch(&self) -> i64 {
        self.date_millis_since_epoch.div_euclid(MILLIS_PER_DAY)
    }

    /// Total scan duration in seconds
    pub fn total_seconds(&self) -> u64 {
        self.scan_instances
            .iter()
            .map(|scan| u64::from(scan.seconds_since_last_scan))
            .sum()
    }
}

/// Aggregated risk for one UTC day (current algorithm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyRiskScore {
    pub days_since_epoch: i64,
    /// Highest single window score of the day
    pub maximum_score: f64,
    /// Sum of all qualifying window scores of the day
    pub score_sum: f64,
}

impl DailyRiskScore {
    /// Calendar date of this score, if representable
    pub fn date(&self) -> Option<NaiveDate> {
        date_from_days(self.days_since_epoch)
    }
}

/// Best-matching exposure summary (legacy algorithm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSummary {
    pub days_since_epoch: i64,
    /// Arithmetic mean of the window's typical attenuations (dB)
    pub average_attenuation_db: f64,
    /// Total scan duration (seconds)
    pub duration_seconds: u64,
    pub attenuation_bucket: usize,
    pub duration_bucket: usize,
    pub transmission_risk_bucket: usize,
    pub score: f64,
    /// Whether the score reached the configured minimum risk score
    pub meets_threshold: bool,
}

impl ExposureSummary {
    pub fn date(&self) -> Option<NaiveDate> {
        date_from_days(self.days_since_epoch)
    }
}

/// Convert whole days since the epoch into a calendar date
pub fn date_from_days(days_since_epoch: i64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let offset = Days::new(days_since_epoch.unsigned_abs());
    if days_since_epoch >= 0 {
        epoch.checked_add_days(offset)
    } else {
        epoch.checked_sub_days(offset)
    }
}

/// Engine metadata embedded in every report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEngine {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One day's score as written to a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDailyScore {
    /// ISO calendar date (YYYY-MM-DD)
    pub date: Option<String>,
    pub days_since_epoch: i64,
    pub maximum_score: f64,
    pub score_sum: f64,
}

/// Notification verdict written to a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportExposure {
    pub exposed: bool,
    /// Day that triggered the verdict (or the best day seen, for legacy)
    pub date: Option<String>,
    pub days_since_epoch: Option<i64>,
    pub score: Option<f64>,
    /// Legacy summary details, when the legacy algorithm ran
    pub legacy_summary: Option<ExposureSummary>,
}

/// Complete scoring report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub report_version: String,
    pub engine: ReportEngine,
    pub computed_at_utc: String,
    /// "daily" or "legacy"
    pub algorithm: String,
    pub window_count: usize,
    pub daily_scores: Vec<ReportDailyScore>,
    pub exposure: ReportExposure,
}
