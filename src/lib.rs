//! Exposure Risk - on-device risk scoring for exposure notification
//!
//! The engine turns exposure windows reported by the platform proximity API
//! into per-day risk scores and a notification verdict through a deterministic
//! pipeline: bucket classification → window scoring → daily aggregation →
//! report encoding.
//!
//! ## Algorithms
//!
//! - **Daily**: duration-weighted attenuation scores aggregated per UTC day
//! - **Legacy**: single best summary with most-recent-first early exit

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::{
    DailyRiskAggregator, LegacyRiskAggregator, RiskAggregator, RiskAlgorithm, RiskAssessment,
};
pub use classifier::BucketClassifier;
pub use config::{LegacyScoreTables, RiskCalculationConfiguration, WeightTable};
pub use error::RiskError;
pub use pipeline::{daily_risk_from_json, legacy_risk_from_json, parse_windows, RiskEngine};
pub use types::{
    DailyRiskScore, ExposureSummary, ExposureWindow, Infectiousness, ReportType, ScanInstance,
};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name embedded in every report
pub const ENGINE_NAME: &str = "exposure-risk";
