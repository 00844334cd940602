//! Pipeline orchestration
//!
//! This module provides the public API of the engine. It parses exposure
//! windows and configuration JSON, runs the selected aggregator, and encodes
//! the outcome as a JSON risk report.

use serde::Deserialize;
use tracing::debug;

use crate::aggregator::{RiskAlgorithm, RiskAssessment};
use crate::config::RiskCalculationConfiguration;
use crate::encoder::ReportEncoder;
use crate::error::RiskError;
use crate::types::ExposureWindow;

/// Window input: a bare array or an object with a `windows` field
#[derive(Deserialize)]
#[serde(untagged)]
enum WindowsPayload {
    Bare(Vec<ExposureWindow>),
    Wrapped { windows: Vec<ExposureWindow> },
}

/// Parse exposure windows from JSON.
///
/// Accepts `[...]` or `{"windows": [...]}`.
pub fn parse_windows(json: &str) -> Result<Vec<ExposureWindow>, RiskError> {
    let payload: WindowsPayload = serde_json::from_str(json)?;
    Ok(match payload {
        WindowsPayload::Bare(windows) | WindowsPayload::Wrapped { windows } => windows,
    })
}

/// Score exposure windows with the current algorithm and return a JSON report.
///
/// # Arguments
/// * `windows_json` - Exposure windows from the platform proximity API
/// * `config_json` - Risk calculation configuration snapshot
///
/// # Example
/// ```ignore
/// let report = daily_risk_from_json(windows_json, config_json)?;
/// ```
pub fn daily_risk_from_json(windows_json: String, config_json: String) -> Result<String, RiskError> {
    let engine = RiskEngine::from_json(&config_json)?;
    engine.assess_json(RiskAlgorithm::Daily, &windows_json)
}

/// Score exposure windows with the legacy algorithm and return a JSON report.
///
/// Fails with a configuration error if the snapshot carries no usable legacy
/// score tables.
pub fn legacy_risk_from_json(windows_json: String, config_json: String) -> Result<String, RiskError> {
    let engine = RiskEngine::from_json(&config_json)?;
    engine.assess_json(RiskAlgorithm::Legacy, &windows_json)
}

/// Engine holding the current configuration snapshot.
///
/// Use this when one configuration serves many scoring calls. Swapping the
/// snapshot never affects an assessment already returned.
pub struct RiskEngine {
    config: RiskCalculationConfiguration,
    encoder: ReportEncoder,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskCalculationConfiguration::default())
    }
}

impl RiskEngine {
    /// Create an engine over a configuration snapshot
    pub fn new(config: RiskCalculationConfiguration) -> Self {
        Self {
            config,
            encoder: ReportEncoder::new(),
        }
    }

    /// Create an engine from configuration JSON
    pub fn from_json(config_json: &str) -> Result<Self, RiskError> {
        Ok(Self::new(RiskCalculationConfiguration::from_json(config_json)?))
    }

    /// Replace the configuration snapshot. The old one is kept on error.
    pub fn load_configuration(&mut self, config_json: &str) -> Result<(), RiskError> {
        self.config = RiskCalculationConfiguration::from_json(config_json)?;
        Ok(())
    }

    pub fn configuration(&self) -> &RiskCalculationConfiguration {
        &self.config
    }

    /// Run the selected aggregator over the windows
    pub fn assess(
        &self,
        algorithm: RiskAlgorithm,
        windows: &[ExposureWindow],
    ) -> Result<RiskAssessment, RiskError> {
        debug!(algorithm = algorithm.as_str(), windows = windows.len(), "assessing risk");
        algorithm.aggregator().assess(windows, &self.config)
    }

    /// Parse windows JSON, assess, and encode the report
    pub fn assess_json(&self, algorithm: RiskAlgorithm, windows_json: &str) -> Result<String, RiskError> {
        let windows = parse_windows(windows_json)?;
        let assessment = self.assess(algorithm, &windows)?;
        self.encoder.encode_to_json(&assessment, windows.len())
    }
}
