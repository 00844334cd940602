//! Bucket classification
//!
//! Pure lookups that turn raw measurements into weight multipliers:
//! - Attenuation (dB) into one of four weighted buckets
//! - Report type and infectiousness into table weights
//!
//! Nothing here clamps or rounds; the multipliers are combined by the
//! aggregator at full precision.

use crate::config::RiskCalculationConfiguration;
use crate::types::{Infectiousness, ReportType};

/// Classifier over a configuration snapshot
pub struct BucketClassifier;

impl BucketClassifier {
    /// Attenuation bucket (0..=3) for a reading.
    ///
    /// Thresholds are expected in ascending order; each bucket is inclusive of
    /// its upper threshold.
    pub fn attenuation_bucket(attenuation_db: i32, config: &RiskCalculationConfiguration) -> usize {
        let [near, medium, far] = config.attenuation_bucket_thresholds_db;
        if attenuation_db <= near {
            0
        } else if attenuation_db <= medium {
            1
        } else if attenuation_db <= far {
            2
        } else {
            3
        }
    }

    /// Weight of the bucket the attenuation falls into
    pub fn attenuation_multiplier(attenuation_db: i32, config: &RiskCalculationConfiguration) -> f64 {
        config.attenuation_bucket_weights[Self::attenuation_bucket(attenuation_db, config)]
    }

    /// Report type weight, 0.0 when unconfigured
    pub fn report_type_multiplier(report_type: ReportType, config: &RiskCalculationConfiguration) -> f64 {
        config.report_type_weights.weight(report_type)
    }

    /// Infectiousness weight, 0.0 when unconfigured
    pub fn infectiousness_multiplier(
        infectiousness: Infectiousness,
        config: &RiskCalculationConfiguration,
    ) -> f64 {
        config.infectiousness_weights.weight(infectiousness)
    }
}
