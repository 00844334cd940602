//! Legacy risk aggregation
//!
//! Kept for devices and configurations still on the summary-based scheme. Each
//! window is reduced to an average attenuation and a total duration, both
//! classified into eight buckets, and scored from three score tables.
//!
//! Windows are visited most recent day first. The first window reaching
//! `minimum_risk_score` wins immediately, even if an older day would have
//! scored higher. Otherwise the highest summary seen is returned.

use std::collections::BTreeMap;

use tracing::debug;

use super::{RiskAggregator, RiskAssessment};
use crate::config::{LegacyScoreTables, RiskCalculationConfiguration};
use crate::error::RiskError;
use crate::types::{ExposureSummary, ExposureWindow, Infectiousness};

/// Attenuation breakpoints (dB), farthest first. A reading above the first
/// breakpoint lands in bucket 0; at or below the last in bucket 7.
pub const LEGACY_ATTENUATION_BREAKPOINTS_DB: [f64; 7] = [73.0, 63.0, 51.0, 33.0, 27.0, 15.0, 10.0];

/// Upper bounds (minutes, inclusive) of duration buckets 0 through 6; longer is bucket 7
pub const LEGACY_DURATION_BREAKPOINTS_MINUTES: [u64; 7] = [0, 5, 10, 15, 20, 25, 30];

/// Summary-based aggregator
pub struct LegacyRiskAggregator;

impl RiskAggregator for LegacyRiskAggregator {
    fn assess(
        &self,
        windows: &[ExposureWindow],
        config: &RiskCalculationConfiguration,
    ) -> Result<RiskAssessment, RiskError> {
        let summary = Self::best_summary(windows, config)?;
        Ok(RiskAssessment::Legacy { summary })
    }
}

impl LegacyRiskAggregator {
    /// Best summary for the windows, or `None` when there are no windows.
    ///
    /// Fails if the configuration lacks a minimum risk score or legacy score
    /// tables, or the tables are short.
    pub fn best_summary(
        windows: &[ExposureWindow],
        config: &RiskCalculationConfiguration,
    ) -> Result<Option<ExposureSummary>, RiskError> {
        let tables = config.legacy_tables()?;
        tables.validate()?;
        let minimum_risk_score = config.legacy_minimum_risk_score()?;

        let mut by_day: BTreeMap<i64, Vec<&ExposureWindow>> = BTreeMap::new();
        for window in windows {
            by_day.entry(window.days_since_epoch()).or_default().push(window);
        }

        let mut best: Option<ExposureSummary> = None;

        for (day, day_windows) in by_day.iter().rev() {
            for window in day_windows {
                let summary = Self::summarize(*day, window, tables, minimum_risk_score);

                if summary.meets_threshold {
                    debug!(day, score = summary.score, "legacy threshold reached");
                    return Ok(Some(summary));
                }

                if best.as_ref().map_or(true, |b| summary.score > b.score) {
                    best = Some(summary);
                }
            }
        }

        Ok(best)
    }

    fn summarize(
        day: i64,
        window: &ExposureWindow,
        tables: &LegacyScoreTables,
        minimum_risk_score: f64,
    ) -> ExposureSummary {
        let average_attenuation_db = Self::average_attenuation(window);
        let duration_seconds = window.total_seconds();

        let attenuation_bucket = average_attenuation_db.map_or(0, Self::attenuation_bucket);
        let duration_bucket = Self::duration_bucket(duration_seconds);
        let transmission_risk_bucket = Self::transmission_risk_bucket(window.infectiousness);

        let score = tables.attenuation_scores[attenuation_bucket]
            * tables.duration_scores[duration_bucket]
            * tables.transmission_risk_scores[transmission_risk_bucket];

        ExposureSummary {
            days_since_epoch: day,
            average_attenuation_db: average_attenuation_db.unwrap_or(0.0),
            duration_seconds,
            attenuation_bucket,
            duration_bucket,
            transmission_risk_bucket,
            score,
            meets_threshold: score >= minimum_risk_score,
        }
    }

    /// Arithmetic mean of the window's typical attenuations
    pub fn average_attenuation(window: &ExposureWindow) -> Option<f64> {
        if window.scan_instances.is_empty() {
            return None;
        }
        let total: i64 = window
            .scan_instances
            .iter()
            .map(|scan| i64::from(scan.typical_attenuation_db))
            .sum();
        Some(total as f64 / window.scan_instances.len() as f64)
    }

    /// Attenuation bucket (0 = farthest, 7 = nearest)
    pub fn attenuation_bucket(average_attenuation_db: f64) -> usize {
        LEGACY_ATTENUATION_BREAKPOINTS_DB
            .iter()
            .position(|&breakpoint| average_attenuation_db > breakpoint)
            .unwrap_or(LEGACY_ATTENUATION_BREAKPOINTS_DB.len())
    }

    /// Duration bucket (0 = no time, 7 = over 30 minutes)
    pub fn duration_bucket(duration_seconds: u64) -> usize {
        LEGACY_DURATION_BREAKPOINTS_MINUTES
            .iter()
            .position(|&minutes| duration_seconds <= minutes * 60)
            .unwrap_or(LEGACY_DURATION_BREAKPOINTS_MINUTES.len())
    }

    pub fn transmission_risk_bucket(infectiousness: Infectiousness) -> usize {
        match infectiousness {
            Infectiousness::High => 2,
            Infectiousness::Standard => 1,
            Infectiousness::None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReportType, ScanInstance, MILLIS_PER_DAY};
    use pretty_assertions::assert_eq;

    const DAY: i64 = 19737;

    fn make_test_config(minimum_risk_score: f64) -> RiskCalculationConfiguration {
        RiskCalculationConfiguration {
            minimum_risk_score: Some(minimum_risk_score),
            legacy: Some(LegacyScoreTables {
                attenuation_scores: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
                duration_scores: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0],
                transmission_risk_scores: vec![1.0, 2.0, 3.0],
            }),
            ..RiskCalculationConfiguration::default()
        }
    }

    fn window(day: i64, infectiousness: Infectiousness, scans: Vec<ScanInstance>) -> ExposureWindow {
        ExposureWindow {
            date_millis_since_epoch: day * MILLIS_PER_DAY,
            report_type: ReportType::ConfirmedTest,
            infectiousness,
            scan_instances: scans,
        }
    }

    #[test]
    fn test_attenuation_buckets() {
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(80.0), 0);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(73.0), 1);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(63.5), 1);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(52.0), 2);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(40.0), 3);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(30.0), 4);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(20.0), 5);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(12.0), 6);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(10.0), 7);
        assert_eq!(LegacyRiskAggregator::attenuation_bucket(0.0), 7);
    }

    #[test]
    fn test_duration_buckets() {
        assert_eq!(LegacyRiskAggregator::duration_bucket(0), 0);
        assert_eq!(LegacyRiskAggregator::duration_bucket(1), 1);
        assert_eq!(LegacyRiskAggregator::duration_bucket(300), 1);
        assert_eq!(LegacyRiskAggregator::duration_bucket(301), 2);
        assert_eq!(LegacyRiskAggregator::duration_bucket(600), 2);
        assert_eq!(LegacyRiskAggregator::duration_bucket(900), 3);
        assert_eq!(LegacyRiskAggregator::duration_bucket(1200), 4);
        assert_eq!(LegacyRiskAggregator::duration_bucket(1500), 5);
        assert_eq!(LegacyRiskAggregator::duration_bucket(1800), 6);
        assert_eq!(LegacyRiskAggregator::duration_bucket(1801), 7);
    }

    #[test]
    fn test_transmission_risk_buckets() {
        assert_eq!(
            LegacyRiskAggregator::transmission_risk_bucket(Infectiousness::High),
            2
        );
        assert_eq!(
            LegacyRiskAggregator::transmission_risk_bucket(Infectiousness::Standard),
            1
        );
        assert_eq!(
            LegacyRiskAggregator::transmission_risk_bucket(Infectiousness::None),
            0
        );
    }

    #[test]
    fn test_average_attenuation_is_arithmetic_mean() {
        let w = window(
            DAY,
            Infectiousness::High,
            vec![ScanInstance::new(40, 60), ScanInstance::new(55, 600)],
        );
        assert_eq!(LegacyRiskAggregator::average_attenuation(&w), Some(47.5));
        assert_eq!(
            LegacyRiskAggregator::average_attenuation(&window(DAY, Infectiousness::High, vec![])),
            None
        );
    }

    #[test]
    fn test_summary_score_multiplies_tables() {
        let config = make_test_config(1000.0);
        // avg 40 dB -> bucket 3 (4.0), 10 min -> bucket 2 (2.0), standard -> 2.0
        let w = window(
            DAY,
            Infectiousness::Standard,
            vec![ScanInstance::new(40, 300), ScanInstance::new(40, 300)],
        );

        let summary = LegacyRiskAggregator::best_summary(&[w], &config)
            .unwrap()
            .unwrap();
        assert_eq!(summary.attenuation_bucket, 3);
        assert_eq!(summary.duration_bucket, 2);
        assert_eq!(summary.transmission_risk_bucket, 1);
        assert_eq!(summary.score, 16.0);
        assert!(!summary.meets_threshold);
    }

    #[test]
    fn test_early_exit_prefers_most_recent_qualifying_day() {
        let config = make_test_config(10.0);
        // Recent day: avg 40 (4.0) * 10 min (2.0) * standard (2.0) = 16
        let recent = window(
            DAY,
            Infectiousness::Standard,
            vec![ScanInstance::new(40, 600)],
        );
        // Older day: avg 12 (7.0) * 40 min (8.0) * high (3.0) = 168
        let older = window(
            DAY - 3,
            Infectiousness::High,
            vec![ScanInstance::new(12, 2400)],
        );

        let summary = LegacyRiskAggregator::best_summary(&[older, recent], &config)
            .unwrap()
            .unwrap();

        assert_eq!(summary.days_since_epoch, DAY);
        assert_eq!(summary.score, 16.0);
        assert!(summary.meets_threshold);
    }

    #[test]
    fn test_score_equal_to_minimum_qualifies() {
        let config = make_test_config(16.0);
        // 4.0 * 2.0 * 2.0 = 16, exactly the minimum
        let recent = window(DAY, Infectiousness::Standard, vec![ScanInstance::new(40, 600)]);
        // 7.0 * 8.0 * 3.0 = 168, would win without the early exit
        let older = window(DAY - 1, Infectiousness::High, vec![ScanInstance::new(12, 2400)]);

        let summary = LegacyRiskAggregator::best_summary(&[recent, older], &config)
            .unwrap()
            .unwrap();

        assert_eq!(summary.days_since_epoch, DAY);
        assert_eq!(summary.score, 16.0);
        assert!(summary.meets_threshold);

        let above = make_test_config(16.000_001);
        let summary = LegacyRiskAggregator::best_summary(
            &[window(DAY, Infectiousness::Standard, vec![ScanInstance::new(40, 600)])],
            &above,
        )
        .unwrap()
        .unwrap();
        assert!(!summary.meets_threshold);
    }

    #[test]
    fn test_tie_keeps_most_recent_summary() {
        let config = make_test_config(1000.0);
        // Both score 4.0 * 2.0 * 2.0 = 16
        let recent = window(DAY, Infectiousness::Standard, vec![ScanInstance::new(40, 600)]);
        let older = window(DAY - 2, Infectiousness::Standard, vec![ScanInstance::new(45, 540)]);

        let summary = LegacyRiskAggregator::best_summary(&[older, recent], &config)
            .unwrap()
            .unwrap();

        assert_eq!(summary.days_since_epoch, DAY);
        assert_eq!(summary.score, 16.0);
        assert!(!summary.meets_threshold);
    }

    #[test]
    fn test_missing_minimum_risk_score_is_config_error() {
        let config = RiskCalculationConfiguration {
            minimum_risk_score: None,
            ..make_test_config(1.0)
        };
        let zero_risk = ExposureWindow {
            report_type: ReportType::Revoked,
            ..window(DAY, Infectiousness::None, vec![])
        };

        let result = LegacyRiskAggregator::best_summary(&[zero_risk], &config);
        assert!(matches!(result, Err(RiskError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_returns_highest_when_nothing_qualifies() {
        let config = make_test_config(1000.0);
        let recent = window(DAY, Infectiousness::None, vec![ScanInstance::new(70, 120)]);
        let older = window(DAY - 1, Infectiousness::High, vec![ScanInstance::new(20, 900)]);

        let summary = LegacyRiskAggregator::best_summary(&[recent, older], &config)
            .unwrap()
            .unwrap();

        // 6.0 * 3.0 * 3.0
        assert_eq!(summary.days_since_epoch, DAY - 1);
        assert_eq!(summary.score, 54.0);
        assert!(!summary.meets_threshold);
    }

    #[test]
    fn test_empty_input_is_no_exposure() {
        let config = make_test_config(1.0);
        assert_eq!(LegacyRiskAggregator::best_summary(&[], &config).unwrap(), None);
    }

    #[test]
    fn test_window_without_scans_scores_zero_duration() {
        let config = make_test_config(1.0);
        let summary = LegacyRiskAggregator::best_summary(
            &[window(DAY, Infectiousness::High, vec![])],
            &config,
        )
        .unwrap()
        .unwrap();

        assert_eq!(summary.duration_bucket, 0);
        assert_eq!(summary.score, 0.0);
        assert!(!summary.meets_threshold);
    }

    #[test]
    fn test_short_score_tables_are_config_error() {
        let mut config = make_test_config(1.0);
        if let Some(tables) = config.legacy.as_mut() {
            tables.duration_scores.truncate(5);
        }

        let result = LegacyRiskAggregator::best_summary(&[], &config);
        assert!(matches!(result, Err(RiskError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_missing_score_tables_are_config_error() {
        let config = RiskCalculationConfiguration {
            legacy: None,
            ..make_test_config(1.0)
        };

        let result = LegacyRiskAggregator::best_summary(&[], &config);
        assert!(matches!(result, Err(RiskError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_legacy_is_deterministic() {
        let config = make_test_config(50.0);
        let windows: Vec<ExposureWindow> = (0..20)
            .map(|i| {
                window(
                    DAY - i % 5,
                    Infectiousness::ALL[(i % 3) as usize],
                    vec![ScanInstance::new(10 + (i as i32 * 3), 120 * i as u32)],
                )
            })
            .collect();

        let first = LegacyRiskAggregator::best_summary(&windows, &config).unwrap();
        let second = LegacyRiskAggregator::best_summary(&windows, &config).unwrap();
        assert_eq!(first, second);
    }
}
