//! Current risk aggregation
//!
//! Scores every window as duration-weighted attenuation times the report type
//! and infectiousness weights, drops windows below the minimum window score,
//! and folds the rest into one [`DailyRiskScore`] per UTC day.

use std::collections::BTreeMap;

use tracing::debug;

use super::{RiskAggregator, RiskAssessment};
use crate::classifier::BucketClassifier;
use crate::config::RiskCalculationConfiguration;
use crate::error::RiskError;
use crate::types::{DailyRiskScore, ExposureWindow};

/// Per-day aggregator
pub struct DailyRiskAggregator;

impl RiskAggregator for DailyRiskAggregator {
    fn assess(
        &self,
        windows: &[ExposureWindow],
        config: &RiskCalculationConfiguration,
    ) -> Result<RiskAssessment, RiskError> {
        let scores = Self::daily_scores(windows, config);
        let exposure = Self::exposure_day(&scores, config.minimum_daily_score);
        Ok(RiskAssessment::Daily { scores, exposure })
    }
}

impl DailyRiskAggregator {
    /// Score of a single window. A window without scans scores 0.0.
    pub fn window_score(window: &ExposureWindow, config: &RiskCalculationConfiguration) -> f64 {
        let weighted_seconds: f64 = window
            .scan_instances
            .iter()
            .map(|scan| {
                f64::from(scan.seconds_since_last_scan)
                    * BucketClassifier::attenuation_multiplier(scan.typical_attenuation_db, config)
            })
            .sum();

        weighted_seconds
            * BucketClassifier::report_type_multiplier(window.report_type, config)
            * BucketClassifier::infectiousness_multiplier(window.infectiousness, config)
    }

    /// Aggregate qualifying windows per day, ascending by day.
    ///
    /// Callers must not rely on the ordering. Days without a qualifying window
    /// are absent.
    pub fn daily_scores(
        windows: &[ExposureWindow],
        config: &RiskCalculationConfiguration,
    ) -> Vec<DailyRiskScore> {
        let mut by_day: BTreeMap<i64, DailyRiskScore> = BTreeMap::new();

        for window in windows {
            let score = Self::window_score(window, config);
            let day = window.days_since_epoch();

            if score < config.minimum_window_score {
                debug!(day, score, minimum = config.minimum_window_score, "window discarded");
                continue;
            }
            debug!(day, score, "window retained");

            by_day
                .entry(day)
                .and_modify(|daily| {
                    daily.maximum_score = daily.maximum_score.max(score);
                    daily.score_sum += score;
                })
                .or_insert(DailyRiskScore {
                    days_since_epoch: day,
                    maximum_score: score,
                    score_sum: score,
                });
        }

        by_day.into_values().collect()
    }

    /// Most recent day whose score sum is positive and reaches `minimum_daily_score`.
    ///
    /// Without a configured minimum any positive day qualifies; a day made only
    /// of zero-score windows never does.
    pub fn exposure_day(
        scores: &[DailyRiskScore],
        minimum_daily_score: Option<f64>,
    ) -> Option<DailyRiskScore> {
        let minimum = minimum_daily_score.unwrap_or(0.0);
        scores
            .iter()
            .filter(|daily| daily.score_sum > 0.0 && daily.score_sum >= minimum)
            .max_by_key(|daily| daily.days_since_epoch)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightTable;
    use crate::types::{Infectiousness, ReportType, ScanInstance, MILLIS_PER_DAY};
    use pretty_assertions::assert_eq;

    const DAY: i64 = 19737;
    const HOUR_MILLIS: i64 = 3_600_000;

    fn make_test_config(minimum_window_score: f64) -> RiskCalculationConfiguration {
        RiskCalculationConfiguration {
            report_type_weights: WeightTable::new().with(ReportType::ConfirmedTest, 1.0),
            attenuation_bucket_thresholds_db: [30, 50, 70],
            attenuation_bucket_weights: [1.0, 0.5, 0.25, 0.0],
            infectiousness_weights: WeightTable::new().with(Infectiousness::High, 1.0),
            minimum_window_score,
            minimum_risk_score: None,
            minimum_daily_score: None,
            legacy: None,
        }
    }

    fn window(millis: i64, scans: Vec<ScanInstance>) -> ExposureWindow {
        ExposureWindow {
            date_millis_since_epoch: millis,
            report_type: ReportType::ConfirmedTest,
            infectiousness: Infectiousness::High,
            scan_instances: scans,
        }
    }

    fn scenario_window() -> ExposureWindow {
        window(
            DAY * MILLIS_PER_DAY,
            vec![ScanInstance::new(20, 300), ScanInstance::new(40, 600)],
        )
    }

    #[test]
    fn test_scenario_window_score() {
        let config = make_test_config(500.0);
        assert_eq!(DailyRiskAggregator::window_score(&scenario_window(), &config), 600.0);

        let scores = DailyRiskAggregator::daily_scores(&[scenario_window()], &config);
        assert_eq!(
            scores,
            vec![DailyRiskScore {
                days_since_epoch: DAY,
                maximum_score: 600.0,
                score_sum: 600.0,
            }]
        );
    }

    #[test]
    fn test_empty_window_scores_zero() {
        let config = make_test_config(0.0);
        let empty = window(DAY * MILLIS_PER_DAY, vec![]);

        assert_eq!(DailyRiskAggregator::window_score(&empty, &config), 0.0);
        // 0.0 is not below a 0.0 minimum, so the day is still reported
        let scores = DailyRiskAggregator::daily_scores(&[empty.clone()], &config);
        assert_eq!(scores.len(), 1);

        let strict = make_test_config(0.1);
        assert!(DailyRiskAggregator::daily_scores(&[empty], &strict).is_empty());
    }

    #[test]
    fn test_empty_input() {
        let config = make_test_config(0.0);
        assert!(DailyRiskAggregator::daily_scores(&[], &config).is_empty());
    }

    #[test]
    fn test_window_equal_to_minimum_is_retained() {
        let config = make_test_config(600.0);
        let scores = DailyRiskAggregator::daily_scores(&[scenario_window()], &config);
        assert_eq!(scores.len(), 1);

        let config = make_test_config(600.000_001);
        assert!(DailyRiskAggregator::daily_scores(&[scenario_window()], &config).is_empty());
    }

    #[test]
    fn test_same_day_windows_are_grouped() {
        let config = make_test_config(0.0);
        let midnight = DAY * MILLIS_PER_DAY;
        let windows = vec![
            window(midnight, vec![ScanInstance::new(20, 300)]),
            window(midnight + HOUR_MILLIS, vec![ScanInstance::new(40, 600)]),
        ];

        let scores = DailyRiskAggregator::daily_scores(&windows, &config);
        assert_eq!(
            scores,
            vec![DailyRiskScore {
                days_since_epoch: DAY,
                maximum_score: 300.0,
                score_sum: 600.0,
            }]
        );
    }

    #[test]
    fn test_windows_across_midnight_are_split() {
        let config = make_test_config(0.0);
        let next_midnight = (DAY + 1) * MILLIS_PER_DAY;
        let minute = 60_000;
        let windows = vec![
            window(next_midnight - minute, vec![ScanInstance::new(20, 300)]),
            window(next_midnight + minute, vec![ScanInstance::new(20, 120)]),
        ];

        let scores = DailyRiskAggregator::daily_scores(&windows, &config);
        let days: Vec<i64> = scores.iter().map(|s| s.days_since_epoch).collect();
        assert_eq!(days, vec![DAY, DAY + 1]);
        assert_eq!(scores[0].score_sum, 300.0);
        assert_eq!(scores[1].score_sum, 120.0);
    }

    #[test]
    fn test_discarded_windows_do_not_create_days() {
        let config = make_test_config(100.0);
        let windows = vec![
            scenario_window(),
            // far away, scores 0
            window((DAY - 3) * MILLIS_PER_DAY, vec![ScanInstance::new(90, 900)]),
        ];

        let scores = DailyRiskAggregator::daily_scores(&windows, &config);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].days_since_epoch, DAY);
    }

    #[test]
    fn test_unconfigured_report_type_contributes_nothing() {
        let config = make_test_config(0.0);
        let mut recursive = scenario_window();
        recursive.report_type = ReportType::Recursive;

        assert_eq!(DailyRiskAggregator::window_score(&recursive, &config), 0.0);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let config = make_test_config(10.0);
        let windows: Vec<ExposureWindow> = (0..50)
            .map(|i| {
                window(
                    (DAY - i % 7) * MILLIS_PER_DAY + i * 1000,
                    vec![
                        ScanInstance::new(15 + (i as i32 % 60), 60 + (i as u32 * 7) % 300),
                        ScanInstance::new(45, 33),
                    ],
                )
            })
            .collect();

        let first = DailyRiskAggregator::daily_scores(&windows, &config);
        let second = DailyRiskAggregator::daily_scores(&windows, &config);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.days_since_epoch, b.days_since_epoch);
            assert_eq!(a.maximum_score.to_bits(), b.maximum_score.to_bits());
            assert_eq!(a.score_sum.to_bits(), b.score_sum.to_bits());
        }
    }

    #[test]
    fn test_exposure_day_picks_most_recent_over_threshold() {
        let scores = vec![
            DailyRiskScore {
                days_since_epoch: DAY - 2,
                maximum_score: 1500.0,
                score_sum: 2000.0,
            },
            DailyRiskScore {
                days_since_epoch: DAY - 1,
                maximum_score: 900.0,
                score_sum: 900.0,
            },
            DailyRiskScore {
                days_since_epoch: DAY,
                maximum_score: 100.0,
                score_sum: 100.0,
            },
        ];

        let exposure = DailyRiskAggregator::exposure_day(&scores, Some(900.0)).unwrap();
        assert_eq!(exposure.days_since_epoch, DAY - 1);
        assert!(DailyRiskAggregator::exposure_day(&scores, Some(5000.0)).is_none());

        let unset = DailyRiskAggregator::exposure_day(&scores, None).unwrap();
        assert_eq!(unset.days_since_epoch, DAY);
    }

    #[test]
    fn test_zero_score_day_is_never_an_exposure() {
        // No minimums anywhere: the empty revoked window survives the filter
        // and creates a day, but that day carries no risk.
        let config = make_test_config(0.0);
        let revoked = ExposureWindow {
            report_type: ReportType::Revoked,
            ..window(DAY * MILLIS_PER_DAY, vec![])
        };

        let assessment = DailyRiskAggregator.assess(&[revoked], &config).unwrap();
        match &assessment {
            RiskAssessment::Daily { scores, exposure } => {
                assert_eq!(scores.len(), 1);
                assert_eq!(scores[0].score_sum, 0.0);
                assert_eq!(*exposure, None);
            }
            other => panic!("unexpected assessment {other:?}"),
        }
        assert!(!assessment.is_exposed());
        assert!(DailyRiskAggregator::exposure_day(&[], Some(0.0)).is_none());
    }
}
