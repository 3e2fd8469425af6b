//! Report orchestration
//!
//! Runs the aggregation, profiling and detection stages over a filtered view
//! and bundles their results into serializable reports.
//!
//! Stages:
//! 1. aggregate - roll the view up into a daily series
//! 2. describe / profile - summary, age, temporal, geographic and correlation roll-ups
//! 3. detect - z-score, rolling and pincode volume detectors plus per-period patterns
//! 4. explain - written explanations for the strongest high days

use crate::aggregator::aggregate;
use crate::config::AnalysisConfig;
use crate::correlation::{correlation_matrix, CorrelationAnalysis};
use crate::describe::{age_distribution, describe, AgeDistribution};
use crate::detectors::{
    detect_pincode_volume, flagged, AnomalyDetector, PincodeVolume, RollingDetector, ScoredPoint, ZScoreDetector,
};
use crate::error::AnalysisError;
use crate::explain::describe_method;
use crate::filter::FilteredView;
use crate::geography::{geographic_profile, GeographicProfile};
use crate::temporal::{temporal_patterns, temporal_profile, TemporalPatterns, TemporalProfile};
use crate::types::{AnomalyResult, DailySeriesPoint, Direction, FilterSpec, ReferenceScope, SummaryStatistics};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Which engine produced a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Descriptive report over a filtered view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub producer: Producer,
    pub computed_at_utc: String,
    pub filter: FilterSpec,
    pub records: usize,
    pub summary: SummaryStatistics,
    pub age_distribution: AgeDistribution,
    pub temporal: TemporalProfile,
    pub geographic: GeographicProfile,
    pub correlations: CorrelationAnalysis,
}

/// Output of one series detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodReport {
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    pub anomalies_found: usize,
    pub flagged: Vec<AnomalyResult>,
    pub all_days: Vec<ScoredPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PincodeReport {
    pub percentile_threshold: f64,
    pub high_volume: Vec<PincodeVolume>,
    pub top_pincodes: Vec<PincodeVolume>,
}

/// How each detector decided, in words
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Methodology {
    pub zscore: String,
    pub rolling: String,
    pub pincode: String,
}

/// Written explanation for one flagged day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub date: NaiveDate,
    pub enrolments: u64,
    pub explanation: String,
}

impl From<&AnomalyResult> for Explanation {
    fn from(anomaly: &AnomalyResult) -> Self {
        Self {
            date: anomaly.date,
            enrolments: anomaly.observed_value,
            explanation: anomaly.explanation.clone(),
        }
    }
}

/// Anomaly report over a filtered view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub producer: Producer,
    pub computed_at_utc: String,
    pub filter: FilterSpec,
    pub zscore: MethodReport,
    pub rolling: MethodReport,
    pub pincode_analysis: PincodeReport,
    pub temporal_analysis: TemporalPatterns,
    /// Explanations for the strongest high z-score days
    pub explanations: Vec<Explanation>,
    pub methodology: Methodology,
}

/// Engine holding the configuration shared by every report it produces
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    config: AnalysisConfig,
    instance_id: String,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self {
            config: AnalysisConfig::default(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }
}

impl AnalysisEngine {
    /// Create an engine after validating `config`
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            instance_id: Uuid::new_v4().to_string(),
        })
    }

    /// Use a fixed instance ID in report producers
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Summary, age, temporal, geographic and correlation report for `view`
    pub fn analyze(&self, view: &FilteredView<'_>) -> Result<AnalysisReport, AnalysisError> {
        let series = aggregate(view.iter());
        let summary = describe(&series)?;
        let temporal = temporal_profile(&series, self.config.top_n)?;
        let geographic = geographic_profile(view.records().iter().copied(), self.config.top_n);
        let correlations = correlation_matrix(view.iter());

        info!(
            records = view.len(),
            days = summary.days,
            total = summary.total_enrolments,
            "analysis report built"
        );

        Ok(AnalysisReport {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            filter: view.spec().clone(),
            records: view.len(),
            age_distribution: age_distribution(&series),
            summary,
            temporal,
            geographic,
            correlations,
        })
    }

    /// Z-score, rolling and pincode volume report for `view`
    pub fn detect(&self, view: &FilteredView<'_>) -> Result<AnomalyReport, AnalysisError> {
        let detector = self.config.detector;
        let zscore = ZScoreDetector::new(detector.threshold)?;
        let rolling = RollingDetector::new(detector.window, detector.threshold)?;

        let series = aggregate(view.iter());
        let zscore_report = method_report(&zscore, None, &series)?;
        let rolling_report = method_report(&rolling, Some(detector.window), &series)?;

        let volumes = detect_pincode_volume(view.iter(), self.config.pincode_percentile)?;
        let pincode_analysis = PincodeReport {
            percentile_threshold: self.config.pincode_percentile,
            high_volume: volumes.iter().filter(|v| v.is_high_volume).cloned().collect(),
            top_pincodes: volumes.into_iter().take(self.config.top_n).collect(),
        };

        let explanations = strongest_high(&zscore_report.flagged, self.config.explained_anomalies)
            .into_iter()
            .map(Explanation::from)
            .collect();

        let methodology = Methodology {
            zscore: describe_method(ReferenceScope::Global, detector.threshold),
            rolling: describe_method(ReferenceScope::Trailing { days: detector.window }, detector.threshold),
            pincode: format!(
                "Pincode analysis flags pincodes whose total enrolments exceed the {} percentile of all pincode totals.",
                self.config.pincode_percentile
            ),
        };

        info!(
            days = series.len(),
            zscore_flagged = zscore_report.anomalies_found,
            rolling_flagged = rolling_report.anomalies_found,
            high_volume_pincodes = pincode_analysis.high_volume.len(),
            "anomaly report built"
        );

        Ok(AnomalyReport {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            filter: view.spec().clone(),
            zscore: zscore_report,
            rolling: rolling_report,
            pincode_analysis,
            temporal_analysis: temporal_patterns(&series),
            explanations,
            methodology,
        })
    }
}

fn method_report(
    detector: &dyn AnomalyDetector,
    window: Option<usize>,
    series: &[DailySeriesPoint],
) -> Result<MethodReport, AnalysisError> {
    let all_days = detector.score(series)?;
    let flagged = flagged(detector.method(), &all_days);
    Ok(MethodReport {
        threshold: detector.threshold(),
        window,
        anomalies_found: flagged.len(),
        flagged,
        all_days,
    })
}

/// High anomalies ordered by score, largest first (earlier date on ties)
fn strongest_high(anomalies: &[AnomalyResult], limit: usize) -> Vec<&AnomalyResult> {
    let mut high: Vec<&AnomalyResult> = anomalies.iter().filter(|a| a.direction == Direction::High).collect();
    high.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.date.cmp(&b.date)));
    high.truncate(limit);
    high
}
