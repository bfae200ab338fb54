//! Prometheus metrics for the tariff engine

use paybill_common::CostRuleKind;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

/// Engine counters and latency histograms
#[derive(Clone)]
pub struct TariffMetrics {
    /// Cost resolutions by rule kind and outcome (`found`, `not_found`, `error`)
    pub resolutions_total: IntCounterVec,
    /// Recommendation runs by strategy and outcome (`ok`, `error`)
    pub recommendations_total: IntCounterVec,
    /// Regions dropped from table-based recommendations for lack of a table
    pub skipped_regions_total: IntCounter,
    pub recommendation_duration_seconds: HistogramVec,
}

const RESOLUTION_OUTCOMES: [&str; 3] = ["found", "not_found", "error"];

impl TariffMetrics {
    /// Create the metric set with every resolution series pre-initialized
    /// at zero
    pub fn new() -> prometheus::Result<Self> {
        let metrics = Self {
            resolutions_total: IntCounterVec::new(
                Opts::new("paybill_tariff_resolutions_total", "Cost rule resolutions"),
                &["kind", "outcome"],
            )?,
            recommendations_total: IntCounterVec::new(
                Opts::new(
                    "paybill_recommendations_total",
                    "Recommended price computations",
                ),
                &["strategy", "outcome"],
            )?,
            skipped_regions_total: IntCounter::new(
                "paybill_recommendation_skipped_regions_total",
                "Regions skipped for lack of a price table",
            )?,
            recommendation_duration_seconds: HistogramVec::new(
                HistogramOpts::new(
                    "paybill_recommendation_duration_seconds",
                    "Recommended price computation duration",
                )
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
                &["strategy"],
            )?,
        };

        for kind in CostRuleKind::ALL {
            for outcome in RESOLUTION_OUTCOMES {
                metrics.resolutions_total.with_label_values(&[kind.as_str(), outcome]);
            }
        }

        Ok(metrics)
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.resolutions_total.clone()))?;
        registry.register(Box::new(self.recommendations_total.clone()))?;
        registry.register(Box::new(self.skipped_regions_total.clone()))?;
        registry.register(Box::new(self.recommendation_duration_seconds.clone()))?;
        Ok(())
    }

    pub(crate) fn record_resolution(&self, kind: &str, outcome: &str) {
        self.resolutions_total.with_label_values(&[kind, outcome]).inc();
    }

    pub(crate) fn record_recommendation(&self, strategy: &str, outcome: &str) {
        self.recommendations_total
            .with_label_values(&[strategy, outcome])
            .inc();
    }
}
