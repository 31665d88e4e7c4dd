use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::models::Control;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref CONTROL_EVALUATIONS: IntCounter = IntCounter::new(
        "control_evaluations_total",
        "Total evaluations of the control catalog"
    ).expect("metric can be created");

    pub static ref DEGRADED_ANOMALY_COUNTS: IntCounter = IntCounter::new(
        "anomaly_counts_degraded_total",
        "Anomaly counts that fell back to zero because the result table could not be read"
    ).expect("metric can be created");

    pub static ref CONTROLS_BY_SEVERITY: IntGaugeVec = IntGaugeVec::new(
        Opts::new("controls_by_severity", "Controls per severity in the latest evaluation"),
        &["severity"]
    ).expect("metric can be created");

    pub static ref SANCTIONS_SCRAPES: IntCounterVec = IntCounterVec::new(
        Opts::new("sanctions_scrapes_total", "Sanctions map scrapes"),
        &["outcome"]
    ).expect("metric can be created");

    pub static ref SCREENING_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("screening_requests_total", "Requests to the external matching service"),
        &["outcome"]
    ).expect("metric can be created");

    pub static ref EXCEL_EXPORTS: IntCounterVec = IntCounterVec::new(
        Opts::new("excel_exports_total", "Spreadsheet exports"),
        &["outcome"]
    ).expect("metric can be created");
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(CONTROL_EVALUATIONS.clone()))?;
    registry.register(Box::new(DEGRADED_ANOMALY_COUNTS.clone()))?;
    registry.register(Box::new(CONTROLS_BY_SEVERITY.clone()))?;
    registry.register(Box::new(SANCTIONS_SCRAPES.clone()))?;
    registry.register(Box::new(SCREENING_REQUESTS.clone()))?;
    registry.register(Box::new(EXCEL_EXPORTS.clone()))?;
    Ok(())
}

pub fn record_evaluation(controls: &[Control], degraded: usize) {
    CONTROL_EVALUATIONS.inc();
    DEGRADED_ANOMALY_COUNTS.inc_by(degraded as u64);

    CONTROLS_BY_SEVERITY.reset();
    for control in controls {
        CONTROLS_BY_SEVERITY
            .with_label_values(&[control.estado.label()])
            .inc();
    }
}

/// Prometheus text exposition of the service registry.
pub fn gather_text() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
