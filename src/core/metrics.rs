use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!("quiz_attempts_started_total", "Attempts created by StartAttempt");
    metrics::describe_counter!(
        "quiz_attempts_submitted_total",
        "Attempts scored and moved to the submitted state"
    );
    metrics::describe_counter!(
        "quiz_attempts_expired_total",
        "Attempts found past their time limit plus grace"
    );
    metrics::describe_counter!(
        "quiz_attempt_rejections_total",
        "Start or submit calls refused by a lifecycle rule"
    );
    metrics::describe_counter!("http_requests_total", "HTTP responses by status code");
    metrics::describe_histogram!("http_request_duration_seconds", "HTTP request latency");
}
