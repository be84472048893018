use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder once. Later calls reuse the first handle.
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
    metrics::describe_counter!("test_sessions_created_total", "Test sessions sampled and stored");
    metrics::describe_counter!(
        "test_responses_submitted_total",
        "Scored responses, labelled by input mode"
    );
    metrics::describe_counter!("test_sessions_finished_total", "Finish calls that stored a summary");
    metrics::describe_counter!(
        "question_bank_import_items_total",
        "Questions loaded by the bank importer"
    );
}
