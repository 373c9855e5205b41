use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use ppm_shipments::config::PpmConfig;
use ppm_shipments::workflows::ppm::{
    AdvancePolicy, MemoryPpmStore, PpmShipmentService, RateTableEstimator,
    StandardShipmentRouter,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type ApiService =
    PpmShipmentService<MemoryPpmStore, StandardShipmentRouter, RateTableEstimator>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wires the PPM shipment service against the in-process store using the configured rates.
pub(crate) fn build_ppm_service(config: &PpmConfig) -> (ApiService, Arc<MemoryPpmStore>) {
    let store = Arc::new(MemoryPpmStore::new());
    let service = PpmShipmentService::new(
        store.clone(),
        StandardShipmentRouter,
        Arc::new(RateTableEstimator::from_config(config)),
        AdvancePolicy::from(config),
    );
    (service, store)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
