//! Prometheus-kompatible Metriken fuer Connectly
//!
//! Registrierte Metriken:
//! - `connectly_open_connections` – Gauge: Offene Transport-Verbindungen
//! - `connectly_registered_identities` – Gauge: Registrierte Identitaeten
//! - `connectly_relayed_messages_total` – Counter: Weitergeleitete Nachrichten (event)
//! - `connectly_routing_misses_total` – Counter: Ziel nicht registriert
//! - `connectly_presence_broadcasts_total` – Counter: Versendete user-list Snapshots
//! - `connectly_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Alle Connectly-Prometheus-Metriken
///
/// Clone teilt dieselben Zaehler (prometheus-Typen sind intern Arc).
#[derive(Clone)]
pub struct SignalingMetrics {
    pub registry: Arc<Registry>,

    // Signaling-Metriken
    pub offene_verbindungen: IntGauge,
    pub registrierte_identitaeten: IntGauge,
    pub weitergeleitet_total: IntCounterVec,
    pub routing_fehlgriffe_total: IntCounter,
    pub presence_broadcasts_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
}

impl SignalingMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let offene_verbindungen = IntGauge::with_opts(Opts::new(
            "connectly_open_connections",
            "Anzahl offener Transport-Verbindungen",
        ))?;
        registry.register(Box::new(offene_verbindungen.clone()))?;

        let registrierte_identitaeten = IntGauge::with_opts(Opts::new(
            "connectly_registered_identities",
            "Anzahl registrierter Identitaeten",
        ))?;
        registry.register(Box::new(registrierte_identitaeten.clone()))?;

        let weitergeleitet_total = IntCounterVec::new(
            Opts::new(
                "connectly_relayed_messages_total",
                "Zugestellte Signaling-Nachrichten",
            ),
            &["event"],
        )?;
        registry.register(Box::new(weitergeleitet_total.clone()))?;

        let routing_fehlgriffe_total = IntCounter::with_opts(Opts::new(
            "connectly_routing_misses_total",
            "Nachrichten an nicht registrierte Identitaeten (verworfen)",
        ))?;
        registry.register(Box::new(routing_fehlgriffe_total.clone()))?;

        let presence_broadcasts_total = IntCounter::with_opts(Opts::new(
            "connectly_presence_broadcasts_total",
            "Versendete user-list Snapshots",
        ))?;
        registry.register(Box::new(presence_broadcasts_total.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("connectly_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            offene_verbindungen,
            registrierte_identitaeten,
            weitergeleitet_total,
            routing_fehlgriffe_total,
            presence_broadcasts_total,
            http_requests_total,
        })
    }

    /// Zaehlt eine zugestellte Nachricht
    pub fn weitergeleitet(&self, event: &str) {
        self.weitergeleitet_total.with_label_values(&[event]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: SignalingMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<SignalingMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
