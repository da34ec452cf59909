//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage, protokolliert sie als
//! strukturiertes Log-Event und zaehlt sie in `connectly_http_requests_total`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::SignalingMetrics;

/// Erstellt den tower-http TraceLayer fuer HTTP-Spans.
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}

/// Axum-Middleware-Funktion: misst Antwortzeit, loggt und zaehlt.
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
/// ```
pub async fn timing_middleware(
    State(metriken): State<SignalingMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let methode = req.method().to_string();
    let pfad = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    metriken
        .http_requests_total
        .with_label_values(&[methode.as_str(), pfad.as_str(), &status.to_string()])
        .inc();

    tracing::debug!(
        method = %methode,
        path = %pfad,
        status = status,
        duration_ms = start.elapsed().as_millis() as u64,
        "HTTP-Anfrage abgeschlossen"
    );

    response
}
