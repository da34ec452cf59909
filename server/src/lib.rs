//! connectly-server – Bibliotheks-Root
//!
//! Verdrahtet Signaling-Kern, Transporte und Observability zu einem
//! lauffaehigen Server und stellt den Einstiegspunkt fuer Tests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use connectly_observability::{observability_router, HealthState, SignalingMetrics};
use connectly_signaling::{ws_router, SignalingServer, SignalingState};
use std::future::Future;
use std::net::SocketAddr;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        self.laufen_bis(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            }
        })
        .await
    }

    /// Startet alle Subsysteme und laeuft bis `stopp` fertig ist
    ///
    /// Reihenfolge:
    /// 1. Metriken und Signaling-Zustand anlegen
    /// 2. TCP-Listener starten (native Clients)
    /// 3. WebSocket-Endpunkt `/ws` starten (Browser)
    /// 4. Observability-Server starten (falls aktiviert)
    /// 5. Auf `stopp` warten, dann alle Verbindungen trennen
    pub async fn laufen_bis<F>(self, stopp: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let metriken = SignalingMetrics::neu().context("Metriken konnten nicht registriert werden")?;
        let state = SignalingState::neu(self.config.signaling_config(), metriken.clone());
        let health = HealthState::neu(metriken);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tracing::info!(
            server_name = %self.config.server.name,
            max_verbindungen = self.config.server.max_verbindungen,
            "Server startet"
        );

        // TCP
        let tcp = SignalingServer::binden(state.clone(), self.config.tcp_bind_adresse()?)
            .await
            .context("TCP-Listener konnte nicht gebunden werden")?;
        let tcp_task = tokio::spawn(tcp.starten(shutdown_rx.clone()));

        // WebSocket
        let ws_adresse = self.config.ws_bind_adresse()?;
        let ws_listener = tokio::net::TcpListener::bind(ws_adresse)
            .await
            .with_context(|| format!("WebSocket-Listener auf {ws_adresse} nicht verfuegbar"))?;
        let ws_app = ws_router(state.clone(), shutdown_rx.clone());
        let ws_task = tokio::spawn(http_bedienen(
            ws_listener,
            ws_app,
            shutdown_rx.clone(),
            "WebSocket",
        ));

        // Observability
        let obs_task = if self.config.observability.aktiviert {
            let adresse = self.config.observability_bind_adresse()?;
            let listener = tokio::net::TcpListener::bind(adresse)
                .await
                .with_context(|| format!("Observability-Listener auf {adresse} nicht verfuegbar"))?;
            Some(tokio::spawn(http_bedienen(
                listener,
                observability_router(health.clone()),
                shutdown_rx.clone(),
                "Observability",
            )))
        } else {
            tracing::info!("Observability-Server deaktiviert");
            None
        };

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        stopp.await;
        tracing::info!(
            uptime_sek = state.uptime_sek(),
            verbindungen = state.broadcaster.verbindung_anzahl(),
            "Shutdown-Signal empfangen, Server wird beendet"
        );

        health.bereit_setzen(false);
        let _ = shutdown_tx.send(true);

        match tcp_task.await {
            Ok(Err(e)) => tracing::warn!(fehler = %e, "TCP-Listener mit Fehler beendet"),
            Err(e) => tracing::warn!(fehler = %e, "TCP-Task abgebrochen"),
            Ok(Ok(())) => {}
        }
        for task in std::iter::once(ws_task).chain(obs_task) {
            if let Err(e) = task.await {
                tracing::warn!(fehler = %e, "HTTP-Task abgebrochen");
            }
        }

        tracing::info!("Server beendet");
        Ok(())
    }
}

/// Bedient einen axum-Router bis zum Shutdown-Signal
async fn http_bedienen(
    listener: tokio::net::TcpListener,
    app: axum::Router,
    mut shutdown_rx: watch::Receiver<bool>,
    name: &'static str,
) {
    match listener.local_addr() {
        Ok(adresse) => tracing::info!(addr = %adresse, "{name}-Server gestartet"),
        Err(e) => tracing::warn!(fehler = %e, "{name}-Server ohne lokale Adresse"),
    }

    let ergebnis = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.wait_for(|stopp| *stopp).await;
    })
    .await;

    if let Err(e) = ergebnis {
        tracing::error!(fehler = %e, "{name}-Server mit Fehler beendet");
    }
}
