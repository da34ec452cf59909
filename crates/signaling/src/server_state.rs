//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Broadcaster, Presence und Relay, die sicher zwischen
//! tokio-Tasks geteilt werden koennen. Wird beim Start einmal erzeugt und
//! beim Shutdown verworfen.

use connectly_observability::SignalingMetrics;
use connectly_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::{EventBroadcaster, SEND_QUEUE_GROESSE};
use crate::presence::PresenceBroadcaster;
use crate::registry::ConnectionRegistry;
use crate::relay::SignalingRelay;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitig offene Verbindungen (TCP + WebSocket)
    pub max_verbindungen: usize,
    /// Groesse der ausgehenden Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Maximale Frame-Groesse fuer TCP-Verbindungen in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Connectly".to_string(),
            max_verbindungen: 1024,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: SignalingConfig,
    /// Identitaet <-> Verbindung
    pub registry: ConnectionRegistry,
    /// Send-Queues aller offenen Verbindungen
    pub broadcaster: EventBroadcaster,
    /// user-list Fan-out
    pub presence: PresenceBroadcaster,
    /// Weiterleitung call-user / answer-call / ice-candidate / hang-up
    pub relay: SignalingRelay,
    /// Prometheus-Metriken
    pub metriken: SignalingMetrics,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, metriken: SignalingMetrics) -> Arc<Self> {
        let registry = ConnectionRegistry::neu();
        let broadcaster = EventBroadcaster::mit_queue_groesse(config.send_queue_groesse);
        let presence = PresenceBroadcaster::neu(broadcaster.clone(), metriken.clone());
        let relay = SignalingRelay::neu(registry.clone(), broadcaster.clone(), metriken.clone());

        Arc::new(Self {
            config,
            registry,
            broadcaster,
            presence,
            relay,
            metriken,
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Prueft ob weitere Verbindungen angenommen werden duerfen
    pub fn hat_kapazitaet(&self) -> bool {
        self.broadcaster.verbindung_anzahl() < self.config.max_verbindungen
    }
}
