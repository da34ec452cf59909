//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use connectly_observability::logging::{log_format_gueltig, log_level_gueltig};
use connectly_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use connectly_signaling::broadcast::SEND_QUEUE_GROESSE;
use connectly_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Queue- und Frame-Grenzen des Signaling-Kerns
    pub signaling: SignalingEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen (TCP + WebSocket)
    pub max_verbindungen: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Connectly Signaling".into(),
            max_verbindungen: 1024,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port fuer den WebSocket-Endpunkt `/ws`
    pub ws_port: u16,
    /// Port fuer native Clients (Laengenpraefix + JSON)
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            ws_port: 3000,
            tcp_port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Ausgehende Nachrichten pro Verbindung, bevor verworfen wird
    pub send_queue_groesse: usize,
    /// Maximale Frame- bzw. WebSocket-Nachrichtengroesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        Self {
            send_queue_groesse: SEND_QUEUE_GROESSE,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.pruefen()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.server.max_verbindungen == 0 {
            anyhow::bail!("server.max_verbindungen muss groesser 0 sein");
        }
        if self.signaling.send_queue_groesse == 0 {
            anyhow::bail!("signaling.send_queue_groesse muss groesser 0 sein");
        }
        if self.signaling.max_frame_groesse == 0 {
            anyhow::bail!("signaling.max_frame_groesse muss groesser 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            // Beliebige EnvFilter-Direktiven sind erlaubt, nur Hinweis
            tracing::debug!(level = %self.logging.level, "Log-Level ist eine Filter-Direktive");
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!(
                "logging.format '{}' unbekannt (erlaubt: text, json)",
                self.logging.format
            );
        }
        Ok(())
    }

    /// Einstellungen fuer den Signaling-Kern
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            server_name: self.server.name.clone(),
            max_verbindungen: self.server.max_verbindungen,
            send_queue_groesse: self.signaling.send_queue_groesse,
            max_frame_groesse: self.signaling.max_frame_groesse,
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer den WebSocket-Endpunkt zurueck
    pub fn ws_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.adresse(self.netzwerk.ws_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.adresse(self.netzwerk.tcp_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.adresse(self.observability.port)
    }

    fn adresse(&self, port: u16) -> anyhow::Result<SocketAddr> {
        let text = format!("{}:{}", self.netzwerk.bind_adresse, port);
        text.parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse '{text}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_verbindungen, 1024);
        assert_eq!(cfg.netzwerk.ws_port, 3000);
        assert_eq!(cfg.netzwerk.tcp_port, 3001);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.observability.aktiviert);
        assert!(cfg.pruefen().is_ok());
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.ws_bind_adresse().unwrap().to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.tcp_bind_adresse().unwrap().to_string(), "0.0.0.0:3001");
        assert_eq!(
            cfg.observability_bind_adresse().unwrap().to_string(),
            "0.0.0.0:9300"
        );
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Praxis"
            max_verbindungen = 100

            [netzwerk]
            tcp_port = 4001

            [signaling]
            send_queue_groesse = 8
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.name, "Praxis");
        assert_eq!(cfg.netzwerk.tcp_port, 4001);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.ws_port, 3000);
        assert_eq!(cfg.signaling.max_frame_groesse, DEFAULT_MAX_FRAME_SIZE);

        let signaling = cfg.signaling_config();
        assert_eq!(signaling.max_verbindungen, 100);
        assert_eq!(signaling.send_queue_groesse, 8);
        assert_eq!(signaling.server_name, "Praxis");
    }

    #[test]
    fn ungueltige_bind_adresse() {
        let mut cfg = ServerConfig::default();
        cfg.netzwerk.bind_adresse = "kein host".into();
        assert!(cfg.tcp_bind_adresse().is_err());
    }

    #[test]
    fn null_grenzen_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.signaling.send_queue_groesse = 0;
        assert!(cfg.pruefen().is_err());

        let mut cfg = ServerConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/connectly.toml").unwrap();
        assert_eq!(cfg.netzwerk.tcp_port, 3001);
    }
}
