//! Client-Konfiguration (TOML)
//!
//! ```toml
//! identitaet = "4711"   # ohne Angabe zufaellig
//!
//! [peer]
//! ice_server = ["stun:stun.l.google.com:19302"]
//!
//! [medien]
//! audio = true
//! video = false
//! ```

use connectly_core::types::Identity;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::capability::{MedienVorgaben, PeerConfig};
use crate::error::{CallError, CallResult};

/// Konfiguration des Anruf-Clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Feste Identitaet; ohne Angabe wird beim Start eine zufaellige erzeugt
    pub identitaet: Option<Identity>,
    pub peer: PeerConfig,
    pub medien: MedienVorgaben,
}

impl CallConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei
    pub fn laden(pfad: &Path) -> CallResult<Self> {
        let inhalt = std::fs::read_to_string(pfad).map_err(|e| {
            CallError::Konfiguration(format!("{} nicht lesbar: {e}", pfad.display()))
        })?;
        Self::aus_toml(&inhalt)
    }

    /// Parst die Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> CallResult<Self> {
        toml::from_str(inhalt).map_err(|e| CallError::Konfiguration(e.to_string()))
    }

    /// Konfigurierte Identitaet oder eine zufaellige aus 1000..=9999
    pub fn identitaet_oder_zufaellig(&self) -> Identity {
        self.identitaet.clone().unwrap_or_else(Identity::zufaellig)
    }
}
