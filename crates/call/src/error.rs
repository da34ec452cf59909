//! Fehlertypen fuer die Anruf-Steuerung

use thiserror::Error;

use crate::machine::Zustand;

/// Fehler der Anruf-State-Machine und des Signaling-Clients
///
/// Kein Fehler ist fatal: die State Machine faellt immer auf `Idle` zurueck
/// oder bleibt unveraendert.
#[derive(Debug, Error)]
pub enum CallError {
    /// Lokaler Befehl ist im aktuellen Zustand nicht erlaubt
    #[error("'{aktion}' ist im Zustand {zustand} nicht erlaubt")]
    UngueltigerZustand {
        aktion: &'static str,
        zustand: Zustand,
    },

    /// Anruf an die eigene Identitaet
    #[error("Eigene Identitaet kann nicht angerufen werden")]
    EigeneIdentitaet,

    /// Lokale Medien konnten nicht angefordert werden
    #[error("Medienzugriff fehlgeschlagen: {0}")]
    Medien(String),

    /// Peer-Transport meldet einen Fehler (Offer/Answer/Beschreibung/Kandidat)
    #[error("Peer-Transport-Fehler: {0}")]
    Peer(String),

    /// Keine Verbindung zum Signaling-Server
    #[error("Signaling-Verbindung getrennt")]
    Getrennt,

    /// IO-Fehler der Signaling-Verbindung
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Konfiguration konnte nicht gelesen werden
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl CallError {
    pub fn medien(msg: impl Into<String>) -> Self {
        Self::Medien(msg.into())
    }

    pub fn peer(msg: impl Into<String>) -> Self {
        Self::Peer(msg.into())
    }
}

/// Result-Typ fuer die Anruf-Steuerung
pub type CallResult<T> = Result<T, CallError>;
