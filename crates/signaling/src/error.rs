//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
///
/// Kein Fehler in diesem Crate ist fatal fuer den Prozess: Transportfehler
/// beenden nur die betroffene Verbindung.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket, Framing)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket-Fehler
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] axum::Error),

    /// Nachricht konnte nicht serialisiert werden
    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[from] serde_json::Error),
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
