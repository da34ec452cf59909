//! Fehlertypen fuer Connectly
//!
//! Zentraler Fehler-Enum fuer die gemeinsamen Typen. Die Fach-Crates
//! (Signaling, Call) definieren eigene Fehler.

use thiserror::Error;

/// Globaler Result-Alias fuer Connectly
pub type Result<T> = std::result::Result<T, ConnectlyError>;

/// Fehler der gemeinsamen Typen
#[derive(Debug, Error)]
pub enum ConnectlyError {
    #[error("Ungueltige Identitaet '{0}': erwartet werden genau 4 Ziffern")]
    UngueltigeIdentitaet(String),
}
