//! Gemeinsame Identifikationstypen fuer Connectly
//!
//! `Identity` ist der Routing-Schluessel der Registry (4 Ziffern),
//! `SessionId` kennzeichnet eine einzelne Transport-Verbindung.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConnectlyError;

/// Anzahl der Ziffern einer Identitaet
pub const IDENTITY_LAENGE: usize = 4;

/// Vierstellige numerische Identitaet eines Teilnehmers
///
/// Wird clientseitig beim Login erzeugt und ist nicht global eindeutig.
/// Eindeutigkeit als Routing-Schluessel entsteht erst durch die
/// Last-Write-Wins-Semantik der Registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parst und validiert eine Identitaet (genau vier ASCII-Ziffern)
    pub fn parse(wert: impl Into<String>) -> Result<Self, ConnectlyError> {
        let wert = wert.into();
        if wert.len() == IDENTITY_LAENGE && wert.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(wert))
        } else {
            Err(ConnectlyError::UngueltigeIdentitaet(wert))
        }
    }

    /// Erzeugt eine zufaellige Identitaet im Bereich 1000..=9999
    pub fn zufaellig() -> Self {
        let zahl: u16 = rand::thread_rng().gen_range(1000..=9999);
        Self(zahl.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = ConnectlyError;

    fn try_from(wert: String) -> Result<Self, Self::Error> {
        Self::parse(wert)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl std::str::FromStr for Identity {
    type Err = ConnectlyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Eindeutige ID einer Transport-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identitaet_gueltig() {
        let id = Identity::parse("1234").unwrap();
        assert_eq!(id.as_str(), "1234");
        assert_eq!(id.to_string(), "1234");
    }

    #[test]
    fn identitaet_ungueltig() {
        assert!(Identity::parse("123").is_err());
        assert!(Identity::parse("12345").is_err());
        assert!(Identity::parse("12a4").is_err());
        assert!(Identity::parse("").is_err());
        // Nicht-ASCII-Ziffern (arabisch-indisch) zaehlen nicht
        assert!(Identity::parse("١٢٣٤").is_err());
    }

    #[test]
    fn zufaellige_identitaet_im_bereich() {
        for _ in 0..100 {
            let id = Identity::zufaellig();
            let zahl: u16 = id.as_str().parse().unwrap();
            assert!((1000..=9999).contains(&zahl));
        }
    }

    #[test]
    fn identitaet_serde_als_string() {
        let id = Identity::parse("0042").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0042\"");
        let zurueck: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, id);
    }

    #[test]
    fn identitaet_serde_lehnt_ungueltige_ab() {
        let ergebnis: Result<Identity, _> = serde_json::from_str("\"12\"");
        assert!(ergebnis.is_err());
    }

    #[test]
    fn session_id_eindeutig() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn session_id_display() {
        let id = SessionId(Uuid::nil());
        assert!(id.to_string().starts_with("session:"));
    }
}
