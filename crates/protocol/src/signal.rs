//! Signaling-Protokoll
//!
//! Definiert alle Nachrichten die zwischen Client und Signaling-Server
//! ausgetauscht werden.
//!
//! ## Design
//! - Ein JSON-Objekt pro Nachricht, Ereignisname im Feld `event`
//! - Payload-Felder stehen flach neben `event`
//! - Offer/Answer/Kandidat sind opake JSON-Werte; der Server interpretiert sie nie
//!
//! ```text
//! {"event":"call-user","to":"2222","from":"1111","offer":{"type":"offer","sdp":"..."}}
//! ```

use connectly_core::types::Identity;
use serde::{Deserialize, Serialize};

/// Opaker Verhandlungs-Deskriptor (SDP-Offer/Answer oder ICE-Kandidat)
///
/// Wird ohne Interpretation weitergeleitet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deskriptor(pub serde_json::Value);

impl Deskriptor {
    pub fn neu(wert: serde_json::Value) -> Self {
        Self(wert)
    }

    pub fn wert(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for Deskriptor {
    fn from(wert: serde_json::Value) -> Self {
        Self(wert)
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Nachrichten vom Client an den Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientNachricht {
    /// Identitaet fuer diese Verbindung registrieren
    Register { identity: Identity },
    /// Anruf-Offer an `to`
    CallUser {
        to: Identity,
        from: Identity,
        offer: Deskriptor,
    },
    /// Answer auf ein empfangenes Offer
    AnswerCall { to: Identity, answer: Deskriptor },
    /// Lokal gefundener ICE-Kandidat
    IceCandidate { to: Identity, candidate: Deskriptor },
    /// Anruf beenden / ablehnen
    HangUp { to: Identity },
}

impl ClientNachricht {
    /// Ereignisname auf dem Draht (fuer Logs und Metriken)
    pub fn ereignis(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::CallUser { .. } => "call-user",
            Self::AnswerCall { .. } => "answer-call",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::HangUp { .. } => "hang-up",
        }
    }

    /// Ziel-Identitaet bei weiterzuleitenden Nachrichten
    pub fn ziel(&self) -> Option<&Identity> {
        match self {
            Self::Register { .. } => None,
            Self::CallUser { to, .. }
            | Self::AnswerCall { to, .. }
            | Self::IceCandidate { to, .. }
            | Self::HangUp { to } => Some(to),
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Nachrichten vom Server an einen Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerNachricht {
    /// Vollstaendige Menge aller registrierten Identitaeten
    UserList { identities: Vec<Identity> },
    /// Eingehender Anruf
    IncomingCall { from: Identity, offer: Deskriptor },
    /// Gegenseite hat den Anruf angenommen
    CallAnswered { answer: Deskriptor },
    /// ICE-Kandidat der Gegenseite
    IceCandidate { candidate: Deskriptor },
    /// Gegenseite hat aufgelegt
    HangUp,
}

impl ServerNachricht {
    /// Ereignisname auf dem Draht (fuer Logs und Metriken)
    pub fn ereignis(&self) -> &'static str {
        match self {
            Self::UserList { .. } => "user-list",
            Self::IncomingCall { .. } => "incoming-call",
            Self::CallAnswered { .. } => "call-answered",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::HangUp => "hang-up",
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
