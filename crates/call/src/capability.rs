//! Medien- und Transport-Faehigkeiten
//!
//! Die State Machine setzt keine konkrete Echtzeit-Medien-Implementierung
//! voraus. Eine Plattform stellt ueber `MediaCapability` lokale Medien und
//! Peer-Transporte bereit.
//!
//! `PeerHandle::schliessen` ist der einzige Abbruchmechanismus und muss die
//! lokalen Medien-Geraete synchron freigeben.

use async_trait::async_trait;
use connectly_protocol::Deskriptor;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::CallResult;

/// Oeffentliche STUN-Server fuer die ICE-Aushandlung
pub const STANDARD_ICE_SERVER: [&str; 2] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Vorgaben fuer die lokale Medienaufnahme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedienVorgaben {
    pub audio: bool,
    pub video: bool,
}

impl Default for MedienVorgaben {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Konfiguration eines Peer-Transports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// ICE-Server-URLs (STUN/TURN)
    pub ice_server: Vec<String>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_server: STANDARD_ICE_SERVER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ereignisse des Peer-Transports
// ---------------------------------------------------------------------------

/// Asynchrone Meldungen eines Peer-Transports
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEreignis {
    /// Lokal gefundener ICE-Kandidat, muss an die Gegenseite
    LokalerKandidat(Deskriptor),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Handle auf lokal aufgenommene Medien (Audio/Video-Tracks)
pub trait MediaHandle: Send + Sync {
    /// Stoppt alle Tracks und gibt die Geraete frei
    fn freigeben(&mut self);

    fn audio_aktivieren(&mut self, aktiv: bool);

    fn video_aktivieren(&mut self, aktiv: bool);
}

/// Handle auf einen Peer-Transport zu genau einer Gegenseite
#[async_trait]
pub trait PeerHandle: Send {
    async fn offer_erstellen(&mut self) -> CallResult<Deskriptor>;

    async fn answer_erstellen(&mut self) -> CallResult<Deskriptor>;

    async fn lokale_beschreibung_setzen(&mut self, beschreibung: Deskriptor) -> CallResult<()>;

    async fn remote_beschreibung_setzen(&mut self, beschreibung: Deskriptor) -> CallResult<()>;

    async fn ice_kandidat_hinzufuegen(&mut self, kandidat: Deskriptor) -> CallResult<()>;

    /// Schliesst den Transport
    fn schliessen(&mut self);
}

/// Plattform-Faehigkeit: lokale Medien und Peer-Transporte erzeugen
#[async_trait]
pub trait MediaCapability: Send + Sync + 'static {
    type Media: MediaHandle + 'static;
    type Peer: PeerHandle + 'static;

    async fn lokale_medien_anfordern(&self, vorgaben: &MedienVorgaben) -> CallResult<Self::Media>;

    /// Erstellt einen Peer-Transport
    ///
    /// Lokal gefundene ICE-Kandidaten meldet der Transport ueber `ereignisse`.
    async fn peer_erstellen(
        &self,
        config: &PeerConfig,
        medien: &Self::Media,
        ereignisse: mpsc::Sender<PeerEreignis>,
    ) -> CallResult<Self::Peer>;
}
