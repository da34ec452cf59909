//! Anruf-State-Machine – eine Instanz pro Signaling-Verbindung
//!
//! ## Zustaende
//! ```text
//!            anrufen                 call-answered
//!   Idle ------------> Dialing ---------------------> Active
//!    ^  \                 |                             |
//!    |   \ incoming-call  | hang-up / auflegen          | hang-up / auflegen
//!    |    v               v                             v
//!    |   Ringing -------> Idle <------------------------+
//!    |      |  annehmen
//!    |      +-----------------------------------------> Active
//!    +-- ablehnen / hang-up
//! ```
//!
//! Jeder Uebergang nach `Idle` schliesst den Peer-Transport und gibt die
//! lokalen Medien genau einmal frei, egal welche Kante ihn ausgeloest hat.
//! Nachrichten die nicht zum aktuellen Zustand passen, werden ignoriert.

use connectly_core::types::Identity;
use connectly_protocol::{ClientNachricht, Deskriptor, ServerNachricht};
use std::fmt;
use tokio::sync::mpsc;

use crate::capability::{MediaCapability, MediaHandle, PeerEreignis, PeerHandle};
use crate::config::CallConfig;
use crate::error::{CallError, CallResult};

/// Groesse der Queue fuer Ereignisse eines Peer-Transports
const PEER_EREIGNIS_QUEUE: usize = 32;

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

/// Zustand der Anruf-State-Machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zustand {
    #[default]
    Idle,
    /// Offer gesendet, warte auf Answer
    Dialing,
    /// Offer empfangen, warte auf Entscheidung des Nutzers
    Ringing,
    /// Verbunden
    Active,
}

impl fmt::Display for Zustand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Zustand::Idle => "Idle",
            Zustand::Dialing => "Dialing",
            Zustand::Ringing => "Ringing",
            Zustand::Active => "Active",
        };
        f.write_str(name)
    }
}

/// Sicht auf den laufenden Anruf fuer die Oberflaeche
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Anrufphase {
    #[default]
    Bereit,
    Waehlt { ziel: Identity },
    Klingelt { von: Identity },
    Verbunden { gegenueber: Identity },
}

// ---------------------------------------------------------------------------
// Laufender Anruf
// ---------------------------------------------------------------------------

/// Ressourcen eines Anrufs (existiert nur ausserhalb von `Idle`)
struct Anruf<C: MediaCapability> {
    gegenueber: Identity,
    /// Offer der Gegenseite, nur im Zustand Ringing
    offer: Option<Deskriptor>,
    medien: Option<C::Media>,
    peer: Option<C::Peer>,
    peer_ereignisse: Option<mpsc::Receiver<PeerEreignis>>,
    audio: bool,
    video: bool,
}

impl<C: MediaCapability> Anruf<C> {
    fn neu(gegenueber: Identity) -> Self {
        Self {
            gegenueber,
            offer: None,
            medien: None,
            peer: None,
            peer_ereignisse: None,
            audio: true,
            video: true,
        }
    }

    /// Schliesst Peer-Transport und gibt Medien frei
    fn abbauen(mut self) {
        if let Some(mut peer) = self.peer.take() {
            peer.schliessen();
        }
        if let Some(mut medien) = self.medien.take() {
            medien.freigeben();
        }
    }
}

// ---------------------------------------------------------------------------
// CallStateMachine
// ---------------------------------------------------------------------------

/// Client-seitige Anruf-Steuerung
///
/// Wird exklusiv von einem Task besessen; alle Eingaben (Nutzerbefehle,
/// Server-Nachrichten, Peer-Ereignisse) werden nacheinander verarbeitet.
/// Ausgehende Signaling-Nachrichten landen in `ausgang`.
pub struct CallStateMachine<C: MediaCapability> {
    eigene: Identity,
    capability: C,
    config: CallConfig,
    ausgang: mpsc::UnboundedSender<ClientNachricht>,
    zustand: Zustand,
    anruf: Option<Anruf<C>>,
}

impl<C: MediaCapability> CallStateMachine<C> {
    pub fn neu(
        eigene: Identity,
        capability: C,
        config: CallConfig,
        ausgang: mpsc::UnboundedSender<ClientNachricht>,
    ) -> Self {
        Self {
            eigene,
            capability,
            config,
            ausgang,
            zustand: Zustand::Idle,
            anruf: None,
        }
    }

    pub fn zustand(&self) -> Zustand {
        self.zustand
    }

    pub fn eigene_identitaet(&self) -> &Identity {
        &self.eigene
    }

    /// Gegenseite des laufenden Anrufs
    pub fn gegenueber(&self) -> Option<&Identity> {
        self.anruf.as_ref().map(|a| &a.gegenueber)
    }

    pub fn phase(&self) -> Anrufphase {
        match (self.zustand, self.anruf.as_ref()) {
            (Zustand::Dialing, Some(a)) => Anrufphase::Waehlt {
                ziel: a.gegenueber.clone(),
            },
            (Zustand::Ringing, Some(a)) => Anrufphase::Klingelt {
                von: a.gegenueber.clone(),
            },
            (Zustand::Active, Some(a)) => Anrufphase::Verbunden {
                gegenueber: a.gegenueber.clone(),
            },
            _ => Anrufphase::Bereit,
        }
    }

    /// (audio, video) der lokalen Tracks, falls Medien aktiv sind
    pub fn medien_status(&self) -> Option<(bool, bool)> {
        self.anruf
            .as_ref()
            .filter(|a| a.medien.is_some())
            .map(|a| (a.audio, a.video))
    }

    // -----------------------------------------------------------------------
    // Lokale Befehle
    // -----------------------------------------------------------------------

    /// Startet einen Anruf an `ziel` (Idle -> Dialing)
    ///
    /// Schlaegt der Aufbau fehl, faellt die Machine auf Idle zurueck, ohne
    /// dass eine Nachricht gesendet wurde.
    pub async fn anrufen(&mut self, ziel: Identity) -> CallResult<()> {
        self.zustand_pruefen("anrufen", Zustand::Idle)?;
        if ziel == self.eigene {
            return Err(CallError::EigeneIdentitaet);
        }

        tracing::info!(ziel = %ziel, "Anruf wird aufgebaut");
        self.anruf = Some(Anruf::neu(ziel.clone()));

        let offer = match self.aufbau_als_anrufer().await {
            Ok(offer) => offer,
            Err(e) => {
                tracing::warn!(ziel = %ziel, fehler = %e, "Anrufaufbau fehlgeschlagen");
                self.abbauen();
                return Err(e);
            }
        };

        self.senden(ClientNachricht::CallUser {
            to: ziel,
            from: self.eigene.clone(),
            offer,
        });
        self.zustand = Zustand::Dialing;
        Ok(())
    }

    /// Nimmt den eingehenden Anruf an (Ringing -> Active)
    ///
    /// Schlaegt der Aufbau fehl, bekommt der Anrufer ein `hang-up`.
    pub async fn annehmen(&mut self) -> CallResult<()> {
        self.zustand_pruefen("annehmen", Zustand::Ringing)?;

        let answer = match self.aufbau_als_angerufener().await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(fehler = %e, "Annehmen fehlgeschlagen");
                self.auflegen_und_abbauen();
                return Err(e);
            }
        };

        let von = self.gegenueber_oder_intern()?;
        self.senden(ClientNachricht::AnswerCall { to: von, answer });
        self.zustand = Zustand::Active;
        tracing::info!(gegenueber = ?self.gegenueber(), "Anruf angenommen");
        Ok(())
    }

    /// Lehnt den eingehenden Anruf ab (Ringing -> Idle)
    pub fn ablehnen(&mut self) -> CallResult<()> {
        self.zustand_pruefen("ablehnen", Zustand::Ringing)?;
        tracing::info!(von = ?self.gegenueber(), "Anruf abgelehnt");
        self.auflegen_und_abbauen();
        Ok(())
    }

    /// Beendet den Anruf lokal (Dialing/Ringing/Active -> Idle)
    pub fn auflegen(&mut self) -> CallResult<()> {
        if self.zustand == Zustand::Idle {
            return Err(CallError::UngueltigerZustand {
                aktion: "auflegen",
                zustand: self.zustand,
            });
        }
        tracing::info!(gegenueber = ?self.gegenueber(), zustand = %self.zustand, "Lokal aufgelegt");
        self.auflegen_und_abbauen();
        Ok(())
    }

    /// Schaltet den lokalen Audio-Track an/aus
    pub fn audio_umschalten(&mut self, aktiv: bool) -> CallResult<()> {
        let zustand = self.zustand;
        let anruf = self
            .anruf
            .as_mut()
            .filter(|a| a.medien.is_some())
            .ok_or(CallError::UngueltigerZustand {
                aktion: "audio_umschalten",
                zustand,
            })?;
        if let Some(medien) = anruf.medien.as_mut() {
            medien.audio_aktivieren(aktiv);
        }
        anruf.audio = aktiv;
        Ok(())
    }

    /// Schaltet den lokalen Video-Track an/aus
    pub fn video_umschalten(&mut self, aktiv: bool) -> CallResult<()> {
        let zustand = self.zustand;
        let anruf = self
            .anruf
            .as_mut()
            .filter(|a| a.medien.is_some())
            .ok_or(CallError::UngueltigerZustand {
                aktion: "video_umschalten",
                zustand,
            })?;
        if let Some(medien) = anruf.medien.as_mut() {
            medien.video_aktivieren(aktiv);
        }
        anruf.video = aktiv;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Eingehende Nachrichten
    // -----------------------------------------------------------------------

    /// Verarbeitet eine Nachricht vom Signaling-Server
    ///
    /// Unpassende Nachrichten aendern nichts.
    pub async fn nachricht_verarbeiten(&mut self, nachricht: ServerNachricht) {
        match nachricht {
            ServerNachricht::IncomingCall { from, offer } => self.eingehender_anruf(from, offer),
            ServerNachricht::CallAnswered { answer } => self.angenommen(answer).await,
            ServerNachricht::IceCandidate { candidate } => self.remote_kandidat(candidate).await,
            ServerNachricht::HangUp => self.aufgelegt(),
            ServerNachricht::UserList { .. } => {}
        }
    }

    fn eingehender_anruf(&mut self, von: Identity, offer: Deskriptor) {
        if self.zustand != Zustand::Idle {
            tracing::debug!(von = %von, zustand = %self.zustand, "incoming-call ignoriert");
            return;
        }
        tracing::info!(von = %von, "Eingehender Anruf");
        let mut anruf = Anruf::neu(von);
        anruf.offer = Some(offer);
        self.anruf = Some(anruf);
        self.zustand = Zustand::Ringing;
    }

    async fn angenommen(&mut self, answer: Deskriptor) {
        if self.zustand != Zustand::Dialing {
            tracing::debug!(zustand = %self.zustand, "call-answered ignoriert");
            return;
        }
        let Some(peer) = self.anruf.as_mut().and_then(|a| a.peer.as_mut()) else {
            return;
        };

        match peer.remote_beschreibung_setzen(answer).await {
            Ok(()) => {
                self.zustand = Zustand::Active;
                tracing::info!(gegenueber = ?self.gegenueber(), "Anruf verbunden");
            }
            Err(e) => {
                tracing::warn!(fehler = %e, "Answer konnte nicht gesetzt werden");
                self.auflegen_und_abbauen();
            }
        }
    }

    async fn remote_kandidat(&mut self, kandidat: Deskriptor) {
        let Some(peer) = self.anruf.as_mut().and_then(|a| a.peer.as_mut()) else {
            tracing::debug!(zustand = %self.zustand, "ICE-Kandidat ohne Peer-Transport verworfen");
            return;
        };
        if let Err(e) = peer.ice_kandidat_hinzufuegen(kandidat).await {
            tracing::warn!(fehler = %e, "Ungueltiger ICE-Kandidat ignoriert");
        }
    }

    fn aufgelegt(&mut self) {
        if self.zustand == Zustand::Idle {
            return;
        }
        tracing::info!(gegenueber = ?self.gegenueber(), zustand = %self.zustand, "Gegenseite hat aufgelegt");
        self.abbauen();
    }

    // -----------------------------------------------------------------------
    // Peer-Ereignisse
    // -----------------------------------------------------------------------

    /// Wartet auf das naechste Ereignis des aktuellen Peer-Transports
    ///
    /// Ohne Peer-Transport wartet die Future unbegrenzt; sie ist fuer
    /// `tokio::select!` gedacht.
    pub async fn naechstes_peer_ereignis(&mut self) -> PeerEreignis {
        let empfaenger = self.anruf.as_mut().and_then(|a| a.peer_ereignisse.as_mut());
        if let Some(rx) = empfaenger {
            if let Some(ereignis) = rx.recv().await {
                return ereignis;
            }
        }
        std::future::pending().await
    }

    /// Verarbeitet ein Ereignis des Peer-Transports
    pub fn peer_ereignis_verarbeiten(&mut self, ereignis: PeerEreignis) {
        match ereignis {
            PeerEreignis::LokalerKandidat(kandidat) => self.lokaler_kandidat(kandidat),
        }
    }

    /// Leitet einen lokal gefundenen ICE-Kandidaten an die Gegenseite weiter
    pub fn lokaler_kandidat(&mut self, kandidat: Deskriptor) {
        let ziel = match self.anruf.as_ref() {
            Some(anruf) if anruf.peer.is_some() => anruf.gegenueber.clone(),
            _ => {
                tracing::debug!("Lokaler ICE-Kandidat ohne Peer-Transport verworfen");
                return;
            }
        };
        self.senden(ClientNachricht::IceCandidate {
            to: ziel,
            candidate: kandidat,
        });
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    async fn aufbau_als_anrufer(&mut self) -> CallResult<Deskriptor> {
        self.medien_und_peer_erstellen().await?;
        let peer = self.peer_mut()?;
        let offer = peer.offer_erstellen().await?;
        peer.lokale_beschreibung_setzen(offer.clone()).await?;
        Ok(offer)
    }

    async fn aufbau_als_angerufener(&mut self) -> CallResult<Deskriptor> {
        let offer = self
            .anruf
            .as_mut()
            .and_then(|a| a.offer.take())
            .ok_or_else(|| CallError::peer("Kein Offer vorhanden"))?;

        self.medien_und_peer_erstellen().await?;
        let peer = self.peer_mut()?;
        peer.remote_beschreibung_setzen(offer).await?;
        let answer = peer.answer_erstellen().await?;
        peer.lokale_beschreibung_setzen(answer.clone()).await?;
        Ok(answer)
    }

    /// Fordert Medien an und erstellt den Peer-Transport fuer den aktuellen Anruf
    ///
    /// Bereits erzeugte Ressourcen haengen am Anruf und werden bei einem
    /// Fehler von `abbauen` mit freigegeben.
    async fn medien_und_peer_erstellen(&mut self) -> CallResult<()> {
        let medien = self
            .capability
            .lokale_medien_anfordern(&self.config.medien)
            .await?;
        let (tx, rx) = mpsc::channel(PEER_EREIGNIS_QUEUE);
        let anruf = self
            .anruf
            .as_mut()
            .ok_or_else(|| CallError::peer("Kein laufender Anruf"))?;
        anruf.audio = self.config.medien.audio;
        anruf.video = self.config.medien.video;
        let medien = anruf.medien.insert(medien);

        let peer = self
            .capability
            .peer_erstellen(&self.config.peer, medien, tx)
            .await?;
        anruf.peer = Some(peer);
        anruf.peer_ereignisse = Some(rx);
        Ok(())
    }

    fn peer_mut(&mut self) -> CallResult<&mut C::Peer> {
        self.anruf
            .as_mut()
            .and_then(|a| a.peer.as_mut())
            .ok_or_else(|| CallError::peer("Kein Peer-Transport"))
    }

    fn gegenueber_oder_intern(&self) -> CallResult<Identity> {
        self.gegenueber()
            .cloned()
            .ok_or_else(|| CallError::peer("Kein laufender Anruf"))
    }

    fn zustand_pruefen(&self, aktion: &'static str, erwartet: Zustand) -> CallResult<()> {
        if self.zustand == erwartet {
            Ok(())
        } else {
            Err(CallError::UngueltigerZustand {
                aktion,
                zustand: self.zustand,
            })
        }
    }

    /// Sendet `hang-up` an die Gegenseite und baut ab
    fn auflegen_und_abbauen(&mut self) {
        if let Some(ziel) = self.gegenueber().cloned() {
            self.senden(ClientNachricht::HangUp { to: ziel });
        }
        self.abbauen();
    }

    /// Uebergang nach Idle; gibt Ressourcen genau einmal frei
    fn abbauen(&mut self) {
        if let Some(anruf) = self.anruf.take() {
            anruf.abbauen();
        }
        self.zustand = Zustand::Idle;
    }

    fn senden(&self, nachricht: ClientNachricht) {
        if self.ausgang.send(nachricht).is_err() {
            tracing::debug!("Signaling-Ausgang geschlossen – Nachricht verworfen");
        }
    }
}

impl<C: MediaCapability> Drop for CallStateMachine<C> {
    fn drop(&mut self) {
        self.abbauen();
    }
}
