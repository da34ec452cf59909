//! Gemeinsame Hilfen fuer die Call-Tests: Fake-Medien und Test-Server

#![allow(dead_code)]

use async_trait::async_trait;
use connectly_call::{
    CallClient, CallConfig, CallError, CallResult, ClientStatus, MediaCapability, MediaHandle,
    MedienVorgaben, PeerConfig, PeerEreignis, PeerHandle,
};
use connectly_core::Identity;
use connectly_observability::SignalingMetrics;
use connectly_protocol::Deskriptor;
use connectly_signaling::{SignalingConfig, SignalingServer, SignalingState};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const WARTEZEIT: Duration = Duration::from_secs(2);

pub fn id(s: &str) -> Identity {
    Identity::parse(s).expect("gueltige Test-Identitaet")
}

pub fn logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("connectly_call=debug,connectly_signaling=debug")
        .try_init();
}

// ---------------------------------------------------------------------------
// Fake-Medien
// ---------------------------------------------------------------------------

/// Zaehlt alle Aufrufe an Medien und Peer-Transporten
#[derive(Default)]
pub struct Zaehler {
    pub medien_angefordert: AtomicUsize,
    pub medien_freigegeben: AtomicUsize,
    pub peers_erstellt: AtomicUsize,
    pub peers_geschlossen: AtomicUsize,
    pub lokale_beschreibungen: Mutex<Vec<Deskriptor>>,
    pub remote_beschreibungen: Mutex<Vec<Deskriptor>>,
    pub remote_kandidaten: Mutex<Vec<Deskriptor>>,
    pub audio: Mutex<Vec<bool>>,
    pub video: Mutex<Vec<bool>>,
    pub ice_server: Mutex<Vec<String>>,
}

impl Zaehler {
    pub fn freigaben(&self) -> (usize, usize) {
        (
            self.medien_freigegeben.load(Ordering::SeqCst),
            self.peers_geschlossen.load(Ordering::SeqCst),
        )
    }

    pub fn anforderungen(&self) -> (usize, usize) {
        (
            self.medien_angefordert.load(Ordering::SeqCst),
            self.peers_erstellt.load(Ordering::SeqCst),
        )
    }

    pub fn remote_kandidaten(&self) -> Vec<Deskriptor> {
        self.remote_kandidaten.lock().unwrap().clone()
    }
}

/// Medien-Faehigkeit ohne echte Geraete
#[derive(Clone, Default)]
pub struct FakeCapability {
    pub zaehler: Arc<Zaehler>,
    /// Medienzugriff verweigern
    pub medien_verweigern: bool,
    /// remote_beschreibung_setzen schlaegt fehl
    pub remote_fehler: bool,
    /// Nach setLocalDescription einen lokalen ICE-Kandidaten melden
    pub kandidaten_melden: bool,
}

impl FakeCapability {
    pub fn neu() -> Self {
        Self {
            kandidaten_melden: true,
            ..Self::default()
        }
    }
}

pub struct FakeMedia {
    zaehler: Arc<Zaehler>,
}

impl MediaHandle for FakeMedia {
    fn freigeben(&mut self) {
        self.zaehler.medien_freigegeben.fetch_add(1, Ordering::SeqCst);
    }

    fn audio_aktivieren(&mut self, aktiv: bool) {
        self.zaehler.audio.lock().unwrap().push(aktiv);
    }

    fn video_aktivieren(&mut self, aktiv: bool) {
        self.zaehler.video.lock().unwrap().push(aktiv);
    }
}

pub struct FakePeer {
    zaehler: Arc<Zaehler>,
    ereignisse: mpsc::Sender<PeerEreignis>,
    remote_fehler: bool,
    kandidaten_melden: bool,
}

#[async_trait]
impl PeerHandle for FakePeer {
    async fn offer_erstellen(&mut self) -> CallResult<Deskriptor> {
        Ok(Deskriptor::neu(json!({"type": "offer", "sdp": "fake-offer"})))
    }

    async fn answer_erstellen(&mut self) -> CallResult<Deskriptor> {
        Ok(Deskriptor::neu(json!({"type": "answer", "sdp": "fake-answer"})))
    }

    async fn lokale_beschreibung_setzen(&mut self, beschreibung: Deskriptor) -> CallResult<()> {
        self.zaehler
            .lokale_beschreibungen
            .lock()
            .unwrap()
            .push(beschreibung);
        if self.kandidaten_melden {
            let _ = self.ereignisse.try_send(PeerEreignis::LokalerKandidat(Deskriptor::neu(
                json!({"candidate": "candidate:1 1 udp 2122260223 192.0.2.1 54400 typ host", "sdpMid": "0"}),
            )));
        }
        Ok(())
    }

    async fn remote_beschreibung_setzen(&mut self, beschreibung: Deskriptor) -> CallResult<()> {
        if self.remote_fehler {
            return Err(CallError::peer("Remote-Beschreibung abgelehnt"));
        }
        self.zaehler
            .remote_beschreibungen
            .lock()
            .unwrap()
            .push(beschreibung);
        Ok(())
    }

    async fn ice_kandidat_hinzufuegen(&mut self, kandidat: Deskriptor) -> CallResult<()> {
        if kandidat.wert().get("candidate").is_none() {
            return Err(CallError::peer("Kandidat ohne 'candidate'-Feld"));
        }
        self.zaehler.remote_kandidaten.lock().unwrap().push(kandidat);
        Ok(())
    }

    fn schliessen(&mut self) {
        self.zaehler.peers_geschlossen.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaCapability for FakeCapability {
    type Media = FakeMedia;
    type Peer = FakePeer;

    async fn lokale_medien_anfordern(&self, _vorgaben: &MedienVorgaben) -> CallResult<FakeMedia> {
        if self.medien_verweigern {
            return Err(CallError::medien("Kamera verweigert"));
        }
        self.zaehler.medien_angefordert.fetch_add(1, Ordering::SeqCst);
        Ok(FakeMedia {
            zaehler: Arc::clone(&self.zaehler),
        })
    }

    async fn peer_erstellen(
        &self,
        config: &PeerConfig,
        _medien: &FakeMedia,
        ereignisse: mpsc::Sender<PeerEreignis>,
    ) -> CallResult<FakePeer> {
        self.zaehler.peers_erstellt.fetch_add(1, Ordering::SeqCst);
        *self.zaehler.ice_server.lock().unwrap() = config.ice_server.clone();
        Ok(FakePeer {
            zaehler: Arc::clone(&self.zaehler),
            ereignisse,
            remote_fehler: self.remote_fehler,
            kandidaten_melden: self.kandidaten_melden,
        })
    }
}

// ---------------------------------------------------------------------------
// Test-Server und Clients
// ---------------------------------------------------------------------------

/// Startet einen Signaling-Server auf 127.0.0.1:0
pub async fn server_starten() -> (SocketAddr, watch::Sender<bool>) {
    logging();
    let state = SignalingState::neu(
        SignalingConfig::default(),
        SignalingMetrics::neu().expect("Metriken"),
    );
    let server = SignalingServer::binden(state, "127.0.0.1:0".parse().unwrap())
        .await
        .expect("TCP-Listener binden");
    let adresse = server.lokale_adresse().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(server.starten(shutdown_rx));
    (adresse, shutdown_tx)
}

pub async fn client(adresse: SocketAddr, identitaet: &str) -> (CallClient, Arc<Zaehler>) {
    let capability = FakeCapability::neu();
    let zaehler = Arc::clone(&capability.zaehler);
    let client = CallClient::verbinden(adresse, id(identitaet), capability, CallConfig::default())
        .await
        .expect("Client verbinden");
    (client, zaehler)
}

/// Wartet bis der Client-Status `bedingung` erfuellt
pub async fn warten_auf(client: &CallClient, bedingung: impl Fn(&ClientStatus) -> bool) {
    let mut rx = client.status_abonnieren();
    tokio::time::timeout(WARTEZEIT, rx.wait_for(|status| bedingung(status)))
        .await
        .expect("Status nicht rechtzeitig erreicht")
        .expect("Status-Kanal geschlossen");
}

/// Wartet bis `bedingung` auf den Zaehlern erfuellt ist
pub async fn warten_bis(bedingung: impl Fn() -> bool) {
    tokio::time::timeout(WARTEZEIT, async {
        while !bedingung() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Bedingung nicht rechtzeitig erfuellt");
}
