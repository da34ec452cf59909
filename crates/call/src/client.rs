//! Client-seitige TCP-Verbindung zum Connectly Signaling-Server
//!
//! Nutzt den `ClientCodec` aus connectly-protocol (u32 BE Laenge + JSON).
//! Ein Hintergrund-Task besitzt die `CallStateMachine` exklusiv und
//! verarbeitet Nutzerbefehle, Server-Nachrichten und Peer-Ereignisse
//! strikt nacheinander.

use connectly_core::types::Identity;
use connectly_protocol::{ClientCodec, ClientNachricht, ServerNachricht};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::capability::MediaCapability;
use crate::config::CallConfig;
use crate::error::{CallError, CallResult};
use crate::machine::{Anrufphase, CallStateMachine, Zustand};

/// Groesse der Befehls-Queue
const BEFEHL_QUEUE: usize = 16;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Beobachtbarer Zustand des Clients
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientStatus {
    pub zustand: Zustand,
    pub phase: Anrufphase,
    /// Zuletzt empfangene `user-list`
    pub online: Vec<Identity>,
    /// (audio, video) der lokalen Tracks waehrend eines Anrufs
    pub medien: Option<(bool, bool)>,
    /// false sobald die Signaling-Verbindung beendet ist
    pub verbunden: bool,
}

// ---------------------------------------------------------------------------
// Befehle
// ---------------------------------------------------------------------------

type Antwort = oneshot::Sender<CallResult<()>>;

enum Befehl {
    Anrufen(Identity, Antwort),
    Annehmen(Antwort),
    Ablehnen(Antwort),
    Auflegen(Antwort),
    Audio(bool, Antwort),
    Video(bool, Antwort),
    Trennen,
}

// ---------------------------------------------------------------------------
// CallClient
// ---------------------------------------------------------------------------

/// Verbindung zum Signaling-Server mit eigener Anruf-State-Machine
pub struct CallClient {
    identitaet: Identity,
    befehle: mpsc::Sender<Befehl>,
    status_rx: watch::Receiver<ClientStatus>,
    task: JoinHandle<()>,
}

impl CallClient {
    /// Verbindet sich mit dem Server und registriert `identitaet`
    pub async fn verbinden<A, C>(
        adresse: A,
        identitaet: Identity,
        capability: C,
        config: CallConfig,
    ) -> CallResult<Self>
    where
        A: ToSocketAddrs,
        C: MediaCapability,
    {
        let stream = TcpStream::connect(adresse).await?;
        let peer = stream.peer_addr()?;
        tracing::info!(server = %peer, identity = %identitaet, "Signaling-Verbindung hergestellt");

        let mut framed = Framed::new(stream, ClientCodec::new());
        framed
            .send(ClientNachricht::Register {
                identity: identitaet.clone(),
            })
            .await?;

        let (ausgang_tx, ausgang_rx) = mpsc::unbounded_channel();
        let machine = CallStateMachine::neu(identitaet.clone(), capability, config, ausgang_tx);

        let (befehle, befehle_rx) = mpsc::channel(BEFEHL_QUEUE);
        let (status_tx, status_rx) = watch::channel(ClientStatus {
            verbunden: true,
            ..ClientStatus::default()
        });

        let task = tokio::spawn(client_schleife(
            framed,
            machine,
            befehle_rx,
            ausgang_rx,
            status_tx,
        ));

        Ok(Self {
            identitaet,
            befehle,
            status_rx,
            task,
        })
    }

    pub fn identitaet(&self) -> &Identity {
        &self.identitaet
    }

    /// Aktueller Status
    pub fn status(&self) -> ClientStatus {
        self.status_rx.borrow().clone()
    }

    /// Beobachtet Statusaenderungen
    pub fn status_abonnieren(&self) -> watch::Receiver<ClientStatus> {
        self.status_rx.clone()
    }

    pub async fn anrufen(&self, ziel: Identity) -> CallResult<()> {
        self.befehl(|antwort| Befehl::Anrufen(ziel, antwort)).await
    }

    pub async fn annehmen(&self) -> CallResult<()> {
        self.befehl(Befehl::Annehmen).await
    }

    pub async fn ablehnen(&self) -> CallResult<()> {
        self.befehl(Befehl::Ablehnen).await
    }

    pub async fn auflegen(&self) -> CallResult<()> {
        self.befehl(Befehl::Auflegen).await
    }

    pub async fn audio_umschalten(&self, aktiv: bool) -> CallResult<()> {
        self.befehl(|antwort| Befehl::Audio(aktiv, antwort)).await
    }

    pub async fn video_umschalten(&self, aktiv: bool) -> CallResult<()> {
        self.befehl(|antwort| Befehl::Video(aktiv, antwort)).await
    }

    /// Trennt die Signaling-Verbindung und wartet auf das Task-Ende
    ///
    /// Ein laufender Anruf wird dabei lokal abgebaut.
    pub async fn trennen(self) {
        let _ = self.befehle.send(Befehl::Trennen).await;
        if let Err(e) = self.task.await {
            tracing::warn!(fehler = %e, "Client-Task abgebrochen");
        }
    }

    async fn befehl(&self, befehl: impl FnOnce(Antwort) -> Befehl) -> CallResult<()> {
        let (tx, rx) = oneshot::channel();
        self.befehle
            .send(befehl(tx))
            .await
            .map_err(|_| CallError::Getrennt)?;
        rx.await.map_err(|_| CallError::Getrennt)?
    }
}

// ---------------------------------------------------------------------------
// Hintergrund-Task
// ---------------------------------------------------------------------------

async fn client_schleife<C: MediaCapability>(
    mut framed: Framed<TcpStream, ClientCodec>,
    mut machine: CallStateMachine<C>,
    mut befehle: mpsc::Receiver<Befehl>,
    mut ausgang: mpsc::UnboundedReceiver<ClientNachricht>,
    status_tx: watch::Sender<ClientStatus>,
) {
    let mut online: Vec<Identity> = Vec::new();

    loop {
        tokio::select! {
            // Nachricht vom Server
            frame = framed.next() => {
                match frame {
                    Some(Ok(Ok(ServerNachricht::UserList { identities }))) => {
                        online = identities;
                    }
                    Some(Ok(Ok(nachricht))) => {
                        machine.nachricht_verarbeiten(nachricht).await;
                    }
                    Some(Ok(Err(e))) => {
                        tracing::warn!(fehler = %e, "Ungueltige Server-Nachricht uebersprungen");
                    }
                    Some(Err(e)) => {
                        tracing::warn!(fehler = %e, "Frame-Lesefehler");
                        break;
                    }
                    None => {
                        tracing::info!("Verbindung vom Server getrennt");
                        break;
                    }
                }
            }

            // Befehl des Nutzers
            befehl = befehle.recv() => {
                match befehl {
                    Some(Befehl::Anrufen(ziel, antwort)) => {
                        let _ = antwort.send(machine.anrufen(ziel).await);
                    }
                    Some(Befehl::Annehmen(antwort)) => {
                        let _ = antwort.send(machine.annehmen().await);
                    }
                    Some(Befehl::Ablehnen(antwort)) => {
                        let _ = antwort.send(machine.ablehnen());
                    }
                    Some(Befehl::Auflegen(antwort)) => {
                        let _ = antwort.send(machine.auflegen());
                    }
                    Some(Befehl::Audio(aktiv, antwort)) => {
                        let _ = antwort.send(machine.audio_umschalten(aktiv));
                    }
                    Some(Befehl::Video(aktiv, antwort)) => {
                        let _ = antwort.send(machine.video_umschalten(aktiv));
                    }
                    Some(Befehl::Trennen) | None => break,
                }
            }

            // Lokal gefundener ICE-Kandidat
            ereignis = machine.naechstes_peer_ereignis() => {
                machine.peer_ereignis_verarbeiten(ereignis);
            }

            // Ausgehende Signaling-Nachricht der State Machine
            Some(nachricht) = ausgang.recv() => {
                if let Err(e) = framed.send(nachricht).await {
                    tracing::warn!(fehler = %e, "Senden fehlgeschlagen");
                    break;
                }
            }
        }

        status_tx.send_replace(status_von(&machine, &online, true));
    }

    // Bereits erzeugte Nachrichten (z.B. hang-up) noch zustellen
    while let Ok(nachricht) = ausgang.try_recv() {
        if framed.send(nachricht).await.is_err() {
            break;
        }
    }

    let identitaet = machine.eigene_identitaet().clone();
    drop(machine);
    status_tx.send_replace(ClientStatus {
        online,
        verbunden: false,
        ..ClientStatus::default()
    });
    tracing::info!(identity = %identitaet, "Client-Task beendet");
}

fn status_von<C: MediaCapability>(
    machine: &CallStateMachine<C>,
    online: &[Identity],
    verbunden: bool,
) -> ClientStatus {
    ClientStatus {
        zustand: machine.zustand(),
        phase: machine.phase(),
        online: online.to_vec(),
        medien: machine.medien_status(),
        verbunden,
    }
}
