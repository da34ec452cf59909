//! Gemeinsame Hilfen fuer die Signaling-Integrationstests

#![allow(dead_code)]

use connectly_core::Identity;
use connectly_observability::SignalingMetrics;
use connectly_protocol::{ClientCodec, ClientNachricht, ServerNachricht};
use connectly_signaling::{SignalingConfig, SignalingServer, SignalingState};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;

pub const WARTEZEIT: Duration = Duration::from_secs(2);

pub fn id(s: &str) -> Identity {
    Identity::parse(s).expect("gueltige Test-Identitaet")
}

pub fn logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("connectly_signaling=debug")
        .try_init();
}

/// Laufender TCP-Signaling-Server auf 127.0.0.1:0
pub struct TestServer {
    pub adresse: SocketAddr,
    pub state: Arc<SignalingState>,
    pub shutdown_tx: watch::Sender<bool>,
}

impl TestServer {
    pub async fn starten() -> Self {
        logging();
        let state = SignalingState::neu(
            SignalingConfig::default(),
            SignalingMetrics::neu().expect("Metriken"),
        );
        let server = SignalingServer::binden(Arc::clone(&state), "127.0.0.1:0".parse().unwrap())
            .await
            .expect("TCP-Listener binden");
        let adresse = server.lokale_adresse().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(server.starten(shutdown_rx));

        Self {
            adresse,
            state,
            shutdown_tx,
        }
    }

    /// Wartet bis `bedingung` auf dem Server-State erfuellt ist
    pub async fn warten_bis(&self, bedingung: impl Fn(&SignalingState) -> bool) {
        tokio::time::timeout(WARTEZEIT, async {
            while !bedingung(&self.state) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Bedingung nicht rechtzeitig erfuellt");
    }
}

/// Nativer Test-Client mit Laengenpraefix-Codec
pub struct TestClient {
    framed: Framed<TcpStream, ClientCodec>,
}

impl TestClient {
    pub async fn verbinden(adresse: SocketAddr) -> Self {
        let stream = TcpStream::connect(adresse).await.expect("TCP-Verbindung");
        Self {
            framed: Framed::new(stream, ClientCodec::new()),
        }
    }

    pub async fn senden(&mut self, nachricht: ClientNachricht) {
        self.framed.send(nachricht).await.expect("Senden");
    }

    pub async fn registrieren(&mut self, identity: &str) {
        self.senden(ClientNachricht::Register {
            identity: id(identity),
        })
        .await;
    }

    pub async fn empfangen(&mut self) -> ServerNachricht {
        tokio::time::timeout(WARTEZEIT, self.framed.next())
            .await
            .expect("Timeout beim Empfangen")
            .expect("Verbindung geschlossen")
            .expect("Frame-Fehler")
            .expect("Ungueltiges JSON")
    }

    /// Liest bis eine Nachricht ausser `user-list` eintrifft
    pub async fn naechste_ohne_user_list(&mut self) -> ServerNachricht {
        loop {
            match self.empfangen().await {
                ServerNachricht::UserList { .. } => continue,
                andere => return andere,
            }
        }
    }

    /// Liest bis die erwartete `user-list` eintrifft
    pub async fn user_list_abwarten(&mut self, erwartet: &[&str]) {
        let erwartet: Vec<Identity> = erwartet.iter().map(|s| id(s)).collect();
        loop {
            if let ServerNachricht::UserList { identities } = self.empfangen().await {
                if identities == erwartet {
                    return;
                }
            }
        }
    }

    /// Prueft dass innerhalb kurzer Zeit nichts ausser `user-list` ankommt
    pub async fn nichts_weiter(&mut self) {
        let ergebnis = tokio::time::timeout(Duration::from_millis(200), async {
            loop {
                match self.framed.next().await {
                    Some(Ok(Ok(ServerNachricht::UserList { .. }))) => continue,
                    andere => return andere,
                }
            }
        })
        .await;
        assert!(ergebnis.is_err(), "Unerwartete Nachricht: {ergebnis:?}");
    }
}
