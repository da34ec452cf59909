//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` akzeptiert native Clients, die das Signaling-
//! Protokoll mit u32-Laengenpraefix sprechen, und startet fuer jede
//! Verbindung einen eigenen tokio-Task mit einer `ClientConnection`.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;
use crate::transport::TcpTransport;

/// TCP-Signaling-Server
pub struct SignalingServer {
    state: Arc<SignalingState>,
    listener: TcpListener,
}

impl SignalingServer {
    /// Bindet den TCP-Socket
    ///
    /// Port 0 waehlt einen freien Port; die tatsaechliche Adresse liefert
    /// `lokale_adresse`.
    pub async fn binden(state: Arc<SignalingState>, bind_addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self { state, listener })
    }

    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` ein `true`-Signal empfaengt
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        tracing::info!(adresse = %self.lokale_adresse()?, "TCP Signaling-Server gestartet");

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            if !self.state.hat_kapazitaet() {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.state.config.max_verbindungen,
                                    "Server voll – Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }

                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let transport = TcpTransport::neu(stream, self.state.config.max_frame_groesse);
                            let verbindung = ClientConnection::neu(Arc::clone(&self.state), peer_addr.to_string());
                            let shutdown_rx_clone = shutdown_rx.clone();

                            tokio::spawn(async move {
                                verbindung.verarbeiten(transport, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("TCP Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Signaling-Server gestoppt");
        Ok(())
    }
}
