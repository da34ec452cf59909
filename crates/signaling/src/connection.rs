//! Client-Connection – Verarbeitet eine einzelne Signaling-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Die Schleife wartet gleichzeitig auf:
//! - eingehende Frames vom Transport -> `MessageDispatcher`
//! - ausgehende Nachrichten aus der Send-Queue -> Transport
//! - das Shutdown-Signal
//!
//! Es gibt keinen Heartbeat: ein Verbindungsverlust wird nur ueber das
//! Disconnect-Signal des Transports erkannt.

use connectly_core::types::SessionId;
use std::sync::Arc;
use tokio::sync::watch;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::SignalingState;
use crate::transport::{Eingang, SignalTransport};

/// Verarbeitet eine einzelne Verbindung ueber einen beliebigen Transport
pub struct ClientConnection {
    state: Arc<SignalingState>,
    session: SessionId,
    peer: String,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection mit frischer SessionId
    pub fn neu(state: Arc<SignalingState>, peer: impl Into<String>) -> Self {
        Self {
            state,
            session: SessionId::new(),
            peer: peer.into(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht. Der Cleanup laeuft auf jedem Ausgangspfad.
    pub async fn verarbeiten<T: SignalTransport>(
        self,
        mut transport: T,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let ctx = DispatcherContext {
            session: self.session,
            peer: self.peer,
        };
        let art = transport.art();
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        let mut ausgang = self.state.broadcaster.verbindung_registrieren(ctx.session);
        self.state.metriken.offene_verbindungen.inc();

        tracing::info!(session = %ctx.session, peer = %ctx.peer, transport = art, "Neue Verbindung");

        loop {
            tokio::select! {
                // Eingehende Nachricht vom Client
                eingang = transport.empfangen() => {
                    match eingang {
                        Some(Ok(Eingang::Nachricht(nachricht))) => {
                            dispatcher.dispatch(nachricht, &ctx);
                        }
                        Some(Ok(Eingang::Ungueltig(grund))) => {
                            tracing::warn!(session = %ctx.session, grund = %grund, "Ungueltiger Frame uebersprungen");
                        }
                        Some(Err(e)) => {
                            tracing::warn!(session = %ctx.session, fehler = %e, "Transportfehler");
                            break;
                        }
                        None => {
                            tracing::info!(session = %ctx.session, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus dem Broadcaster
                Some(ausgehend) = ausgang.recv() => {
                    if let Err(e) = transport.senden(ausgehend).await {
                        tracing::warn!(session = %ctx.session, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(session = %ctx.session, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        dispatcher.verbindung_cleanup(&ctx);
        self.state.metriken.offene_verbindungen.dec();

        tracing::debug!(session = %ctx.session, "Verbindungs-Task beendet");
    }
}
