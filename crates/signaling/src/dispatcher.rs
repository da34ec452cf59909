//! Message-Dispatcher – verarbeitet eingehende Client-Nachrichten
//!
//! - `register` -> Registry + Presence-Fan-out
//! - alle anderen Ereignisse -> Relay
//!
//! Der Dispatcher antwortet nie direkt; alle Ausgaben laufen ueber die
//! Send-Queues des Broadcasters.

use connectly_core::types::{Identity, SessionId};
use connectly_protocol::ClientNachricht;
use std::sync::Arc;

use crate::relay::Zustellung;
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    /// Eindeutige Kennung der Transport-Verbindung
    pub session: SessionId,
    /// Gegenstelle (fuer Logs)
    pub peer: String,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende Nachricht vollstaendig
    pub fn dispatch(&self, nachricht: ClientNachricht, ctx: &DispatcherContext) {
        tracing::trace!(session = %ctx.session, event = nachricht.ereignis(), "Nachricht empfangen");

        match nachricht {
            ClientNachricht::Register { identity } => self.registrieren(identity, ctx),
            andere => {
                let event = andere.ereignis();
                if let Some(Zustellung::NichtZugestellt) = self.state.relay.weiterleiten(andere) {
                    tracing::debug!(
                        session = %ctx.session,
                        event,
                        "Ziel registriert, aber nicht erreichbar"
                    );
                }
            }
        }
    }

    fn registrieren(&self, identity: Identity, ctx: &DispatcherContext) {
        let presence = &self.state.presence;
        let ergebnis = self
            .state
            .registry
            .registrieren(identity.clone(), ctx.session, |snapshot| {
                presence.veroeffentlichen(snapshot);
            });

        if let Some(verdraengt) = ergebnis.verdraengt {
            // Verdraengte Verbindung bleibt offen, ist aber nicht mehr adressierbar
            tracing::warn!(
                identity = %identity,
                neu = %ctx.session,
                verdraengt = %verdraengt,
                "Identitaet neu gebunden – alte Verbindung verwaist"
            );
        }
        if let Some(aufgegeben) = ergebnis.aufgegeben {
            tracing::debug!(session = %ctx.session, aufgegeben = %aufgegeben, "Vorherige Identitaet freigegeben");
        }

        tracing::info!(identity = %identity, session = %ctx.session, peer = %ctx.peer, "Identitaet registriert");
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Registry-Cleanup ist sofort und bedingungslos. Laufende Anrufe der
    /// Gegenseite werden dabei nicht benachrichtigt.
    pub fn verbindung_cleanup(&self, ctx: &DispatcherContext) {
        let presence = &self.state.presence;
        let frei = self.state.registry.abmelden(ctx.session, |snapshot| {
            presence.veroeffentlichen(snapshot);
        });
        self.state.broadcaster.verbindung_entfernen(&ctx.session);

        match frei {
            Some(identity) => {
                tracing::info!(identity = %identity, session = %ctx.session, "Identitaet abgemeldet")
            }
            None => tracing::debug!(session = %ctx.session, "Verbindung ohne Identitaet bereinigt"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
