//! Signaling-Relay – zustandslose Weiterleitung zwischen Identitaeten
//!
//! Das Relay kennt keine Anrufe. Jede Nachricht wird zum Zeitpunkt ihres
//! Eintreffens ueber die Registry aufgeloest und an die dort eingetragene
//! Verbindung zugestellt. Ist das Ziel nicht registriert, wird die Nachricht
//! verworfen; der Absender erfaehrt davon nichts.
//!
//! ## Uebersetzung
//! ```text
//! call-user{to,from,offer}    -> incoming-call{from,offer}
//! answer-call{to,answer}      -> call-answered{answer}
//! ice-candidate{to,candidate} -> ice-candidate{candidate}
//! hang-up{to}                 -> hang-up
//! ```

use connectly_core::types::Identity;
use connectly_observability::SignalingMetrics;
use connectly_protocol::{ClientNachricht, ServerNachricht};

use crate::broadcast::EventBroadcaster;
use crate::registry::ConnectionRegistry;

/// Internes Ergebnis einer Weiterleitung (nur fuer Logs und Metriken)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zustellung {
    /// In die Send-Queue des Ziels eingereiht
    Zugestellt,
    /// Ziel-Identitaet ist nicht registriert
    NichtRegistriert,
    /// Ziel registriert, aber Queue voll oder Verbindung bereits getrennt
    NichtZugestellt,
}

/// Uebersetzt eine Client-Nachricht in Ziel + Server-Nachricht
///
/// Gibt `None` fuer Nachrichten zurueck, die nicht weitergeleitet werden
/// (`register`).
pub fn uebersetzen(nachricht: ClientNachricht) -> Option<(Identity, ServerNachricht)> {
    match nachricht {
        ClientNachricht::Register { .. } => None,
        ClientNachricht::CallUser { to, from, offer } => {
            Some((to, ServerNachricht::IncomingCall { from, offer }))
        }
        ClientNachricht::AnswerCall { to, answer } => {
            Some((to, ServerNachricht::CallAnswered { answer }))
        }
        ClientNachricht::IceCandidate { to, candidate } => {
            Some((to, ServerNachricht::IceCandidate { candidate }))
        }
        ClientNachricht::HangUp { to } => Some((to, ServerNachricht::HangUp)),
    }
}

/// Leitet Nachrichten an die aktuell registrierte Verbindung weiter
#[derive(Clone)]
pub struct SignalingRelay {
    registry: ConnectionRegistry,
    broadcaster: EventBroadcaster,
    metriken: SignalingMetrics,
}

impl SignalingRelay {
    pub fn neu(
        registry: ConnectionRegistry,
        broadcaster: EventBroadcaster,
        metriken: SignalingMetrics,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            metriken,
        }
    }

    /// Stellt `nachricht` an die unter `ziel` registrierte Verbindung zu
    ///
    /// Schlaegt nie fehl: ein unbekanntes Ziel ist ein stiller No-op.
    pub fn route(&self, ziel: &Identity, nachricht: ServerNachricht) -> Zustellung {
        let event = nachricht.ereignis();

        let Some(session) = self.registry.nachschlagen(ziel) else {
            self.metriken.routing_fehlgriffe_total.inc();
            tracing::debug!(ziel = %ziel, event, "Ziel nicht registriert – Nachricht verworfen");
            return Zustellung::NichtRegistriert;
        };

        if self.broadcaster.an_verbindung_senden(&session, nachricht) {
            self.metriken.weitergeleitet(event);
            tracing::trace!(ziel = %ziel, session = %session, event, "Nachricht weitergeleitet");
            Zustellung::Zugestellt
        } else {
            Zustellung::NichtZugestellt
        }
    }

    /// Uebersetzt und leitet eine Client-Nachricht weiter
    ///
    /// Gibt `None` zurueck wenn die Nachricht kein Relay-Ereignis ist.
    pub fn weiterleiten(&self, nachricht: ClientNachricht) -> Option<Zustellung> {
        let (ziel, ausgehend) = uebersetzen(nachricht)?;
        Some(self.route(&ziel, ausgehend))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
