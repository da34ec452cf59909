//! Presence-Broadcaster – verteilt die Liste aller registrierten Identitaeten
//!
//! Nach jeder erfolgreichen Registrierung oder Abmeldung erhalten **alle**
//! offenen Verbindungen den vollstaendigen Snapshot als `user-list`, auch
//! Verbindungen die selbst nie registriert wurden.

use connectly_core::types::Identity;
use connectly_observability::SignalingMetrics;
use connectly_protocol::ServerNachricht;

use crate::broadcast::EventBroadcaster;

/// Verteilt Presence-Snapshots an alle Verbindungen
#[derive(Clone)]
pub struct PresenceBroadcaster {
    broadcaster: EventBroadcaster,
    metriken: SignalingMetrics,
}

impl PresenceBroadcaster {
    pub fn neu(broadcaster: EventBroadcaster, metriken: SignalingMetrics) -> Self {
        Self {
            broadcaster,
            metriken,
        }
    }

    /// Sendet den Snapshot an alle offenen Verbindungen
    ///
    /// Gibt die Anzahl erreichter Verbindungen zurueck.
    pub fn veroeffentlichen(&self, identitaeten: &[Identity]) -> usize {
        self.metriken
            .registrierte_identitaeten
            .set(identitaeten.len() as i64);
        self.metriken.presence_broadcasts_total.inc();

        let erreicht = self.broadcaster.an_alle_senden(ServerNachricht::UserList {
            identities: identitaeten.to_vec(),
        });

        tracing::debug!(
            identitaeten = identitaeten.len(),
            erreicht,
            "user-list veroeffentlicht"
        );
        erreicht
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
