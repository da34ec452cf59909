//! Event-Broadcaster – Send-Queues aller offenen Verbindungen
//!
//! Der EventBroadcaster verwaltet die ausgehende Queue jeder offenen
//! Transport-Verbindung, unabhaengig davon ob sie eine Identitaet
//! registriert hat.
//!
//! - An eine Verbindung: `an_verbindung_senden`
//! - An alle Verbindungen: `an_alle_senden`

use connectly_core::types::SessionId;
use connectly_protocol::ServerNachricht;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub session: SessionId,
    pub tx: mpsc::Sender<ServerNachricht>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerNachricht) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    session = %self.session,
                    event = msg.ereignis(),
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(session = %self.session, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle offenen Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    clients: DashMap<SessionId, ClientSender>,
    queue_groesse: usize,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster mit Standard-Queue-Groesse
    pub fn neu() -> Self {
        Self::mit_queue_groesse(SEND_QUEUE_GROESSE)
    }

    /// Erstellt einen EventBroadcaster mit eigener Queue-Groesse
    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert eine neue Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und schreibt in den Transport.
    pub fn verbindung_registrieren(&self, session: SessionId) -> mpsc::Receiver<ServerNachricht> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner
            .clients
            .insert(session, ClientSender { session, tx });
        tracing::debug!(session = %session, "Verbindung im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Verbindung aus dem Broadcaster
    pub fn verbindung_entfernen(&self, session: &SessionId) {
        if self.inner.clients.remove(session).is_some() {
            tracing::debug!(session = %session, "Verbindung aus Broadcaster entfernt");
        }
    }

    /// Sendet eine Nachricht an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Verbindung gefunden und die Nachricht eingereiht wurde.
    pub fn an_verbindung_senden(&self, session: &SessionId, nachricht: ServerNachricht) -> bool {
        // Sender klonen, damit kein DashMap-Guard ueber try_send gehalten wird
        let sender = self.inner.clients.get(session).map(|e| e.value().clone());
        match sender {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(session = %session, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Sendet eine Nachricht an alle offenen Verbindungen
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, nachricht: ServerNachricht) -> usize {
        let sender: Vec<ClientSender> = self
            .inner
            .clients
            .iter()
            .map(|e| e.value().clone())
            .collect();

        sender
            .iter()
            .filter(|s| s.senden(nachricht.clone()))
            .count()
    }

    /// Anzahl offener Verbindungen
    pub fn verbindung_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, session: &SessionId) -> bool {
        self.inner.clients.contains_key(session)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
