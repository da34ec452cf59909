//! Connection-Registry – Identitaet <-> Verbindung
//!
//! Bidirektionale Zuordnung zwischen `Identity` und `SessionId`.
//!
//! ## Invarianten
//! - Pro Identitaet hoechstens eine Verbindung (Last-Write-Wins)
//! - Pro Verbindung hoechstens eine Identitaet
//! - Vorwaerts- und Rueckwaerts-Map sind stets spiegelgleich
//!
//! Alle Operationen laufen unter einem einzigen Mutex, damit beide Maps
//! atomar veraendert werden. Die Aenderungs-Callbacks laufen noch unter dem
//! Lock: Presence-Snapshots werden so in derselben Reihenfolge verschickt,
//! in der die Registry mutiert wurde. Callbacks duerfen deshalb nicht
//! blockieren und die Registry nicht erneut aufrufen.

use connectly_core::types::{Identity, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Registrierungs-Ergebnis
// ---------------------------------------------------------------------------

/// Ergebnis einer Registrierung
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registrierung {
    /// Verbindung, die bisher unter dieser Identitaet registriert war.
    /// Sie bleibt offen, ist aber nicht mehr erreichbar.
    pub verdraengt: Option<SessionId>,
    /// Identitaet, die diese Verbindung vorher hatte und nun aufgibt
    pub aufgegeben: Option<Identity>,
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RegistryMaps {
    /// Identitaet -> Verbindung
    identitaeten: HashMap<Identity, SessionId>,
    /// Verbindung -> Identitaet
    verbindungen: HashMap<SessionId, Identity>,
}

impl RegistryMaps {
    fn snapshot(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self.identitaeten.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// In-Memory Registry aller registrierten Identitaeten
///
/// Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<RegistryMaps>>,
}

impl ConnectionRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert `identity` fuer `session` (ueberschreibt bestehende Bindung)
    ///
    /// Gelingt immer. `bei_aenderung` erhaelt den sortierten Snapshot aller
    /// Identitaeten nach der Aenderung.
    pub fn registrieren<F>(
        &self,
        identity: Identity,
        session: SessionId,
        bei_aenderung: F,
    ) -> Registrierung
    where
        F: FnOnce(&[Identity]),
    {
        let mut maps = self.inner.lock();
        let mut ergebnis = Registrierung::default();

        // Alte Identitaet dieser Verbindung freigeben
        if let Some(alt) = maps.verbindungen.remove(&session) {
            if alt != identity {
                maps.identitaeten.remove(&alt);
                ergebnis.aufgegeben = Some(alt);
            }
        }

        // Bisherigen Besitzer der Identitaet verdraengen
        if let Some(vorher) = maps.identitaeten.insert(identity.clone(), session) {
            if vorher != session {
                maps.verbindungen.remove(&vorher);
                ergebnis.verdraengt = Some(vorher);
            }
        }
        maps.verbindungen.insert(session, identity);

        bei_aenderung(&maps.snapshot());
        ergebnis
    }

    /// Entfernt die Registrierung von `session`
    ///
    /// Gibt die freigewordene Identitaet zurueck. War die Verbindung nie
    /// (oder nicht mehr) registriert, passiert nichts und `bei_aenderung`
    /// wird nicht aufgerufen.
    pub fn abmelden<F>(&self, session: SessionId, bei_aenderung: F) -> Option<Identity>
    where
        F: FnOnce(&[Identity]),
    {
        let mut maps = self.inner.lock();
        let identity = maps.verbindungen.remove(&session)?;
        maps.identitaeten.remove(&identity);

        bei_aenderung(&maps.snapshot());
        Some(identity)
    }

    /// Schlaegt die aktuell unter `identity` registrierte Verbindung nach
    pub fn nachschlagen(&self, identity: &Identity) -> Option<SessionId> {
        self.inner.lock().identitaeten.get(identity).copied()
    }

    /// Gibt die Identitaet einer Verbindung zurueck
    pub fn identitaet_von(&self, session: &SessionId) -> Option<Identity> {
        self.inner.lock().verbindungen.get(session).cloned()
    }

    /// Sortierte Liste aller registrierten Identitaeten
    pub fn snapshot(&self) -> Vec<Identity> {
        self.inner.lock().snapshot()
    }

    /// Anzahl registrierter Identitaeten
    pub fn anzahl(&self) -> usize {
        self.inner.lock().identitaeten.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
