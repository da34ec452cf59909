//! connectly-call – Anruf-Steuerung auf Client-Seite
//!
//! Dieser Crate enthaelt die Anruf-State-Machine (Idle/Dialing/Ringing/Active),
//! die Schnittstelle zu Plattform-Medien und Peer-Transporten sowie einen
//! TCP-Client fuer den Connectly Signaling-Server.
//!
//! ## Architektur
//!
//! ```text
//! CallClient (API, Befehle via mpsc)
//!     |
//!     v
//! client_schleife (ein Task, besitzt die Machine exklusiv)
//!     |  Server-Nachrichten, Befehle, Peer-Ereignisse
//!     v
//! CallStateMachine ---> MediaCapability (lokale Medien, Peer-Transport)
//!     |
//!     v
//! ClientNachricht (call-user, answer-call, ice-candidate, hang-up)
//! ```

pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod machine;

// Bequeme Re-Exporte
pub use capability::{
    MediaCapability, MediaHandle, MedienVorgaben, PeerConfig, PeerEreignis, PeerHandle,
    STANDARD_ICE_SERVER,
};
pub use client::{CallClient, ClientStatus};
pub use config::CallConfig;
pub use error::{CallError, CallResult};
pub use machine::{Anrufphase, CallStateMachine, Zustand};
