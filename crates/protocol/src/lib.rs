//! connectly-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Signaling-Nachrichten zwischen Client und
//! Server sowie das Frame-Format fuer TCP-Verbindungen.

pub mod signal;
pub mod wire;

pub use signal::{ClientNachricht, Deskriptor, ServerNachricht};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
