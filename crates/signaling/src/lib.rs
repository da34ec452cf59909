//! connectly-signaling – Signaling-Server fuer WebRTC-Anrufe
//!
//! Verwaltet die Zuordnung 4-stelliger Identitaeten zu offenen Verbindungen,
//! leitet Offer/Answer/ICE/Hang-up zwischen Identitaeten weiter und verteilt
//! die Liste aller registrierten Identitaeten an alle Verbindungen.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)     WebSocket /ws (ws_router)
//!     |                                  |
//!     +---------------+------------------+
//!                     v
//! ClientConnection (pro Verbindung ein Task, SignalTransport)
//!                     |
//!                     v
//! MessageDispatcher
//!     |
//!     +-- register      -> ConnectionRegistry -> PresenceBroadcaster
//!     +-- call-user     \
//!     +-- answer-call    > SignalingRelay -> EventBroadcaster (Send-Queue des Ziels)
//!     +-- ice-candidate |
//!     +-- hang-up       /
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod presence;
pub mod registry;
pub mod relay;
pub mod server_state;
pub mod tcp;
pub mod transport;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use presence::PresenceBroadcaster;
pub use registry::{ConnectionRegistry, Registrierung};
pub use relay::{SignalingRelay, Zustellung};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
pub use transport::{Eingang, SignalTransport, TcpTransport, WsTransport};
pub use ws::ws_router;
