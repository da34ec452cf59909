//! Transport-Abstraktion fuer Signaling-Verbindungen
//!
//! Ein `SignalTransport` liefert dekodierte Client-Nachrichten und schreibt
//! Server-Nachrichten. Die Verbindungsschleife ist damit unabhaengig davon,
//! ob der Client per WebSocket oder per TCP mit Laengenpraefix spricht.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use connectly_protocol::{ClientNachricht, ServerCodec, ServerNachricht};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::error::SignalingResult;

/// Ein gelesener Frame
#[derive(Debug)]
pub enum Eingang {
    /// Gueltige Nachricht
    Nachricht(ClientNachricht),
    /// Frame war kein gueltiges Signaling-JSON (wird geloggt und uebersprungen)
    Ungueltig(String),
}

/// Bidirektionaler Transport einer einzelnen Verbindung
#[async_trait]
pub trait SignalTransport: Send {
    /// Liest den naechsten Frame
    ///
    /// `None` = Gegenstelle hat sauber geschlossen, `Some(Err)` = Transportfehler.
    async fn empfangen(&mut self) -> Option<SignalingResult<Eingang>>;

    /// Schreibt eine Nachricht
    async fn senden(&mut self, nachricht: ServerNachricht) -> SignalingResult<()>;

    /// Kurzbezeichnung fuer Logs
    fn art(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// TCP (u32-Laengenpraefix + JSON)
// ---------------------------------------------------------------------------

/// TCP-Transport mit `ServerCodec`
pub struct TcpTransport {
    framed: Framed<TcpStream, ServerCodec>,
}

impl TcpTransport {
    pub fn neu(stream: TcpStream, max_frame_groesse: usize) -> Self {
        Self {
            framed: Framed::new(stream, ServerCodec::with_max_size(max_frame_groesse)),
        }
    }
}

#[async_trait]
impl SignalTransport for TcpTransport {
    async fn empfangen(&mut self) -> Option<SignalingResult<Eingang>> {
        match self.framed.next().await? {
            Ok(Ok(nachricht)) => Some(Ok(Eingang::Nachricht(nachricht))),
            Ok(Err(e)) => Some(Ok(Eingang::Ungueltig(e.to_string()))),
            Err(e) => Some(Err(e.into())),
        }
    }

    async fn senden(&mut self, nachricht: ServerNachricht) -> SignalingResult<()> {
        self.framed.send(nachricht).await?;
        Ok(())
    }

    fn art(&self) -> &'static str {
        "tcp"
    }
}

// ---------------------------------------------------------------------------
// WebSocket (ein JSON-Text-Frame pro Nachricht)
// ---------------------------------------------------------------------------

/// WebSocket-Transport fuer Browser-Clients
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn neu(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl SignalTransport for WsTransport {
    async fn empfangen(&mut self) -> Option<SignalingResult<Eingang>> {
        loop {
            let frame = match self.socket.recv().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };

            let eingang = match frame {
                Message::Text(text) => match ClientNachricht::from_json(&text) {
                    Ok(nachricht) => Eingang::Nachricht(nachricht),
                    Err(e) => Eingang::Ungueltig(e.to_string()),
                },
                Message::Binary(_) => Eingang::Ungueltig("Binaer-Frame nicht unterstuetzt".into()),
                Message::Close(_) => return None,
                // Ping/Pong beantwortet axum selbst
                Message::Ping(_) | Message::Pong(_) => continue,
            };
            return Some(Ok(eingang));
        }
    }

    async fn senden(&mut self, nachricht: ServerNachricht) -> SignalingResult<()> {
        let json = nachricht.to_json()?;
        self.socket.send(Message::Text(json)).await?;
        Ok(())
    }

    fn art(&self) -> &'static str {
        "ws"
    }
}
