//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + JSON-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Maximale Frame-Groesse ist konfigurierbar (Standard: 1 MB).
//!
//! Ein Frame mit ungueltigem JSON beendet die Verbindung nicht: der Decoder
//! liefert dann `Ok(Some(Err(..)))` und der Aufrufer entscheidet.

use bytes::{Buf, BufMut, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

use crate::signal::{ClientNachricht, ServerNachricht};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// `E` ist der ausgehende, `D` der eingehende Nachrichtentyp. Server und
/// Client verwenden jeweils den gespiegelten Alias ([`ServerCodec`],
/// [`ClientCodec`]).
pub struct FrameCodec<E, D> {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
    _typen: PhantomData<fn(E) -> D>,
}

/// Server-Seite: sendet `ServerNachricht`, empfaengt `ClientNachricht`
pub type ServerCodec = FrameCodec<ServerNachricht, ClientNachricht>;

/// Client-Seite: sendet `ClientNachricht`, empfaengt `ServerNachricht`
pub type ClientCodec = FrameCodec<ClientNachricht, ServerNachricht>;

impl<E, D> FrameCodec<E, D> {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _typen: PhantomData,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl<E, D> Default for FrameCodec<E, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, D> Clone for FrameCodec<E, D> {
    fn clone(&self) -> Self {
        Self::with_max_size(self.max_frame_size)
    }
}

impl<E, D> std::fmt::Debug for FrameCodec<E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl<E, D> Decoder for FrameCodec<E, D>
where
    D: DeserializeOwned,
{
    /// Aeusseres `io::Result` (ueber `decode`) = Framing, inneres = JSON
    type Item = Result<D, serde_json::Error>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        let mut laenge_bytes = [0u8; LENGTH_FIELD_SIZE];
        laenge_bytes.copy_from_slice(&src[..LENGTH_FIELD_SIZE]);
        let length = u32::from_be_bytes(laenge_bytes) as usize;

        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        Ok(Some(serde_json::from_slice(&payload)))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl<E, D> Encoder<E> for FrameCodec<E, D>
where
    E: Serialize,
{
    type Error = io::Error;

    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use connectly_core::Identity;

    fn hang_up(ziel: &str) -> ClientNachricht {
        ClientNachricht::HangUp {
            to: Identity::parse(ziel).unwrap(),
        }
    }

    #[test]
    fn client_frame_kommt_beim_server_an() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();

        let mut buf = BytesMut::new();
        client.encode(hang_up("2222"), &mut buf).unwrap();

        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        let decoded = server
            .decode(&mut buf)
            .unwrap()
            .expect("Muss einen Frame enthalten")
            .expect("Muss gueltiges JSON sein");
        assert_eq!(decoded, hang_up("2222"));
        assert!(buf.is_empty());
    }

    #[test]
    fn unvollstaendiger_frame() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();

        let mut buf = BytesMut::new();
        client.encode(hang_up("1111"), &mut buf).unwrap();

        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);
        assert!(server.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn ablehnung_zu_grosser_frame() {
        let mut codec = ServerCodec::with_max_size(100);

        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn ablehnung_beim_encode_zu_grosse_nachricht() {
        let mut codec = ClientCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        assert!(codec.encode(hang_up("1111"), &mut buf).is_err());
    }

    #[test]
    fn ungueltiges_json_ist_kein_framing_fehler() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        let muell = b"{\"event\":\"nope\"}";
        buf.put_u32(muell.len() as u32);
        buf.put_slice(muell);
        // Danach ein gueltiger Frame
        ClientCodec::new().encode(hang_up("4444"), &mut buf).unwrap();

        let erster = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
        assert!(erster.is_err());

        let zweiter = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
        assert_eq!(zweiter.unwrap(), hang_up("4444"));
    }

    #[test]
    fn mehrere_nachrichten_im_buffer() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();
        let mut buf = BytesMut::new();

        let ziele = ["1000", "2000", "3000"];
        for ziel in ziele {
            client.encode(hang_up(ziel), &mut buf).unwrap();
        }

        for ziel in ziele {
            let msg = server.decode(&mut buf).unwrap().unwrap().unwrap();
            assert_eq!(msg, hang_up(ziel));
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn default_max_size() {
        assert_eq!(ServerCodec::new().max_frame_size(), DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(ClientCodec::default().max_frame_size(), DEFAULT_MAX_FRAME_SIZE);
    }
}
