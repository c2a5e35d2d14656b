//! Wire-Format fuer TCP/TLS-Verbindungen
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
//! Maximale Frame-Groesse ist konfigurierbar (Standard: 1 MiB). Ein Frame
//! mit groesserer deklarierter Laenge ist ein fataler Protokollfehler und
//! beendet die Verbindung.
//!
//! Der Decoder liefert die rohen Payload-Bytes: ungueltiges JSON ist ein
//! behebbarer Fehler (Fehler-Antwort, Verbindung bleibt offen) und wird
//! deshalb eine Ebene hoeher behandelt, nicht im Codec.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::signal::SignalMessage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP/TLS-Verbindungen
///
/// Implementiert `Encoder<SignalMessage>` und `Decoder` (rohe Payload-Bytes)
/// fuer nahtlose Integration mit `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen (big-endian u32) ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        // Maximale Frame-Groesse pruefen – Verstoss ist verbindungsfatal
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
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        // Laengen-Feld verbrauchen, Payload-Bytes extrahieren
        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        Ok(Some(payload))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<SignalMessage> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: SignalMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // JSON serialisieren
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        // Groesse pruefen
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

        // Laengen-Feld + Payload schreiben
        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `UnexpectedEof` wenn die Verbindung vor Abschluss des Frames getrennt wird
/// - `InvalidData` bei ungueltigem JSON oder zu grossem Frame
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> io::Result<SignalMessage>
where
    R: AsyncRead + Unpin,
{
    // Laengen-Feld lesen
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    reader.read_exact(&mut len_buf).await?;
    let length = u32::from_be_bytes(len_buf) as usize;

    // Groesse pruefen
    if length > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                length, max_frame_size
            ),
        ));
    }

    // Payload lesen
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    // JSON deserialisieren
    serde_json::from_slice(&payload).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
        )
    })
}

/// Schreibt einen einzelnen Frame in einen `AsyncWrite`
///
/// # Fehler
/// - `InvalidData` wenn die Nachricht nicht serialisiert werden kann oder zu gross ist
/// - IO-Fehler beim Schreiben
pub async fn write_frame<W>(
    writer: &mut W,
    message: &SignalMessage,
    max_frame_size: usize,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    // JSON serialisieren
    let json = serde_json::to_vec(message).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Serialisierung fehlgeschlagen: {}", e),
        )
    })?;

    // Groesse pruefen
    if json.len() > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                json.len(),
                max_frame_size
            ),
        ));
    }

    // Laengen-Feld + Payload schreiben
    let len_bytes = (json.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(&json).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
