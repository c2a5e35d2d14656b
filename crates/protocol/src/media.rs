//! Media-Protokoll (UDP-Grenze)
//!
//! Definiert den binaeren 12-Byte-Header der Media-Pakete. Der Signaling-
//! Kern verwaltet nur Endpunkt-Metadaten – Paketinhalte verarbeitet der
//! (separat implementierte) Media-Relay. Der Header ist hier als
//! Grenzvertrag kodiert, damit beide Seiten dieselben Bytes sprechen.
//!
//! ## Paketformat (Header = 12 Bytes, kein serde)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       1   Version/Flags (0x80 = Version 2, keine Extensions)
//!  1       1   PayloadTyp (111 = Opus-Audio, 96 = VP8-Video)
//!  2       2   SequenzNummer (big-endian)
//!  4       4   Zeitstempel (big-endian, Millisekunden)
//!  8       4   SSRC – Synchronisation Source (big-endian)
//! 12+      N   Nutzdaten
//! ```

use std::io;

/// Versions-/Flags-Byte (Version 2, keine Extensions/Padding)
pub const VERSION_FLAGS: u8 = 0x80;

/// PayloadTyp fuer Opus-Audio
pub const PAYLOAD_TYP_AUDIO: u8 = 111;

/// PayloadTyp fuer VP8-Video
pub const PAYLOAD_TYP_VIDEO: u8 = 96;

// ---------------------------------------------------------------------------
// MediaPaketHeader
// ---------------------------------------------------------------------------

/// 12-Byte Header eines Media-UDP-Pakets
///
/// Direkte Byte-Serialisierung, kein serde (Hot Path des Relays).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPaketHeader {
    /// Versions-/Flags-Byte (muss == `VERSION_FLAGS` sein)
    pub version_flags: u8,
    /// PayloadTyp (untere 7 Bit; das Marker-Bit wird beim Decode maskiert)
    pub payload_typ: u8,
    /// Monoton steigende Sequenznummer
    pub sequence: u16,
    /// Zeitstempel in Millisekunden
    pub timestamp: u32,
    /// Synchronisation Source – eindeutige Senderkennung
    pub ssrc: u32,
}

impl MediaPaketHeader {
    /// Header-Groesse in Bytes
    pub const SIZE: usize = 12;

    /// Erstellt einen neuen Header
    pub fn new(payload_typ: u8, sequence: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            version_flags: VERSION_FLAGS,
            payload_typ,
            sequence,
            timestamp,
            ssrc,
        }
    }

    /// Serialisiert den Header in ein 12-Byte-Array (big-endian)
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.version_flags;
        buf[1] = self.payload_typ;
        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        buf
    }

    /// Deserialisiert einen Header aus einem Byte-Slice
    ///
    /// # Fehler
    /// - `InvalidData` wenn das Slice kuerzer als 12 Bytes ist
    /// - `InvalidData` bei ungueltigem Versions-Byte
    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Header zu kurz: {} Bytes (erwartet {})",
                    buf.len(),
                    Self::SIZE
                ),
            ));
        }

        let version_flags = buf[0];
        if version_flags & 0xC0 != VERSION_FLAGS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Ungueltiges Versions-Byte: {:#04x}", version_flags),
            ));
        }

        let payload_typ = buf[1] & 0x7F;
        let sequence = u16::from_be_bytes([buf[2], buf[3]]);
        let timestamp = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);

        Ok(Self {
            version_flags,
            payload_typ,
            sequence,
            timestamp,
            ssrc,
        })
    }

    /// Prueft ob der Header ein Audio-Paket beschreibt
    pub fn ist_audio(&self) -> bool {
        self.payload_typ == PAYLOAD_TYP_AUDIO
    }

    /// Prueft ob der Header ein Video-Paket beschreibt
    pub fn ist_video(&self) -> bool {
        self.payload_typ == PAYLOAD_TYP_VIDEO
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
