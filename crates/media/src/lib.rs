//! visavis-media – Media-Session-Verwaltung
//!
//! Buchfuehrung darueber, welche Teilnehmer fuer die Session eines Raums
//! einen Media-Endpunkt registriert haben – unabhaengig davon, ob der
//! eigentliche Media-Relay laeuft. Die kryptografischen Schritte
//! (Handshake, Schluessel-Ableitung) sind explizite Erweiterungspunkte:
//! ein austauschbares [`KeyExchange`]-Modul liefert die Inhalte, dieses
//! Crate routet nur Bytes und persistiert Schluesselmaterial am Endpunkt.

pub mod capture;
pub mod error;
pub mod key_exchange;
pub mod session;

// Bequeme Re-Exporte
pub use capture::{CaptureFrame, FrameFormat, FrameSenke, MediaTyp};
pub use error::{MediaError, MediaResult};
pub use key_exchange::{KeyExchange, SecretBytes, StubKeyExchange};
pub use session::{MediaEndpunkt, MediaSession, MediaSessionRegistry};
