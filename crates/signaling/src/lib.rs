//! visavis-signaling – TLS Control Layer
//!
//! Dieser Crate implementiert den Signaling-Service fuer Visavis. Er
//! verwaltet TLS-Verbindungen, die Verbindungs-State-Machine und routet
//! Session-Verhandlungsnachrichten zwischen Teilnehmern.
//!
//! ## Architektur
//!
//! ```text
//! TLS Listener (TlsListener)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  State Machine: Verbunden -> Angemeldet -> ImRaum
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- AuthHandler   (Login)
//!     +-- RoomHandler   (List, Create, Join, Leave)
//!     +-- MediaHandler  (Offer, Answer, ICE, Toggles, Key-Exchange)
//!     +-- ChatHandler   (Raum-Chat)
//!
//! RaumRegistry          – Raeume, Mitgliedschaften, Broadcasts
//! MediaSessionRegistry  – Endpunkte und Krypto-Erweiterungspunkte
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server_state;
pub mod tls;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::{MessageDispatcher, VerbindungsKontext, VerbindungsZustand};
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingKonfig, SignalingState};
pub use tls::{TlsKonfig, TlsListener};
