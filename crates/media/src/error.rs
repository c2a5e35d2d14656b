//! Fehlertypen fuer das Media-Subsystem

use thiserror::Error;
use visavis_core::types::{SessionId, TeilnehmerId};

/// Fehlertyp fuer Media-Operationen
#[derive(Debug, Error)]
pub enum MediaError {
    /// Session existiert nicht
    #[error("Media-Session nicht gefunden: {0}")]
    SessionNichtGefunden(SessionId),

    /// Endpunkt existiert nicht
    #[error("Media-Endpunkt nicht gefunden: {0}")]
    EndpunktNichtGefunden(TeilnehmerId),

    /// Key-Exchange-Modul hat den Handshake abgelehnt
    #[error("Key-Exchange fehlgeschlagen: {0}")]
    KeyExchange(String),

    /// Schluessel-Ableitung fehlgeschlagen
    #[error("Schluessel-Ableitung fehlgeschlagen: {0}")]
    SchluesselAbleitung(String),
}

/// Result-Typ fuer Media-Operationen
pub type MediaResult<T> = Result<T, MediaError>;
