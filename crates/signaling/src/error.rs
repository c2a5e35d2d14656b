//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket) – Bind-Fehler beim Start sind fatal
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// TLS-Konfigurationsfehler (Zertifikat, Schluessel, CA)
    #[error("TLS-Fehler: {0}")]
    Tls(String),

    /// Verbindung wurde getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Protokollfehler (ungueltiges Frame, falscher Zustand)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen TLS-Fehler
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
