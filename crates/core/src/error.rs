//! Fehlertypen fuer Visavis
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Visavis
pub type Result<T> = std::result::Result<T, VisavisError>;

/// Alle moeglichen Fehler im Visavis-System
#[derive(Debug, Error)]
pub enum VisavisError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Ressourcen ---
    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(String),

    #[error("Teilnehmer nicht gefunden: {0}")]
    TeilnehmerNichtGefunden(String),

    #[error("Raum ist voll")]
    RaumVoll,

    #[error("Raum ist gesperrt")]
    RaumGesperrt,

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl VisavisError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Getrennt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = VisavisError::RaumNichtGefunden("lobby".into());
        assert_eq!(e.to_string(), "Raum nicht gefunden: lobby");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(VisavisError::Zeitlimit("test".into()).ist_wiederholbar());
        assert!(!VisavisError::RaumVoll.ist_wiederholbar());
    }
}
