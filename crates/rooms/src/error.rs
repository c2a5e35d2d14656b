//! Fehlertypen fuer die Raum-Registry

use thiserror::Error;
use visavis_core::types::RaumId;
use visavis_core::VisavisError;

/// Fehlertyp fuer Registry-Operationen
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Raum existiert nicht
    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(RaumId),

    /// Raum hat seine Kapazitaet erreicht
    #[error("Raum ist voll: {0}")]
    RaumVoll(RaumId),

    /// Raum ist gesperrt und nimmt keine neuen Teilnehmer an
    #[error("Raum ist gesperrt: {0}")]
    RaumGesperrt(RaumId),
}

impl From<RegistryError> for VisavisError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::RaumNichtGefunden(id) => Self::RaumNichtGefunden(id.to_string()),
            RegistryError::RaumVoll(_) => Self::RaumVoll,
            RegistryError::RaumGesperrt(_) => Self::RaumGesperrt,
        }
    }
}

/// Result-Typ fuer Registry-Operationen
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn konvertierung_in_zentralen_fehler() {
        let id = RaumId::neu();
        let e: VisavisError = RegistryError::RaumVoll(id).into();
        assert!(matches!(e, VisavisError::RaumVoll));

        let e: VisavisError = RegistryError::RaumNichtGefunden(id).into();
        assert!(e.to_string().contains(&id.to_string()));
    }
}
