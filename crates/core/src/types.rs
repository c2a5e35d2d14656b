//! Gemeinsame Identifikationstypen fuer Visavis
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Teilnehmer-ID
///
/// Wird beim Verbindungsaufbau vom Server vergeben (vor dem Login) und
/// bleibt fuer die Lebensdauer der Verbindung stabil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeilnehmerId(pub Uuid);

impl TeilnehmerId {
    /// Erstellt eine neue zufaellige TeilnehmerId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for TeilnehmerId {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Display for TeilnehmerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "teilnehmer:{}", self.0)
    }
}

/// Eindeutige Raum-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaumId(pub Uuid);

impl RaumId {
    /// Erstellt eine neue zufaellige RaumId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for RaumId {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Display for RaumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "raum:{}", self.0)
    }
}

/// Eindeutige Media-Session-ID
///
/// Im Normalbetrieb identisch zur ID des zugehoerigen Raums, aber als
/// eigener Typ gefuehrt: die Media-Session-Verwaltung ist ein logisch
/// getrennter Store und kann spaeter auf einen anderen Prozess wandern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::neu()
    }
}

impl From<RaumId> for SessionId {
    fn from(raum_id: RaumId) -> Self {
        Self(raum_id.0)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}
