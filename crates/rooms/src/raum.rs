//! Raum- und Teilnehmer-Datentypen
//!
//! `Teilnehmer` haelt die Sende-Queue seiner Verbindung – Broadcasts laufen
//! nicht-blockierend ueber `try_send`, damit ein haengender Client niemals
//! die Registry blockiert.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use visavis_core::types::{RaumId, TeilnehmerId};
use visavis_protocol::signal::{RaumInfo, SignalMessage, TeilnehmerInfo};

use crate::error::{RegistryError, RegistryResult};

/// Standard-Kapazitaet eines Raums wenn keine angegeben ist
pub const STANDARD_MAX_TEILNEHMER: u32 = 10;

// ---------------------------------------------------------------------------
// Teilnehmer
// ---------------------------------------------------------------------------

/// Ein Teilnehmer in einem Raum
///
/// Die Identitaet entsteht beim Verbindungsaufbau (vor dem Login) und
/// verschwindet mit der Verbindung. Ein Teilnehmer ist zu jedem Zeitpunkt
/// Mitglied hoechstens eines Raums.
#[derive(Debug, Clone)]
pub struct Teilnehmer {
    pub id: TeilnehmerId,
    pub username: String,
    /// Sende-Queue der zugehoerigen Verbindung
    pub sender: mpsc::Sender<SignalMessage>,
    /// Netzwerk-Adresse des Clients
    pub adresse: SocketAddr,
    pub beigetreten_am: DateTime<Utc>,
    pub audio_aktiv: bool,
    pub video_aktiv: bool,
}

impl Teilnehmer {
    /// Erstellt einen neuen Teilnehmer (Audio und Video initial aktiv)
    pub fn neu(
        id: TeilnehmerId,
        username: impl Into<String>,
        sender: mpsc::Sender<SignalMessage>,
        adresse: SocketAddr,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            sender,
            adresse,
            beigetreten_am: Utc::now(),
            audio_aktiv: true,
            video_aktiv: true,
        }
    }

    /// Sendet eine Nachricht nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: SignalMessage) -> bool {
        match self.sender.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    teilnehmer_id = %self.id,
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    teilnehmer_id = %self.id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }

    /// Konvertiert in die Protokoll-Darstellung
    pub fn als_info(&self) -> TeilnehmerInfo {
        TeilnehmerInfo {
            id: self.id,
            username: self.username.clone(),
            audio_enabled: self.audio_aktiv,
            video_enabled: self.video_aktiv,
        }
    }
}

// ---------------------------------------------------------------------------
// Raum
// ---------------------------------------------------------------------------

/// Ein benannter, kapazitaetsbegrenzter Raum
#[derive(Debug)]
pub struct Raum {
    pub id: RaumId,
    pub name: String,
    pub erstellt_am: DateTime<Utc>,
    pub max_teilnehmer: u32,
    pub gesperrt: bool,
    pub teilnehmer: HashMap<TeilnehmerId, Teilnehmer>,
}

impl Raum {
    /// Erstellt einen neuen, offenen Raum mit frischer ID
    pub fn neu(name: impl Into<String>, max_teilnehmer: u32) -> Self {
        Self {
            id: RaumId::neu(),
            name: name.into(),
            erstellt_am: Utc::now(),
            max_teilnehmer,
            gesperrt: false,
            teilnehmer: HashMap::new(),
        }
    }

    /// Gibt die aktuelle Teilnehmeranzahl zurueck
    pub fn teilnehmer_anzahl(&self) -> usize {
        self.teilnehmer.len()
    }

    /// Fuegt einen Teilnehmer hinzu
    ///
    /// Schlaegt fehl wenn der Raum gesperrt oder voll ist. Die Invariante
    /// `teilnehmer_anzahl <= max_teilnehmer` bleibt dadurch immer erhalten.
    pub(crate) fn teilnehmer_hinzufuegen(&mut self, teilnehmer: Teilnehmer) -> RegistryResult<()> {
        if self.gesperrt {
            return Err(RegistryError::RaumGesperrt(self.id));
        }
        if self.teilnehmer.len() >= self.max_teilnehmer as usize {
            return Err(RegistryError::RaumVoll(self.id));
        }
        self.teilnehmer.insert(teilnehmer.id, teilnehmer);
        Ok(())
    }

    /// Konvertiert in die Protokoll-Darstellung (Snapshot)
    pub fn als_info(&self) -> RaumInfo {
        RaumInfo {
            id: self.id,
            name: self.name.clone(),
            participants: self.teilnehmer.len() as u32,
            max_participants: self.max_teilnehmer,
            is_locked: self.gesperrt,
        }
    }
}
