//! Raum-Registry – der autoritative Store fuer Raeume und Mitgliedschaften
//!
//! ## Nebenlaeufigkeitsmodell
//! Raum-Map und Teilnehmer->Raum-Reverse-Index liegen unter EINEM Mutex.
//! Jede mutierende und jede zusammengesetzte Lese-Operation laeuft als ein
//! kritischer Abschnitt; Mitgliedschaft und Reverse-Index koennen deshalb
//! nie inkonsistent beobachtet werden.
//!
//! Broadcasts stellen Nachrichten nicht-blockierend in die Sende-Queues der
//! Verbindungen ein (`try_send`); ein langsamer Client kostet einen
//! Queue-Platz, nie eine blockierte Registry.

use parking_lot::Mutex;
use std::collections::HashMap;
use visavis_core::types::{RaumId, TeilnehmerId};
use visavis_protocol::signal::{RaumInfo, SignalMessage, TeilnehmerInfo};

use crate::error::{RegistryError, RegistryResult};
use crate::raum::{Raum, Teilnehmer, STANDARD_MAX_TEILNEHMER};

// ---------------------------------------------------------------------------
// BeitrittsInfo
// ---------------------------------------------------------------------------

/// Snapshot eines erfolgreichen Raum-Beitritts
///
/// Wird im selben kritischen Abschnitt erstellt wie der Beitritt selbst,
/// damit die Teilnehmerliste exakt den Moment des Beitritts abbildet.
#[derive(Debug, Clone)]
pub struct BeitrittsInfo {
    pub raum_id: RaumId,
    pub raum_name: String,
    /// Alle Mitglieder nach dem Beitritt (inklusive des Beitretenden)
    pub teilnehmer: Vec<TeilnehmerInfo>,
}

// ---------------------------------------------------------------------------
// RaumRegistry
// ---------------------------------------------------------------------------

/// Zentraler, thread-sicherer Store fuer Raeume und Mitgliedschaften
pub struct RaumRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    /// Alle Raeume, indiziert nach RaumId
    raeume: HashMap<RaumId, Raum>,
    /// Reverse-Index: welcher Teilnehmer ist in welchem Raum
    teilnehmer_raum: HashMap<TeilnehmerId, RaumId>,
}

impl RaumRegistry {
    /// Erstellt eine neue, leere Registry
    pub fn neu() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                raeume: HashMap::new(),
                teilnehmer_raum: HashMap::new(),
            }),
        }
    }

    /// Erstellt einen neuen Raum und gibt seinen Snapshot zurueck
    ///
    /// Schlaegt nie fehl; ohne Kapazitaetsangabe gilt `STANDARD_MAX_TEILNEHMER`.
    pub fn raum_erstellen(&self, name: &str, max_teilnehmer: Option<u32>) -> RaumInfo {
        let raum = Raum::neu(name, max_teilnehmer.unwrap_or(STANDARD_MAX_TEILNEHMER));
        let info = raum.als_info();

        let mut inner = self.inner.lock();
        inner.raeume.insert(raum.id, raum);

        tracing::info!(raum_id = %info.id, name = %info.name, "Raum erstellt");
        info
    }

    /// Gibt den Snapshot eines Raums zurueck
    pub fn raum_holen(&self, raum_id: &RaumId) -> Option<RaumInfo> {
        self.inner.lock().raeume.get(raum_id).map(Raum::als_info)
    }

    /// Sucht einen Raum nach Anzeigename (linearer Scan)
    pub fn raum_nach_name(&self, name: &str) -> Option<RaumInfo> {
        self.inner
            .lock()
            .raeume
            .values()
            .find(|raum| raum.name == name)
            .map(Raum::als_info)
    }

    /// Listet alle Raeume auf (Snapshot, keine Live-Sicht)
    pub fn raeume_auflisten(&self) -> Vec<RaumInfo> {
        self.inner.lock().raeume.values().map(Raum::als_info).collect()
    }

    /// Gibt die Anzahl der Raeume zurueck
    pub fn raum_anzahl(&self) -> usize {
        self.inner.lock().raeume.len()
    }

    /// Fuegt einen Teilnehmer einem Raum hinzu
    ///
    /// Ist der Teilnehmer bereits in einem anderen Raum registriert, wird er
    /// dort im selben kritischen Abschnitt entfernt – ein Teilnehmer ist nie
    /// Mitglied zweier Raeume gleichzeitig. Mitglieds-Map und Reverse-Index
    /// werden zusammen aktualisiert.
    pub fn raum_beitreten(
        &self,
        raum_id: &RaumId,
        teilnehmer: Teilnehmer,
    ) -> RegistryResult<BeitrittsInfo> {
        let teilnehmer_id = teilnehmer.id;
        let username = teilnehmer.username.clone();

        let mut inner = self.inner.lock();

        // Aus dem alten Raum austreten falls vorhanden
        if let Some(alter_raum_id) = inner.teilnehmer_raum.remove(&teilnehmer_id) {
            if let Some(alter_raum) = inner.raeume.get_mut(&alter_raum_id) {
                alter_raum.teilnehmer.remove(&teilnehmer_id);
            }
        }

        let raum = inner
            .raeume
            .get_mut(raum_id)
            .ok_or(RegistryError::RaumNichtGefunden(*raum_id))?;
        raum.teilnehmer_hinzufuegen(teilnehmer)?;

        let info = BeitrittsInfo {
            raum_id: raum.id,
            raum_name: raum.name.clone(),
            teilnehmer: raum.teilnehmer.values().map(Teilnehmer::als_info).collect(),
        };

        inner.teilnehmer_raum.insert(teilnehmer_id, *raum_id);

        tracing::info!(
            teilnehmer_id = %teilnehmer_id,
            username = %username,
            raum_id = %raum_id,
            "Teilnehmer Raum beigetreten"
        );
        Ok(info)
    }

    /// Entfernt einen Teilnehmer aus seinem aktuellen Raum
    ///
    /// Gibt die ID des verlassenen Raums zurueck, oder `None` wenn der
    /// Teilnehmer in keinem Raum registriert war. Idempotent: der zweite
    /// Aufruf ist ein No-op und liefert `None`.
    pub fn raum_verlassen(&self, teilnehmer_id: &TeilnehmerId) -> Option<RaumId> {
        let mut inner = self.inner.lock();

        let raum_id = inner.teilnehmer_raum.remove(teilnehmer_id)?;
        if let Some(raum) = inner.raeume.get_mut(&raum_id) {
            raum.teilnehmer.remove(teilnehmer_id);
        }

        tracing::info!(
            teilnehmer_id = %teilnehmer_id,
            raum_id = %raum_id,
            "Teilnehmer Raum verlassen"
        );
        Some(raum_id)
    }

    /// Loescht einen Raum und bereinigt den Reverse-Index aller Mitglieder
    pub fn raum_loeschen(&self, raum_id: &RaumId) -> bool {
        let mut inner = self.inner.lock();

        let raum = match inner.raeume.remove(raum_id) {
            Some(raum) => raum,
            None => return false,
        };

        for teilnehmer_id in raum.teilnehmer.keys() {
            inner.teilnehmer_raum.remove(teilnehmer_id);
        }

        tracing::info!(raum_id = %raum_id, name = %raum.name, "Raum geloescht");
        true
    }

    /// Sperrt oder entsperrt einen Raum
    ///
    /// Ein gesperrter Raum nimmt keine neuen Teilnehmer an; bestehende
    /// Mitglieder bleiben unberuehrt.
    pub fn raum_sperren(&self, raum_id: &RaumId, gesperrt: bool) -> bool {
        let mut inner = self.inner.lock();
        match inner.raeume.get_mut(raum_id) {
            Some(raum) => {
                raum.gesperrt = gesperrt;
                tracing::info!(raum_id = %raum_id, gesperrt, "Raum-Sperre geaendert");
                true
            }
            None => false,
        }
    }

    /// Gibt den aktuellen Raum eines Teilnehmers zurueck
    pub fn raum_von_teilnehmer(&self, teilnehmer_id: &TeilnehmerId) -> Option<RaumId> {
        self.inner.lock().teilnehmer_raum.get(teilnehmer_id).copied()
    }

    /// Setzt das Audio-Flag eines Teilnehmers
    ///
    /// Gibt die RaumId fuer den anschliessenden Broadcast zurueck, oder
    /// `None` wenn der Teilnehmer in keinem Raum ist.
    pub fn audio_setzen(&self, teilnehmer_id: &TeilnehmerId, aktiv: bool) -> Option<RaumId> {
        self.flag_setzen(teilnehmer_id, |t| t.audio_aktiv = aktiv)
    }

    /// Setzt das Video-Flag eines Teilnehmers
    pub fn video_setzen(&self, teilnehmer_id: &TeilnehmerId, aktiv: bool) -> Option<RaumId> {
        self.flag_setzen(teilnehmer_id, |t| t.video_aktiv = aktiv)
    }

    fn flag_setzen<F>(&self, teilnehmer_id: &TeilnehmerId, f: F) -> Option<RaumId>
    where
        F: FnOnce(&mut Teilnehmer),
    {
        let mut inner = self.inner.lock();
        let raum_id = *inner.teilnehmer_raum.get(teilnehmer_id)?;
        let teilnehmer = inner
            .raeume
            .get_mut(&raum_id)?
            .teilnehmer
            .get_mut(teilnehmer_id)?;
        f(teilnehmer);
        Some(raum_id)
    }

    /// Sendet eine Nachricht an alle Mitglieder eines Raums
    ///
    /// `ausser` wird uebersprungen (typisch: der Ausloeser des Events).
    /// Zustellfehler einzelner Mitglieder werden geloggt und blockieren die
    /// Zustellung an die uebrigen nicht. Gibt die Anzahl der erfolgreich
    /// eingereihten Nachrichten zurueck.
    pub fn an_raum_senden(
        &self,
        raum_id: &RaumId,
        nachricht: &SignalMessage,
        ausser: Option<&TeilnehmerId>,
    ) -> usize {
        let inner = self.inner.lock();
        let raum = match inner.raeume.get(raum_id) {
            Some(raum) => raum,
            None => return 0,
        };

        let mut gesendet = 0;
        for (teilnehmer_id, teilnehmer) in &raum.teilnehmer {
            if Some(teilnehmer_id) == ausser {
                continue;
            }
            if teilnehmer.senden(nachricht.clone()) {
                gesendet += 1;
            }
        }
        gesendet
    }

    /// Sendet eine Nachricht an einen bestimmten Teilnehmer eines Raums
    ///
    /// Gibt `false` zurueck wenn das Ziel kein Mitglied dieses Raums ist
    /// oder die Zustellung fehlschlaegt.
    pub fn an_teilnehmer_senden(
        &self,
        raum_id: &RaumId,
        ziel_id: &TeilnehmerId,
        nachricht: SignalMessage,
    ) -> bool {
        let inner = self.inner.lock();
        match inner.raeume.get(raum_id).and_then(|r| r.teilnehmer.get(ziel_id)) {
            Some(teilnehmer) => teilnehmer.senden(nachricht),
            None => {
                tracing::debug!(
                    raum_id = %raum_id,
                    ziel_id = %ziel_id,
                    "Senden an unbekanntes Raum-Mitglied"
                );
                false
            }
        }
    }
}

impl Default for RaumRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
