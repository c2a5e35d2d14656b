//! Media-Session-Registry – Buchfuehrung der Endpunkte pro Raum-Session
//!
//! Eine Session pro Raum, erstellt bei Raum-Erstellung und zerstoert bei
//! Raum-Loeschung (1:1-Lebenszyklus, verdrahtet im Server-Koordinator).
//! Die Registry ist ein logisch eigener Store mit eigenem Mutex – sie darf
//! nie innerhalb eines Registry-Locks der Raum-Verwaltung aufgerufen
//! werden (Lock-Ordnung).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use visavis_core::types::{RaumId, SessionId, TeilnehmerId};

use crate::error::{MediaError, MediaResult};
use crate::key_exchange::{KeyExchange, SecretBytes, StubKeyExchange};

// ---------------------------------------------------------------------------
// MediaEndpunkt
// ---------------------------------------------------------------------------

/// Media-Endpunkt eines Teilnehmers
///
/// Fingerprint und Schluesselmaterial bleiben leer, bis das eingesteckte
/// Key-Exchange-Modul sie liefert.
#[derive(Debug, Clone)]
pub struct MediaEndpunkt {
    pub teilnehmer_id: TeilnehmerId,
    /// Transport-Adresse des Clients
    pub adresse: SocketAddr,
    pub audio_port: u16,
    pub video_port: u16,
    pub dtls_fingerprint: Option<String>,
    pub srtp_schluessel: Option<SecretBytes>,
}

impl MediaEndpunkt {
    /// Erstellt einen neuen Endpunkt ohne Krypto-Zustand
    pub fn neu(
        teilnehmer_id: TeilnehmerId,
        adresse: SocketAddr,
        audio_port: u16,
        video_port: u16,
    ) -> Self {
        Self {
            teilnehmer_id,
            adresse,
            audio_port,
            video_port,
            dtls_fingerprint: None,
            srtp_schluessel: None,
        }
    }
}

// ---------------------------------------------------------------------------
// MediaSession
// ---------------------------------------------------------------------------

/// Media-Session eines Raums mit den Endpunkten ihrer Teilnehmer
#[derive(Debug, Clone)]
pub struct MediaSession {
    pub id: SessionId,
    pub raum_id: RaumId,
    pub aktiv: bool,
    pub endpunkte: HashMap<TeilnehmerId, MediaEndpunkt>,
}

impl MediaSession {
    fn neu(id: SessionId, raum_id: RaumId) -> Self {
        Self {
            id,
            raum_id,
            aktiv: true,
            endpunkte: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// MediaSessionRegistry
// ---------------------------------------------------------------------------

/// Zentraler, thread-sicherer Store aller Media-Sessions
pub struct MediaSessionRegistry {
    sessions: Mutex<HashMap<SessionId, MediaSession>>,
    key_exchange: Arc<dyn KeyExchange>,
    laeuft: AtomicBool,
}

impl MediaSessionRegistry {
    /// Erstellt eine Registry mit dem Platzhalter-Key-Exchange
    pub fn neu() -> Self {
        Self::mit_key_exchange(Arc::new(StubKeyExchange))
    }

    /// Erstellt eine Registry mit einem eingesteckten Key-Exchange-Modul
    pub fn mit_key_exchange(key_exchange: Arc<dyn KeyExchange>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            key_exchange,
            laeuft: AtomicBool::new(false),
        }
    }

    /// Startet das Media-Subsystem
    ///
    /// Idempotent – ein zweiter Aufruf loggt nur und tut nichts.
    pub fn starten(&self) {
        if self.laeuft.swap(true, Ordering::SeqCst) {
            tracing::warn!("Media-Subsystem laeuft bereits");
            return;
        }
        tracing::info!("Media-Subsystem gestartet");
    }

    /// Stoppt das Media-Subsystem und markiert alle Sessions inaktiv
    pub fn stoppen(&self) {
        if !self.laeuft.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut sessions = self.sessions.lock();
        for session in sessions.values_mut() {
            session.aktiv = false;
        }
        tracing::info!(sessions = sessions.len(), "Media-Subsystem gestoppt");
    }

    /// Prueft ob das Subsystem laeuft
    pub fn laeuft(&self) -> bool {
        self.laeuft.load(Ordering::SeqCst)
    }

    /// Erstellt eine neue Session fuer einen Raum
    ///
    /// Gibt `false` zurueck wenn die Session-ID bereits belegt ist.
    pub fn session_erstellen(&self, session_id: SessionId, raum_id: RaumId) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&session_id) {
            tracing::warn!(session_id = %session_id, "Session existiert bereits");
            return false;
        }
        sessions.insert(session_id, MediaSession::neu(session_id, raum_id));
        tracing::info!(session_id = %session_id, raum_id = %raum_id, "Media-Session erstellt");
        true
    }

    /// Zerstoert eine Session
    pub fn session_zerstoeren(&self, session_id: &SessionId) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.remove(session_id) {
            Some(mut session) => {
                session.aktiv = false;
                tracing::info!(session_id = %session_id, "Media-Session zerstoert");
                true
            }
            None => false,
        }
    }

    /// Fuegt einen Endpunkt zu einer Session hinzu
    ///
    /// Gibt `false` zurueck wenn die Session nicht existiert. Ein bereits
    /// vorhandener Endpunkt desselben Teilnehmers wird ersetzt.
    pub fn endpunkt_hinzufuegen(&self, session_id: &SessionId, endpunkt: MediaEndpunkt) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(session_id) {
            Some(session) => {
                tracing::info!(
                    session_id = %session_id,
                    teilnehmer_id = %endpunkt.teilnehmer_id,
                    "Media-Endpunkt registriert"
                );
                session.endpunkte.insert(endpunkt.teilnehmer_id, endpunkt);
                true
            }
            None => {
                tracing::warn!(session_id = %session_id, "Session nicht gefunden");
                false
            }
        }
    }

    /// Entfernt den Endpunkt eines Teilnehmers aus einer Session
    ///
    /// Gibt `false` zurueck wenn Session oder Endpunkt fehlen.
    pub fn endpunkt_entfernen(
        &self,
        session_id: &SessionId,
        teilnehmer_id: &TeilnehmerId,
    ) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(session_id) {
            Some(session) => {
                let entfernt = session.endpunkte.remove(teilnehmer_id).is_some();
                if entfernt {
                    tracing::info!(
                        session_id = %session_id,
                        teilnehmer_id = %teilnehmer_id,
                        "Media-Endpunkt entfernt"
                    );
                }
                entfernt
            }
            None => false,
        }
    }

    /// Gibt den Snapshot einer Session zurueck
    pub fn session_holen(&self, session_id: &SessionId) -> Option<MediaSession> {
        self.sessions.lock().get(session_id).cloned()
    }

    /// Listet alle Sessions auf (Snapshot)
    pub fn sessions_auflisten(&self) -> Vec<MediaSession> {
        self.sessions.lock().values().cloned().collect()
    }

    /// Gibt die Anzahl der Sessions zurueck
    pub fn session_anzahl(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Routet Handshake-Bytes durch das Key-Exchange-Modul
    ///
    /// Die Antwort-Bytes gehen zurueck an den Client. Der Endpunkt muss
    /// nicht registriert sein – der Handshake kann der Registrierung
    /// vorausgehen.
    pub fn handshake_durchfuehren(
        &self,
        session_id: &SessionId,
        teilnehmer_id: &TeilnehmerId,
        handshake: &[u8],
    ) -> MediaResult<Vec<u8>> {
        {
            let sessions = self.sessions.lock();
            if !sessions.contains_key(session_id) {
                return Err(MediaError::SessionNichtGefunden(*session_id));
            }
        }
        // Key-Exchange ausserhalb des Locks – das Modul darf rechnen
        self.key_exchange.perform_handshake(teilnehmer_id, handshake)
    }

    /// Leitet Schluesselmaterial ab und persistiert es am Endpunkt
    ///
    /// Gibt `Ok(true)` zurueck wenn Material abgeleitet und gespeichert
    /// wurde, `Ok(false)` wenn das Modul (noch) keines liefert.
    pub fn schluessel_ableiten(
        &self,
        session_id: &SessionId,
        teilnehmer_id: &TeilnehmerId,
    ) -> MediaResult<bool> {
        let material = self.key_exchange.derive_keys(session_id, teilnehmer_id)?;

        let material = match material {
            Some(material) => material,
            None => return Ok(false),
        };

        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or(MediaError::SessionNichtGefunden(*session_id))?;
        let endpunkt = session
            .endpunkte
            .get_mut(teilnehmer_id)
            .ok_or(MediaError::EndpunktNichtGefunden(*teilnehmer_id))?;

        endpunkt.srtp_schluessel = Some(material);
        tracing::info!(
            session_id = %session_id,
            teilnehmer_id = %teilnehmer_id,
            "Schluesselmaterial am Endpunkt persistiert"
        );
        Ok(true)
    }
}

impl Default for MediaSessionRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
