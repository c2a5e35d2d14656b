//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt die beiden Registries als Arc-Referenzen, die sicher zwischen
//! tokio-Tasks geteilt werden koennen. Beide werden beim Start explizit
//! konstruiert und hereingereicht – kein prozessweiter Singleton-Zustand.

use std::sync::Arc;
use visavis_media::MediaSessionRegistry;
use visavis_rooms::RaumRegistry;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingKonfig {
    /// Anzeigename des Servers (nur fuer Logs)
    pub server_name: String,
    /// Standard-Kapazitaet neuer Raeume wenn der Client keine angibt
    pub standard_max_teilnehmer: u32,
}

impl Default for SignalingKonfig {
    fn default() -> Self {
        Self {
            server_name: "Visavis Server".to_string(),
            standard_max_teilnehmer: visavis_rooms::STANDARD_MAX_TEILNEHMER,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Service-Konfiguration
    pub konfig: SignalingKonfig,
    /// Raum-Registry (Raeume, Mitgliedschaften, Broadcasts)
    pub raeume: Arc<RaumRegistry>,
    /// Media-Session-Registry (Endpunkte, Key-Exchange-Hooks)
    pub media: Arc<MediaSessionRegistry>,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(
        konfig: SignalingKonfig,
        raeume: Arc<RaumRegistry>,
        media: Arc<MediaSessionRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            konfig,
            raeume,
            media,
        })
    }
}
