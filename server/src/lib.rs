//! visavis-server – Bibliotheks-Root
//!
//! Verdrahtet die Registries mit dem TLS-Listener und besitzt den
//! Lebenszyklus: `starten()` und `stoppen()` sind idempotent und
//! symmetrisch. Beim Stoppen faellt zuerst der Listener, dann das
//! Media-Subsystem.

pub mod config;

use anyhow::Context;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use config::ServerConfig;
use visavis_media::MediaSessionRegistry;
use visavis_rooms::RaumRegistry;
use visavis_signaling::{SignalingKonfig, SignalingState, TlsKonfig, TlsListener};

/// Haelt den laufenden Server-Zustand zusammen
///
/// Die Registries entstehen hier und werden als Arc in den Signaling-Layer
/// gereicht – es gibt keinen prozessweiten Singleton-Zustand.
pub struct Server {
    pub config: ServerConfig,
    raeume: Arc<RaumRegistry>,
    media: Arc<MediaSessionRegistry>,
    listener: Mutex<Option<Arc<TlsListener>>>,
    gestartet: AtomicBool,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self {
            config,
            raeume: Arc::new(RaumRegistry::neu()),
            media: Arc::new(MediaSessionRegistry::neu()),
            listener: Mutex::new(None),
            gestartet: AtomicBool::new(false),
        }
    }

    /// Startet alle Subsysteme
    ///
    /// Reihenfolge: Media-Subsystem, dann TLS-Listener. Idempotent – ein
    /// zweiter Aufruf loggt nur. Bind-/TLS-Fehler sind fatal und lassen
    /// den Server gestoppt zurueck.
    pub async fn starten(&self) -> anyhow::Result<()> {
        if self.gestartet.swap(true, Ordering::SeqCst) {
            tracing::warn!("Server laeuft bereits");
            return Ok(());
        }

        let bind_addr: SocketAddr = self
            .config
            .signaling_bind_adresse()
            .parse()
            .with_context(|| {
                format!(
                    "Ungueltige Bind-Adresse '{}'",
                    self.config.signaling_bind_adresse()
                )
            })
            .inspect_err(|_| self.gestartet.store(false, Ordering::SeqCst))?;

        tracing::info!(
            server_name = %self.config.server.name,
            signaling = %bind_addr,
            audio_port = self.config.netzwerk.audio_port,
            video_port = self.config.netzwerk.video_port,
            "Server startet"
        );

        let state = SignalingState::neu(
            SignalingKonfig {
                server_name: self.config.server.name.clone(),
                standard_max_teilnehmer: self.config.server.standard_max_teilnehmer,
            },
            Arc::clone(&self.raeume),
            Arc::clone(&self.media),
        );

        let tls_konfig = TlsKonfig {
            bind_addr,
            zertifikat: self.config.tls.zertifikat.clone().into(),
            schluessel: self.config.tls.schluessel.clone().into(),
            ca_zertifikat: self.config.tls.ca_zertifikat.clone().map(Into::into),
        };

        self.media.starten();

        let listener = Arc::new(TlsListener::neu(state, tls_konfig));
        if let Err(e) = listener.starten().await {
            self.media.stoppen();
            self.gestartet.store(false, Ordering::SeqCst);
            return Err(anyhow::Error::new(e).context("TLS-Listener-Start fehlgeschlagen"));
        }
        *self.listener.lock() = Some(listener);

        tracing::info!("Server gestartet");
        Ok(())
    }

    /// Stoppt alle Subsysteme
    ///
    /// Reihenfolge: zuerst der Listener, dann das Media-Subsystem.
    /// Idempotent und gefahrlos mehrfach oder aus dem Signal-Pfad aufrufbar.
    pub async fn stoppen(&self) {
        if !self.gestartet.swap(false, Ordering::SeqCst) {
            return;
        }

        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.stoppen().await;
        }
        self.media.stoppen();

        tracing::info!("Server gestoppt");
    }

    /// Prueft ob der Server laeuft
    pub fn laeuft(&self) -> bool {
        self.gestartet.load(Ordering::SeqCst)
    }

    /// Gibt die tatsaechlich gebundene Signaling-Adresse zurueck
    pub fn signaling_adresse(&self) -> Option<SocketAddr> {
        self.listener.lock().as_ref().and_then(|l| l.lokale_adresse())
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal (Ctrl-C)
    pub async fn laufen(&self) -> anyhow::Result<()> {
        self.starten().await?;

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        self.stoppen().await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Schreibt ein selbstsigniertes Zertifikat + Schluessel in Temp-Dateien
    fn test_zertifikat() -> (String, String) {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let eindeutig = uuid::Uuid::new_v4().simple().to_string();
        let cert_pfad = std::env::temp_dir().join(format!("visavis-srv-{eindeutig}-cert.pem"));
        let key_pfad = std::env::temp_dir().join(format!("visavis-srv-{eindeutig}-key.pem"));
        std::fs::write(&cert_pfad, cert.pem()).unwrap();
        std::fs::write(&key_pfad, key_pair.serialize_pem()).unwrap();
        (
            cert_pfad.to_string_lossy().into_owned(),
            key_pfad.to_string_lossy().into_owned(),
        )
    }

    fn test_config() -> ServerConfig {
        let (zertifikat, schluessel) = test_zertifikat();
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.signaling_port = 0;
        config.tls.zertifikat = zertifikat;
        config.tls.schluessel = schluessel;
        config
    }

    #[tokio::test]
    async fn starten_und_stoppen_sind_idempotent() {
        let server = Server::neu(test_config());
        assert!(!server.laeuft());

        server.starten().await.unwrap();
        assert!(server.laeuft());
        assert!(server.signaling_adresse().is_some());

        // Zweiter Start: No-op
        server.starten().await.unwrap();

        server.stoppen().await;
        assert!(!server.laeuft());

        // Mehrfaches Stoppen ist gefahrlos
        server.stoppen().await;
        server.stoppen().await;
    }

    #[tokio::test]
    async fn neustart_nach_stoppen() {
        let server = Server::neu(test_config());

        server.starten().await.unwrap();
        server.stoppen().await;

        server.starten().await.unwrap();
        assert!(server.laeuft());
        server.stoppen().await;
    }

    #[tokio::test]
    async fn fehlende_zertifikate_sind_fatal() {
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.signaling_port = 0;
        config.tls.zertifikat = "/gibt/es/nicht.pem".into();
        config.tls.schluessel = "/gibt/es/nicht.key".into();

        let server = Server::neu(config);
        assert!(server.starten().await.is_err());
        assert!(!server.laeuft());
    }
}
