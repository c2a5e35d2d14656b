//! TLS-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `TlsListener` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer
//! `ClientConnection`. Der TLS-Handshake laeuft im Verbindungs-Task:
//! Handshake-Fehler betreffen nur diese eine Verbindung und beenden die
//! Accept-Schleife nie.
//!
//! ## TLS-Politik
//! - Mindestversion TLS 1.3, kein Downgrade
//! - Server-Zertifikat und Schluessel sind Pflicht
//! - Client-Zertifikate werden genau dann verlangt und geprueft, wenn ein
//!   CA-Zertifikat konfiguriert ist (mutual TLS), sonst nicht

use parking_lot::Mutex;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use rustls_pemfile::{certs, private_key};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::connection::ClientConnection;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Wartezeit auf das Ende der Accept-Schleife beim Stoppen
const STOP_ZEITLIMIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration des TLS-Listeners
#[derive(Debug, Clone)]
pub struct TlsKonfig {
    /// Bind-Adresse (Host + Port)
    pub bind_addr: SocketAddr,
    /// Pfad zum Server-Zertifikat (PEM)
    pub zertifikat: PathBuf,
    /// Pfad zum privaten Schluessel (PEM)
    pub schluessel: PathBuf,
    /// Optionales CA-Zertifikat – aktiviert mutual TLS
    pub ca_zertifikat: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// TlsListener
// ---------------------------------------------------------------------------

/// TLS-Signaling-Listener
///
/// `starten()` und `stoppen()` sind idempotent. Laufende Verbindungs-Tasks
/// werden beim Stoppen nicht zwangsweise beendet; sie beobachten das
/// Shutdown-Signal bzw. die Socket-Schliessung selbst.
pub struct TlsListener {
    state: Arc<SignalingState>,
    konfig: TlsKonfig,
    laeuft: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    lokale_addr: Mutex<Option<SocketAddr>>,
}

impl TlsListener {
    /// Erstellt einen neuen TlsListener
    pub fn neu(state: Arc<SignalingState>, konfig: TlsKonfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            state,
            konfig,
            laeuft: AtomicBool::new(false),
            shutdown_tx,
            accept_task: Mutex::new(None),
            lokale_addr: Mutex::new(None),
        }
    }

    /// Startet den Listener und die Accept-Schleife
    ///
    /// Idempotent: ein zweiter Aufruf bei laufendem Listener loggt nur.
    /// Bind- und TLS-Konfigurationsfehler sind fatal und werden propagiert.
    pub async fn starten(&self) -> SignalingResult<()> {
        if self.laeuft.swap(true, Ordering::SeqCst) {
            tracing::warn!("TLS-Listener laeuft bereits");
            return Ok(());
        }
        // Latch aus einem frueheren stoppen() zuruecksetzen
        let _ = self.shutdown_tx.send(false);

        let acceptor = match tls_acceptor_bauen(&self.konfig) {
            Ok(acceptor) => acceptor,
            Err(e) => {
                self.laeuft.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let listener = match TcpListener::bind(self.konfig.bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.laeuft.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        let lokale_addr = match listener.local_addr() {
            Ok(lokale_addr) => lokale_addr,
            Err(e) => {
                self.laeuft.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        *self.lokale_addr.lock() = Some(lokale_addr);

        tracing::info!(
            adresse = %lokale_addr,
            mtls = self.konfig.ca_zertifikat.is_some(),
            "TLS-Signaling-Server gestartet"
        );

        let state = Arc::clone(&self.state);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(accept_schleife(listener, acceptor, state, shutdown_rx));
        *self.accept_task.lock() = Some(handle);

        Ok(())
    }

    /// Stoppt den Listener
    ///
    /// Setzt das Shutdown-Signal, schliesst damit den Listener-Socket und
    /// wartet begrenzt auf das Ende der Accept-Schleife. Idempotent und
    /// gefahrlos mehrfach aufrufbar.
    pub async fn stoppen(&self) {
        if !self.laeuft.swap(false, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(true);

        let handle = self.accept_task.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(STOP_ZEITLIMIT, handle).await {
                Ok(_) => tracing::info!("TLS-Signaling-Server gestoppt"),
                Err(_) => {
                    tracing::warn!("Accept-Schleife hat das Stop-Zeitlimit ueberschritten")
                }
            }
        }
    }

    /// Prueft ob der Listener laeuft
    pub fn laeuft(&self) -> bool {
        self.laeuft.load(Ordering::SeqCst)
    }

    /// Gibt die tatsaechlich gebundene Adresse zurueck (nach `starten()`)
    pub fn lokale_adresse(&self) -> Option<SocketAddr> {
        *self.lokale_addr.lock()
    }
}

/// Accept-Schleife: nimmt Verbindungen an und spawnt pro Verbindung einen Task
async fn accept_schleife(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    state: Arc<SignalingState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            // Neue eingehende Verbindung
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                        let acceptor = acceptor.clone();
                        let state = Arc::clone(&state);
                        let shutdown_rx_clone = shutdown_rx.clone();

                        tokio::spawn(async move {
                            match acceptor.accept(stream).await {
                                Ok(tls_stream) => {
                                    ClientConnection::neu(state, peer_addr)
                                        .verarbeiten(tls_stream, shutdown_rx_clone)
                                        .await;
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %e,
                                        "TLS-Handshake fehlgeschlagen"
                                    );
                                }
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }

            // Shutdown-Signal
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Signaling-Listener: Shutdown-Signal empfangen");
                    break;
                }
            }
        }
    }
    // listener wird hier gedroppt – Socket geschlossen
}

// ---------------------------------------------------------------------------
// TLS-Konfiguration
// ---------------------------------------------------------------------------

/// Installiert den ring-CryptoProvider als Prozess-Standard
///
/// Mehrfachaufrufe sind gefahrlos (das Ergebnis wird ignoriert).
pub fn krypto_provider_installieren() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Baut den TlsAcceptor aus der Konfiguration
///
/// Mindestversion TLS 1.3. Mit CA-Zertifikat werden Client-Zertifikate
/// verlangt und gegen die CA geprueft, sonst nicht.
pub fn tls_acceptor_bauen(konfig: &TlsKonfig) -> SignalingResult<TlsAcceptor> {
    krypto_provider_installieren();

    let cert_chain = zertifikate_laden(&konfig.zertifikat)?;
    let key = schluessel_laden(&konfig.schluessel)?;

    let builder = ServerConfig::builder_with_protocol_versions(&[&rustls::version::TLS13]);

    let builder = match &konfig.ca_zertifikat {
        Some(ca_pfad) => {
            let mut roots = RootCertStore::empty();
            for cert in zertifikate_laden(ca_pfad)? {
                roots
                    .add(cert)
                    .map_err(|e| SignalingError::tls(format!("CA-Zertifikat ungueltig: {e}")))?;
            }
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|e| {
                    SignalingError::tls(format!("Client-Verifier-Aufbau fehlgeschlagen: {e}"))
                })?;
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    };

    let tls_config = builder
        .with_single_cert(cert_chain, key)
        .map_err(|e| SignalingError::tls(format!("Zertifikat/Schluessel ungueltig: {e}")))?;

    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}

fn zertifikate_laden(pfad: &Path) -> SignalingResult<Vec<CertificateDer<'static>>> {
    let datei = std::fs::File::open(pfad).map_err(|e| {
        SignalingError::tls(format!("Zertifikat '{}' nicht lesbar: {e}", pfad.display()))
    })?;
    let mut reader = std::io::BufReader::new(datei);
    let zertifikate = certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SignalingError::tls(format!("Zertifikat-Parsing fehlgeschlagen: {e}")))?;

    if zertifikate.is_empty() {
        return Err(SignalingError::tls(format!(
            "Keine Zertifikate in '{}'",
            pfad.display()
        )));
    }
    Ok(zertifikate)
}

fn schluessel_laden(pfad: &Path) -> SignalingResult<PrivateKeyDer<'static>> {
    let datei = std::fs::File::open(pfad).map_err(|e| {
        SignalingError::tls(format!("Schluessel '{}' nicht lesbar: {e}", pfad.display()))
    })?;
    let mut reader = std::io::BufReader::new(datei);
    private_key(&mut reader)
        .map_err(|e| SignalingError::tls(format!("Schluessel-Parsing fehlgeschlagen: {e}")))?
        .ok_or_else(|| {
            SignalingError::tls(format!("Kein privater Schluessel in '{}'", pfad.display()))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::{SignalingKonfig, SignalingState};
    use visavis_media::MediaSessionRegistry;
    use visavis_rooms::RaumRegistry;

    /// Schreibt ein selbstsigniertes Zertifikat + Schluessel in Temp-Dateien
    fn test_zertifikat() -> (PathBuf, PathBuf) {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let eindeutig = uuid::Uuid::new_v4().simple().to_string();
        let cert_pfad = std::env::temp_dir().join(format!("visavis-test-{eindeutig}-cert.pem"));
        let key_pfad = std::env::temp_dir().join(format!("visavis-test-{eindeutig}-key.pem"));
        std::fs::write(&cert_pfad, cert.pem()).unwrap();
        std::fs::write(&key_pfad, key_pair.serialize_pem()).unwrap();
        (cert_pfad, key_pfad)
    }

    fn test_state() -> Arc<SignalingState> {
        SignalingState::neu(
            SignalingKonfig::default(),
            Arc::new(RaumRegistry::neu()),
            Arc::new(MediaSessionRegistry::neu()),
        )
    }

    #[test]
    fn acceptor_aus_gueltigem_zertifikat() {
        let (cert_pfad, key_pfad) = test_zertifikat();
        let konfig = TlsKonfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            zertifikat: cert_pfad,
            schluessel: key_pfad,
            ca_zertifikat: None,
        };
        assert!(tls_acceptor_bauen(&konfig).is_ok());
    }

    #[test]
    fn acceptor_mit_fehlendem_zertifikat_schlaegt_fehl() {
        let konfig = TlsKonfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            zertifikat: PathBuf::from("/gibt/es/nicht.pem"),
            schluessel: PathBuf::from("/gibt/es/nicht.key"),
            ca_zertifikat: None,
        };
        let result = tls_acceptor_bauen(&konfig);
        assert!(matches!(result, Err(SignalingError::Tls(_))));
    }

    #[test]
    fn acceptor_mit_ca_aktiviert_mtls_aufbau() {
        // Die eigene CA ist hier schlicht das Server-Zertifikat – es geht
        // nur um den Verifier-Aufbau
        let (cert_pfad, key_pfad) = test_zertifikat();
        let konfig = TlsKonfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            zertifikat: cert_pfad.clone(),
            schluessel: key_pfad,
            ca_zertifikat: Some(cert_pfad),
        };
        assert!(tls_acceptor_bauen(&konfig).is_ok());
    }

    #[tokio::test]
    async fn starten_und_stoppen_idempotent() {
        let (cert_pfad, key_pfad) = test_zertifikat();
        let konfig = TlsKonfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            zertifikat: cert_pfad,
            schluessel: key_pfad,
            ca_zertifikat: None,
        };
        let listener = TlsListener::neu(test_state(), konfig);

        listener.starten().await.unwrap();
        assert!(listener.laeuft());
        assert!(listener.lokale_adresse().is_some());

        // Zweiter Start: No-op
        listener.starten().await.unwrap();

        listener.stoppen().await;
        assert!(!listener.laeuft());

        // Zweiter Stop: No-op
        listener.stoppen().await;
    }

    #[tokio::test]
    async fn bind_fehler_ist_fatal() {
        let (cert_pfad, key_pfad) = test_zertifikat();
        let konfig = TlsKonfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            zertifikat: cert_pfad.clone(),
            schluessel: key_pfad.clone(),
            ca_zertifikat: None,
        };
        let erster = TlsListener::neu(test_state(), konfig);
        erster.starten().await.unwrap();
        let belegt = erster.lokale_adresse().unwrap();

        // Zweiter Listener auf demselben Port: Bind-Fehler propagiert
        let konfig = TlsKonfig {
            bind_addr: belegt,
            zertifikat: cert_pfad,
            schluessel: key_pfad,
            ca_zertifikat: None,
        };
        let zweiter = TlsListener::neu(test_state(), konfig);
        let result = zweiter.starten().await;
        assert!(result.is_err());
        assert!(!zweiter.laeuft(), "Fehlstart darf nicht als laufend gelten");

        erster.stoppen().await;
    }
}
