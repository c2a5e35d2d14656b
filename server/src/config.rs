//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder ausser den
//! TLS-Pfaden haben sinnvolle Standardwerte; das Zertifikat-Paar ist
//! Pflicht, die Standardpfade zeigen auf das Arbeitsverzeichnis.

use serde::{Deserialize, Serialize};
use visavis_core::{Result, VisavisError};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// TLS-Einstellungen
    pub tls: TlsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Standard-Kapazitaet neuer Raeume
    pub standard_max_teilnehmer: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Visavis Server".into(),
            standard_max_teilnehmer: 10,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer alle Dienste
    pub bind_adresse: String,
    /// Port fuer das TLS-Signaling
    pub signaling_port: u16,
    /// UDP-Port fuer Audio (Media-Relay, extern)
    pub audio_port: u16,
    /// UDP-Port fuer Video (Media-Relay, extern)
    pub video_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            signaling_port: 8443,
            audio_port: 10000,
            video_port: 10001,
        }
    }
}

/// TLS-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsEinstellungen {
    /// Pfad zum Server-Zertifikat (PEM)
    pub zertifikat: String,
    /// Pfad zum privaten Schluessel (PEM)
    pub schluessel: String,
    /// CA-Zertifikat – gesetzt aktiviert es mutual TLS
    pub ca_zertifikat: Option<String>,
}

impl Default for TlsEinstellungen {
    fn default() -> Self {
        Self {
            zertifikat: "server.crt".into(),
            schluessel: "server.key".into(),
            ca_zertifikat: None,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt).map_err(|e| {
                    VisavisError::Konfiguration(format!("Fehler in '{pfad}': {e}"))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(VisavisError::Konfiguration(format!(
                "Datei '{pfad}' nicht lesbar: {e}"
            ))),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer das Signaling zurueck
    pub fn signaling_bind_adresse(&self) -> String {
        format!(
            "{}:{}",
            self.netzwerk.bind_adresse, self.netzwerk.signaling_port
        )
    }
}
