//! Key-Exchange-Erweiterungspunkt
//!
//! Der Signaling-Kern schreibt keinen Algorithmus vor: er routet
//! Handshake-Bytes und persistiert das Ergebnis am Media-Endpunkt. Ein
//! echtes Modul (etwa ein Post-Quantum-KEM mit AEAD-Schluesseln) wird
//! ueber den [`KeyExchange`]-Trait eingesteckt, ohne dass Signaling-Code
//! angefasst werden muss.

use visavis_core::types::{SessionId, TeilnehmerId};

use crate::error::MediaResult;

// ---------------------------------------------------------------------------
// SecretBytes
// ---------------------------------------------------------------------------

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// KeyExchange-Trait
// ---------------------------------------------------------------------------

/// Austauschbares Key-Exchange-Modul
///
/// ## Vertrag
/// - `perform_handshake`: erhaelt die opaken Handshake-Bytes eines
///   Teilnehmers (z.B. ClientHello oder KEM-Public-Key) und gibt die
///   Antwort-Bytes fuer den Client zurueck. Deterministisch bezueglich
///   seiner Eingaben plus interner Schluessel.
/// - `derive_keys`: leitet nach abgeschlossenem Handshake das
///   Schluesselmaterial fuer (Session, Teilnehmer) ab. `Ok(None)` heisst:
///   noch kein Material verfuegbar (Handshake unvollstaendig oder das
///   Modul implementiert keine Ableitung).
///
/// Fehler beider Methoden sind nicht verbindungsfatal – der Aufrufer
/// antwortet dem Client mit einer Fehler-Nachricht.
pub trait KeyExchange: Send + Sync {
    /// Verarbeitet Handshake-Bytes und gibt die Antwort-Bytes zurueck
    fn perform_handshake(
        &self,
        teilnehmer_id: &TeilnehmerId,
        handshake: &[u8],
    ) -> MediaResult<Vec<u8>>;

    /// Leitet Schluesselmaterial fuer einen Endpunkt ab
    fn derive_keys(
        &self,
        session_id: &SessionId,
        teilnehmer_id: &TeilnehmerId,
    ) -> MediaResult<Option<SecretBytes>>;
}

// ---------------------------------------------------------------------------
// StubKeyExchange
// ---------------------------------------------------------------------------

/// Platzhalter-Modul ohne Kryptografie
///
/// Beantwortet jeden Handshake mit leeren Bytes und leitet kein
/// Schluesselmaterial ab. Haelt die Routing-Pfade des Kerns lauffaehig,
/// bis ein echtes Modul eingesteckt wird.
#[derive(Debug, Default)]
pub struct StubKeyExchange;

impl KeyExchange for StubKeyExchange {
    fn perform_handshake(
        &self,
        teilnehmer_id: &TeilnehmerId,
        _handshake: &[u8],
    ) -> MediaResult<Vec<u8>> {
        tracing::info!(teilnehmer_id = %teilnehmer_id, "Key-Exchange-Stub: Handshake");
        Ok(Vec::new())
    }

    fn derive_keys(
        &self,
        session_id: &SessionId,
        teilnehmer_id: &TeilnehmerId,
    ) -> MediaResult<Option<SecretBytes>> {
        tracing::info!(
            session_id = %session_id,
            teilnehmer_id = %teilnehmer_id,
            "Key-Exchange-Stub: keine Schluessel-Ableitung"
        );
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_bytes_redacted_im_debug() {
        let secret = SecretBytes::new(vec![1, 2, 3, 4]);
        let debug = format!("{:?}", secret);
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("4 bytes"));
        assert!(!debug.contains("1, 2, 3"));
    }

    #[test]
    fn secret_bytes_laenge() {
        let secret = SecretBytes::new(vec![0u8; 32]);
        assert_eq!(secret.len(), 32);
        assert!(!secret.is_empty());
        assert!(SecretBytes::new(Vec::new()).is_empty());
    }

    #[test]
    fn stub_handshake_gibt_leere_antwort() {
        let stub = StubKeyExchange;
        let antwort = stub
            .perform_handshake(&TeilnehmerId::neu(), b"client-hello")
            .unwrap();
        assert!(antwort.is_empty());
    }

    #[test]
    fn stub_leitet_keine_schluessel_ab() {
        let stub = StubKeyExchange;
        let material = stub
            .derive_keys(&SessionId::neu(), &TeilnehmerId::neu())
            .unwrap();
        assert!(material.is_none());
    }
}
