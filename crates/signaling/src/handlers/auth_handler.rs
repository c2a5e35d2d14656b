//! Auth-Handler – Login
//!
//! Die Teilnehmer-Identitaet existiert bereits seit dem Verbindungsaufbau;
//! der Login waehlt nur den Usernamen und schaltet die Verbindung frei.

use visavis_protocol::signal::{SignalMessage, SignalPayload};

use crate::dispatcher::{VerbindungsKontext, VerbindungsZustand};
use crate::server_state::SignalingState;

/// Verarbeitet eine Login-Anfrage
///
/// Fehlender/leerer Username ist ein Fehler ohne Zustandsaenderung. Ein
/// erneuter Login aktualisiert nur den Usernamen.
pub fn handle_login(
    username: String,
    seq: Option<u32>,
    ctx: &mut VerbindungsKontext,
    _state: &SignalingState,
) -> SignalMessage {
    let username = username.trim().to_string();
    if username.is_empty() {
        return SignalMessage::fehler(seq, "Username erforderlich");
    }

    ctx.username = Some(username.clone());
    if ctx.zustand == VerbindungsZustand::Verbunden {
        ctx.zustand = VerbindungsZustand::Angemeldet;
    }

    tracing::info!(
        teilnehmer_id = %ctx.teilnehmer_id,
        username = %username,
        peer = %ctx.peer_addr,
        "Teilnehmer angemeldet"
    );

    SignalMessage::antwort(
        seq,
        SignalPayload::LoginResponse {
            success: true,
            participant_id: ctx.teilnehmer_id,
            username,
        },
    )
}
