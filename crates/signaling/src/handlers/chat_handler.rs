//! Chat-Handler – Text-Nachrichten innerhalb eines Raums
//!
//! Kein Verlauf, keine Persistenz: die Nachricht wird an die aktuellen
//! Mitglieder verteilt und vergessen.

use chrono::Utc;
use visavis_protocol::signal::{SignalMessage, SignalPayload};

use crate::dispatcher::VerbindungsKontext;
use crate::server_state::SignalingState;

/// Verarbeitet send_message
///
/// Verlangt Raum-Mitgliedschaft; der Absender bekommt die Bestaetigung,
/// der Rest des Raums den `chat_message`-Push.
pub fn handle_send_message(
    content: String,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    let raum_id = match state.raeume.raum_von_teilnehmer(&ctx.teilnehmer_id) {
        Some(raum_id) => raum_id,
        None => return SignalMessage::fehler(seq, "Nicht in einem Raum"),
    };

    if content.is_empty() {
        return SignalMessage::fehler(seq, "Leere Nachricht");
    }

    let push = SignalMessage::neu(SignalPayload::ChatMessage {
        from_id: ctx.teilnehmer_id,
        username: ctx.anzeigename(),
        content,
        timestamp: Utc::now().timestamp() as u64,
    });
    state
        .raeume
        .an_raum_senden(&raum_id, &push, Some(&ctx.teilnehmer_id));

    SignalMessage::antwort(seq, SignalPayload::MessageSent { success: true })
}
