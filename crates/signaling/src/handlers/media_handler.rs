//! Media-Handler – Offer/Answer/ICE-Weiterleitung, Toggles, Key-Exchange
//!
//! Offer, Answer und ICE-Kandidaten werden unveraendert an das Ziel
//! weitergereicht – der Server validiert nur Raum-Mitgliedschaft, nie den
//! Payload-Inhalt. Alle Operationen hier verlangen Raum-Mitgliedschaft.

use visavis_core::types::{RaumId, SessionId, TeilnehmerId};
use visavis_protocol::signal::{SignalMessage, SignalPayload};

use crate::dispatcher::VerbindungsKontext;
use crate::server_state::SignalingState;

/// Aktueller Raum des Absenders, oder None wenn nicht Mitglied
fn raum_von(ctx: &VerbindungsKontext, state: &SignalingState) -> Option<RaumId> {
    state.raeume.raum_von_teilnehmer(&ctx.teilnehmer_id)
}

/// Leitet einen Payload an ein Raum-Mitglied weiter und baut die Bestaetigung
fn weiterleiten(
    ziel_id: Option<TeilnehmerId>,
    push: impl FnOnce(TeilnehmerId) -> SignalPayload,
    bestaetigung: SignalPayload,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    let ziel_id = match ziel_id {
        Some(ziel_id) => ziel_id,
        None => return SignalMessage::fehler(seq, "target_id erforderlich"),
    };

    let raum_id = match raum_von(ctx, state) {
        Some(raum_id) => raum_id,
        None => return SignalMessage::fehler(seq, "Nicht in einem Raum"),
    };

    let nachricht = SignalMessage::neu(push(ctx.teilnehmer_id));
    if state.raeume.an_teilnehmer_senden(&raum_id, &ziel_id, nachricht) {
        SignalMessage::antwort(seq, bestaetigung)
    } else {
        SignalMessage::fehler(seq, "Ziel nicht gefunden")
    }
}

/// Verarbeitet ein media_offer (SDP-Offer an ein Raum-Mitglied)
pub fn handle_media_offer(
    target_id: Option<TeilnehmerId>,
    sdp: String,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    weiterleiten(
        target_id,
        |from_id| SignalPayload::MediaOffer {
            target_id: None,
            from_id: Some(from_id),
            sdp,
        },
        SignalPayload::OfferSent { success: true },
        seq,
        ctx,
        state,
    )
}

/// Verarbeitet ein media_answer (SDP-Answer an ein Raum-Mitglied)
pub fn handle_media_answer(
    target_id: Option<TeilnehmerId>,
    sdp: String,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    weiterleiten(
        target_id,
        |from_id| SignalPayload::MediaAnswer {
            target_id: None,
            from_id: Some(from_id),
            sdp,
        },
        SignalPayload::AnswerSent { success: true },
        seq,
        ctx,
        state,
    )
}

/// Verarbeitet einen ice_candidate (Kandidat an ein Raum-Mitglied)
pub fn handle_ice_candidate(
    target_id: Option<TeilnehmerId>,
    candidate: String,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    weiterleiten(
        target_id,
        |from_id| SignalPayload::IceCandidate {
            target_id: None,
            from_id: Some(from_id),
            candidate,
        },
        SignalPayload::CandidateSent { success: true },
        seq,
        ctx,
        state,
    )
}

/// Verarbeitet toggle_audio
///
/// Mutiert das Flag in der Registry und broadcastet die Aenderung an den
/// Rest des Raums (ohne den Ausloeser).
pub fn handle_toggle_audio(
    enabled: bool,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    match state.raeume.audio_setzen(&ctx.teilnehmer_id, enabled) {
        Some(raum_id) => {
            let push = SignalMessage::neu(SignalPayload::AudioToggled {
                success: None,
                participant_id: Some(ctx.teilnehmer_id),
                enabled,
            });
            state
                .raeume
                .an_raum_senden(&raum_id, &push, Some(&ctx.teilnehmer_id));

            SignalMessage::antwort(
                seq,
                SignalPayload::AudioToggled {
                    success: Some(true),
                    participant_id: None,
                    enabled,
                },
            )
        }
        None => SignalMessage::fehler(seq, "Nicht in einem Raum"),
    }
}

/// Verarbeitet toggle_video
pub fn handle_toggle_video(
    enabled: bool,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    match state.raeume.video_setzen(&ctx.teilnehmer_id, enabled) {
        Some(raum_id) => {
            let push = SignalMessage::neu(SignalPayload::VideoToggled {
                success: None,
                participant_id: Some(ctx.teilnehmer_id),
                enabled,
            });
            state
                .raeume
                .an_raum_senden(&raum_id, &push, Some(&ctx.teilnehmer_id));

            SignalMessage::antwort(
                seq,
                SignalPayload::VideoToggled {
                    success: Some(true),
                    participant_id: None,
                    enabled,
                },
            )
        }
        None => SignalMessage::fehler(seq, "Nicht in einem Raum"),
    }
}

/// Verarbeitet key_exchange_init
///
/// Routet die opaken Handshake-Bytes durch das eingesteckte Key-Exchange-
/// Modul der Media-Registry und gibt dessen Antwort-Bytes zurueck. Liefert
/// das Modul Schluesselmaterial, wird es am Endpunkt persistiert.
pub fn handle_key_exchange_init(
    public_key: Vec<u8>,
    seq: Option<u32>,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    let raum_id = match raum_von(ctx, state) {
        Some(raum_id) => raum_id,
        None => return SignalMessage::fehler(seq, "Nicht in einem Raum"),
    };
    let session_id = SessionId::from(raum_id);

    let ciphertext = match state
        .media
        .handshake_durchfuehren(&session_id, &ctx.teilnehmer_id, &public_key)
    {
        Ok(ciphertext) => ciphertext,
        Err(e) => {
            tracing::warn!(
                teilnehmer_id = %ctx.teilnehmer_id,
                fehler = %e,
                "Key-Exchange fehlgeschlagen"
            );
            return SignalMessage::fehler(seq, e.to_string());
        }
    };

    // Schluessel-Ableitung ist best effort: ohne registrierten Endpunkt
    // oder mit dem Stub-Modul gibt es (noch) kein Material
    match state
        .media
        .schluessel_ableiten(&session_id, &ctx.teilnehmer_id)
    {
        Ok(true) => {
            tracing::debug!(teilnehmer_id = %ctx.teilnehmer_id, "Schluesselmaterial persistiert")
        }
        Ok(false) => {}
        Err(e) => {
            tracing::debug!(teilnehmer_id = %ctx.teilnehmer_id, fehler = %e, "Keine Schluessel-Ableitung")
        }
    }

    SignalMessage::antwort(seq, SignalPayload::KeyExchangeResponse { ciphertext })
}
