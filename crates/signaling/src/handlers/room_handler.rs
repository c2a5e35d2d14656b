//! Raum-Handler – List, Create, Join, Leave
//!
//! Raum-Erstellung legt im selben Zug die Media-Session an (1:1-Kopplung).
//! Die Registries werden nie ineinander verschachtelt aufgerufen – erst
//! endet der kritische Abschnitt der Raum-Registry, dann beginnt der der
//! Media-Registry.

use visavis_core::types::{RaumId, SessionId};
use visavis_protocol::signal::{SignalMessage, SignalPayload};
use visavis_rooms::Teilnehmer;

use crate::dispatcher::{VerbindungsKontext, VerbindungsZustand};
use crate::server_state::SignalingState;

/// Verarbeitet eine Raum-Listen-Anfrage
pub fn handle_list_rooms(seq: Option<u32>, state: &SignalingState) -> SignalMessage {
    SignalMessage::antwort(
        seq,
        SignalPayload::RoomList {
            rooms: state.raeume.raeume_auflisten(),
        },
    )
}

/// Verarbeitet eine Raum-Erstellung
///
/// Erfordert keine Raum-Mitgliedschaft, nur eine gueltige Teilnehmer-ID.
pub fn handle_create_room(
    name: String,
    max_participants: Option<u32>,
    seq: Option<u32>,
    state: &SignalingState,
) -> SignalMessage {
    let name = name.trim().to_string();
    if name.is_empty() {
        return SignalMessage::fehler(seq, "Raumname erforderlich");
    }

    let kapazitaet = max_participants.unwrap_or(state.konfig.standard_max_teilnehmer);
    let info = state.raeume.raum_erstellen(&name, Some(kapazitaet));

    // Media-Session 1:1 zum Raum anlegen
    state
        .media
        .session_erstellen(SessionId::from(info.id), info.id);

    SignalMessage::antwort(
        seq,
        SignalPayload::RoomCreated {
            success: true,
            room_id: info.id,
            room_name: info.name,
        },
    )
}

/// Verarbeitet einen Raum-Beitritt
///
/// Bei Erfolg wechselt die Verbindung nach `ImRaum` und der Rest des Raums
/// bekommt `participant_joined` (ohne den Beitretenden). Bei Fehlschlag
/// bleibt der Verbindungszustand unveraendert.
pub fn handle_join_room(
    room_id: RaumId,
    username: String,
    seq: Option<u32>,
    ctx: &mut VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    let username = {
        let gewaehlt = username.trim().to_string();
        if gewaehlt.is_empty() {
            ctx.anzeigename()
        } else {
            gewaehlt
        }
    };

    let teilnehmer = Teilnehmer::neu(
        ctx.teilnehmer_id,
        username.clone(),
        ctx.sende_tx.clone(),
        ctx.peer_addr,
    );

    match state.raeume.raum_beitreten(&room_id, teilnehmer) {
        Ok(info) => {
            ctx.username = Some(username.clone());
            ctx.zustand = VerbindungsZustand::ImRaum;

            let push = SignalMessage::neu(SignalPayload::ParticipantJoined {
                participant_id: ctx.teilnehmer_id,
                username,
            });
            state
                .raeume
                .an_raum_senden(&room_id, &push, Some(&ctx.teilnehmer_id));

            SignalMessage::antwort(
                seq,
                SignalPayload::RoomJoined {
                    success: true,
                    room_id: info.raum_id,
                    room_name: info.raum_name,
                    participants: info.teilnehmer,
                },
            )
        }
        Err(e) => {
            tracing::warn!(
                teilnehmer_id = %ctx.teilnehmer_id,
                raum_id = %room_id,
                fehler = %e,
                "Raum-Beitritt fehlgeschlagen"
            );
            SignalMessage::fehler(seq, e.to_string())
        }
    }
}

/// Verarbeitet das Verlassen des aktuellen Raums
///
/// Nur gueltig mit bekanntem aktuellem Raum; idempotent auf Registry-Ebene.
pub fn handle_leave_room(
    seq: Option<u32>,
    ctx: &mut VerbindungsKontext,
    state: &SignalingState,
) -> SignalMessage {
    match state.raeume.raum_verlassen(&ctx.teilnehmer_id) {
        Some(raum_id) => {
            ctx.zustand = VerbindungsZustand::Angemeldet;

            let push = SignalMessage::neu(SignalPayload::ParticipantLeft {
                participant_id: ctx.teilnehmer_id,
            });
            state.raeume.an_raum_senden(&raum_id, &push, None);

            // Media-Endpunkt der Session des Raums aufraeumen
            state
                .media
                .endpunkt_entfernen(&SessionId::from(raum_id), &ctx.teilnehmer_id);

            SignalMessage::antwort(seq, SignalPayload::RoomLeft { success: true })
        }
        None => SignalMessage::fehler(seq, "Nicht in einem Raum"),
    }
}
