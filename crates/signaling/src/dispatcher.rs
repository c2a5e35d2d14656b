//! Message-Dispatcher – Routet SignalMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt geparste Nachrichten von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt genau eine Antwort zurueck. Die
//! Verarbeitung ist synchron: erst wenn die Antwort geschrieben ist, liest
//! die Verbindung den naechsten Frame (kein Pipelining pro Verbindung).
//!
//! ## State Machine
//! ```text
//! Verbunden -> Angemeldet -> ImRaum
//!     ^            ^            |
//!     |            +-- leave ---+
//!     +------ Trennung ---------+
//! ```
//!
//! Vor dem Login ist nur `login` sinnvoll; `list_rooms` und `create_room`
//! brauchen lediglich eine gueltige Teilnehmer-ID (die beim Verbindungs-
//! aufbau entsteht) und funktionieren deshalb in jedem Zustand. Media-
//! und Toggle-Nachrichten verlangen Raum-Mitgliedschaft.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use visavis_core::types::{SessionId, TeilnehmerId};
use visavis_protocol::signal::{SignalMessage, SignalPayload};

use crate::handlers::{auth_handler, chat_handler, media_handler, room_handler};
use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Zustand einer Client-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Verbunden, noch nicht angemeldet
    Verbunden,
    /// Angemeldet, in keinem Raum
    Angemeldet,
    /// Angemeldet und Mitglied eines Raums
    ImRaum,
}

/// Kontext der aktuellen Verbindung
///
/// Die Teilnehmer-ID entsteht beim Verbindungsaufbau (vor dem Login) und
/// bleibt fuer die Lebensdauer der Verbindung stabil.
pub struct VerbindungsKontext {
    pub teilnehmer_id: TeilnehmerId,
    pub peer_addr: SocketAddr,
    /// Gewaehlter Username (None vor dem Login)
    pub username: Option<String>,
    pub zustand: VerbindungsZustand,
    /// Sende-Queue der Verbindung – wandert beim Raum-Beitritt als
    /// Verbindungs-Handle in den Teilnehmer-Eintrag der Registry
    pub sende_tx: mpsc::Sender<SignalMessage>,
}

impl VerbindungsKontext {
    /// Erstellt einen frischen Kontext fuer eine akzeptierte Verbindung
    pub fn neu(peer_addr: SocketAddr, sende_tx: mpsc::Sender<SignalMessage>) -> Self {
        Self {
            teilnehmer_id: TeilnehmerId::neu(),
            peer_addr,
            username: None,
            zustand: VerbindungsZustand::Verbunden,
            sende_tx,
        }
    }

    /// Username oder generierter Platzhalter ("User-xxxxxxxx")
    pub fn anzeigename(&self) -> String {
        match &self.username {
            Some(name) => name.clone(),
            None => {
                let id = self.teilnehmer_id.inner().simple().to_string();
                format!("User-{}", &id[..8])
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MessageDispatcher
// ---------------------------------------------------------------------------

/// Zentraler Message-Dispatcher
///
/// Routet eingehende SignalMessages an die entsprechenden Handler und
/// gibt die Antwort-SignalMessage zurueck (die `seq` der Anfrage wird
/// gespiegelt).
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende SignalMessage und gibt die Antwort zurueck
    pub fn dispatch(
        &self,
        nachricht: SignalMessage,
        ctx: &mut VerbindungsKontext,
    ) -> SignalMessage {
        let seq = nachricht.seq;

        match nachricht.payload {
            // ---------------------------------------------------------------
            // Auth
            // ---------------------------------------------------------------
            SignalPayload::Login { username } => {
                auth_handler::handle_login(username, seq, ctx, &self.state)
            }

            // ---------------------------------------------------------------
            // Raum-Nachrichten
            // ---------------------------------------------------------------
            SignalPayload::ListRooms => room_handler::handle_list_rooms(seq, &self.state),

            SignalPayload::CreateRoom {
                name,
                max_participants,
            } => room_handler::handle_create_room(name, max_participants, seq, &self.state),

            SignalPayload::JoinRoom { room_id, username } => {
                room_handler::handle_join_room(room_id, username, seq, ctx, &self.state)
            }

            SignalPayload::LeaveRoom => room_handler::handle_leave_room(seq, ctx, &self.state),

            // ---------------------------------------------------------------
            // Media-Verhandlung (nur ImRaum; Payload wird unveraendert
            // an das Ziel weitergereicht)
            // ---------------------------------------------------------------
            SignalPayload::MediaOffer { target_id, sdp, .. } => {
                media_handler::handle_media_offer(target_id, sdp, seq, ctx, &self.state)
            }

            SignalPayload::MediaAnswer { target_id, sdp, .. } => {
                media_handler::handle_media_answer(target_id, sdp, seq, ctx, &self.state)
            }

            SignalPayload::IceCandidate {
                target_id,
                candidate,
                ..
            } => media_handler::handle_ice_candidate(target_id, candidate, seq, ctx, &self.state),

            SignalPayload::ToggleAudio { enabled } => {
                media_handler::handle_toggle_audio(enabled, seq, ctx, &self.state)
            }

            SignalPayload::ToggleVideo { enabled } => {
                media_handler::handle_toggle_video(enabled, seq, ctx, &self.state)
            }

            SignalPayload::KeyExchangeInit { public_key } => {
                media_handler::handle_key_exchange_init(public_key, seq, ctx, &self.state)
            }

            // ---------------------------------------------------------------
            // Chat
            // ---------------------------------------------------------------
            SignalPayload::SendMessage { content } => {
                chat_handler::handle_send_message(content, seq, ctx, &self.state)
            }

            // ---------------------------------------------------------------
            // Unerwartete Server->Client Nachrichten vom Client
            // ---------------------------------------------------------------
            SignalPayload::LoginResponse { .. }
            | SignalPayload::RoomList { .. }
            | SignalPayload::RoomCreated { .. }
            | SignalPayload::RoomJoined { .. }
            | SignalPayload::RoomLeft { .. }
            | SignalPayload::OfferSent { .. }
            | SignalPayload::AnswerSent { .. }
            | SignalPayload::CandidateSent { .. }
            | SignalPayload::MessageSent { .. }
            | SignalPayload::KeyExchangeResponse { .. }
            | SignalPayload::AudioToggled { .. }
            | SignalPayload::VideoToggled { .. }
            | SignalPayload::ParticipantJoined { .. }
            | SignalPayload::ParticipantLeft { .. }
            | SignalPayload::ChatMessage { .. }
            | SignalPayload::Error { .. } => {
                tracing::warn!(
                    teilnehmer_id = %ctx.teilnehmer_id,
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
                SignalMessage::fehler(seq, "Unerwartete Nachricht")
            }
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Dies ist der einzige Cleanup-Pfad fuer Teilnehmer: war der Client in
    /// einem Raum, wird er ausgetragen, `participant_left` an den Rest des
    /// Raums verteilt und sein Media-Endpunkt entfernt.
    pub fn verbindung_beenden(&self, ctx: &VerbindungsKontext) {
        if let Some(raum_id) = self.state.raeume.raum_verlassen(&ctx.teilnehmer_id) {
            let push = SignalMessage::neu(SignalPayload::ParticipantLeft {
                participant_id: ctx.teilnehmer_id,
            });
            self.state.raeume.an_raum_senden(&raum_id, &push, None);
            self.state
                .media
                .endpunkt_entfernen(&SessionId::from(raum_id), &ctx.teilnehmer_id);
        }

        tracing::debug!(
            teilnehmer_id = %ctx.teilnehmer_id,
            "Verbindungs-Ressourcen bereinigt"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingKonfig;
    use std::net::{IpAddr, Ipv4Addr};
    use visavis_core::types::RaumId;
    use visavis_media::MediaSessionRegistry;
    use visavis_rooms::RaumRegistry;

    fn test_state() -> Arc<SignalingState> {
        SignalingState::neu(
            SignalingKonfig::default(),
            Arc::new(RaumRegistry::neu()),
            Arc::new(MediaSessionRegistry::neu()),
        )
    }

    fn test_ctx() -> (VerbindungsKontext, mpsc::Receiver<SignalMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 47000);
        (VerbindungsKontext::neu(addr, tx), rx)
    }

    fn anfrage(seq: u32, payload: SignalPayload) -> SignalMessage {
        SignalMessage::antwort(Some(seq), payload)
    }

    /// Meldet an, erstellt einen Raum und tritt ihm bei
    fn raum_mit_mitglied(
        dispatcher: &MessageDispatcher,
        ctx: &mut VerbindungsKontext,
        name: &str,
        username: &str,
    ) -> RaumId {
        dispatcher.dispatch(
            anfrage(1, SignalPayload::Login {
                username: username.to_string(),
            }),
            ctx,
        );
        let antwort = dispatcher.dispatch(
            anfrage(2, SignalPayload::CreateRoom {
                name: name.to_string(),
                max_participants: None,
            }),
            ctx,
        );
        let raum_id = match antwort.payload {
            SignalPayload::RoomCreated { room_id, .. } => room_id,
            other => panic!("Erwartet RoomCreated, bekam {:?}", other),
        };
        let antwort = dispatcher.dispatch(
            anfrage(3, SignalPayload::JoinRoom {
                room_id: raum_id,
                username: username.to_string(),
            }),
            ctx,
        );
        assert!(matches!(
            antwort.payload,
            SignalPayload::RoomJoined { success: true, .. }
        ));
        raum_id
    }

    #[test]
    fn login_wechselt_zustand_und_spiegelt_seq() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = test_ctx();

        let antwort = dispatcher.dispatch(
            anfrage(7, SignalPayload::Login {
                username: "alice".to_string(),
            }),
            &mut ctx,
        );

        assert_eq!(antwort.seq, Some(7));
        assert_eq!(ctx.zustand, VerbindungsZustand::Angemeldet);
        if let SignalPayload::LoginResponse {
            success,
            participant_id,
            username,
        } = antwort.payload
        {
            assert!(success);
            assert_eq!(participant_id, ctx.teilnehmer_id);
            assert_eq!(username, "alice");
        } else {
            panic!("Erwartet LoginResponse");
        }
    }

    #[test]
    fn login_ohne_username_laesst_zustand_unveraendert() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);
        let (mut ctx, _rx) = test_ctx();

        let antwort = dispatcher.dispatch(
            anfrage(1, SignalPayload::Login {
                username: "  ".to_string(),
            }),
            &mut ctx,
        );

        assert!(matches!(
            antwort.payload,
            SignalPayload::Error { success: false, .. }
        ));
        assert_eq!(ctx.zustand, VerbindungsZustand::Verbunden);
    }

    #[test]
    fn create_room_erzeugt_media_session() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = test_ctx();

        let antwort = dispatcher.dispatch(
            anfrage(1, SignalPayload::CreateRoom {
                name: "Lobby".to_string(),
                max_participants: Some(4),
            }),
            &mut ctx,
        );

        let raum_id = match antwort.payload {
            SignalPayload::RoomCreated {
                success: true,
                room_id,
                room_name,
            } => {
                assert_eq!(room_name, "Lobby");
                room_id
            }
            other => panic!("Erwartet RoomCreated, bekam {:?}", other),
        };

        // Session 1:1 zum Raum
        let session = state
            .media
            .session_holen(&SessionId::from(raum_id))
            .expect("Media-Session erwartet");
        assert_eq!(session.raum_id, raum_id);
    }

    #[test]
    fn join_in_unbekannten_raum_laesst_zustand_unveraendert() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);
        let (mut ctx, _rx) = test_ctx();

        dispatcher.dispatch(
            anfrage(1, SignalPayload::Login {
                username: "bob".to_string(),
            }),
            &mut ctx,
        );
        let antwort = dispatcher.dispatch(
            anfrage(2, SignalPayload::JoinRoom {
                room_id: RaumId::neu(),
                username: "bob".to_string(),
            }),
            &mut ctx,
        );

        assert!(matches!(
            antwort.payload,
            SignalPayload::Error { success: false, .. }
        ));
        assert_eq!(ctx.zustand, VerbindungsZustand::Angemeldet);
    }

    #[test]
    fn join_und_leave_state_machine() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);
        let (mut ctx, _rx) = test_ctx();

        raum_mit_mitglied(&dispatcher, &mut ctx, "Treffen", "carol");
        assert_eq!(ctx.zustand, VerbindungsZustand::ImRaum);

        let antwort = dispatcher.dispatch(anfrage(4, SignalPayload::LeaveRoom), &mut ctx);
        assert!(matches!(
            antwort.payload,
            SignalPayload::RoomLeft { success: true }
        ));
        assert_eq!(ctx.zustand, VerbindungsZustand::Angemeldet);

        // Zweites Verlassen: Fehler, Zustand bleibt
        let antwort = dispatcher.dispatch(anfrage(5, SignalPayload::LeaveRoom), &mut ctx);
        assert!(matches!(
            antwort.payload,
            SignalPayload::Error { success: false, .. }
        ));
        assert_eq!(ctx.zustand, VerbindungsZustand::Angemeldet);
    }

    #[test]
    fn media_offer_erfordert_raum_mitgliedschaft() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);
        let (mut ctx, _rx) = test_ctx();

        let antwort = dispatcher.dispatch(
            anfrage(1, SignalPayload::MediaOffer {
                target_id: Some(TeilnehmerId::neu()),
                from_id: None,
                sdp: "v=0".to_string(),
            }),
            &mut ctx,
        );
        assert!(matches!(
            antwort.payload,
            SignalPayload::Error { success: false, .. }
        ));
    }

    #[test]
    fn media_offer_wird_verbatim_weitergeleitet() {
        // Szenario: A und B im selben Raum; A schickt media_offer an B.
        // B bekommt den Push mit from_id=A und identischem SDP, A die
        // Bestaetigung.
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);

        let (mut ctx_a, _rx_a) = test_ctx();
        let (mut ctx_b, mut rx_b) = test_ctx();

        let raum_id = raum_mit_mitglied(&dispatcher, &mut ctx_a, "Duo", "a");
        dispatcher.dispatch(
            anfrage(1, SignalPayload::Login {
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );
        dispatcher.dispatch(
            anfrage(2, SignalPayload::JoinRoom {
                room_id: raum_id,
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );
        // B hat einen participant_joined-Push an A ausgeloest – hier
        // interessiert nur der Offer-Pfad
        let _ = rx_b.try_recv();

        let antwort = dispatcher.dispatch(
            anfrage(9, SignalPayload::MediaOffer {
                target_id: Some(ctx_b.teilnehmer_id),
                from_id: None,
                sdp: "v=0...".to_string(),
            }),
            &mut ctx_a,
        );
        assert!(matches!(
            antwort.payload,
            SignalPayload::OfferSent { success: true }
        ));

        let push = rx_b.try_recv().expect("B muss den Offer-Push erhalten");
        assert_eq!(push.seq, None, "Pushes tragen keine seq");
        if let SignalPayload::MediaOffer { from_id, sdp, target_id } = push.payload {
            assert_eq!(from_id, Some(ctx_a.teilnehmer_id));
            assert_eq!(target_id, None);
            assert_eq!(sdp, "v=0...");
        } else {
            panic!("Erwartet MediaOffer-Push");
        }
    }

    #[test]
    fn media_offer_an_fremden_teilnehmer_schlaegt_fehl() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);
        let (mut ctx, _rx) = test_ctx();

        raum_mit_mitglied(&dispatcher, &mut ctx, "Allein", "solo");

        let antwort = dispatcher.dispatch(
            anfrage(9, SignalPayload::MediaOffer {
                target_id: Some(TeilnehmerId::neu()),
                from_id: None,
                sdp: "v=0".to_string(),
            }),
            &mut ctx,
        );
        assert!(matches!(
            antwort.payload,
            SignalPayload::Error { success: false, .. }
        ));
    }

    #[test]
    fn toggle_audio_bestaetigt_und_broadcastet() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);

        let (mut ctx_a, mut rx_a) = test_ctx();
        let (mut ctx_b, _rx_b) = test_ctx();

        let raum_id = raum_mit_mitglied(&dispatcher, &mut ctx_a, "Stumm", "a");
        dispatcher.dispatch(
            anfrage(1, SignalPayload::Login {
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );
        dispatcher.dispatch(
            anfrage(2, SignalPayload::JoinRoom {
                room_id: raum_id,
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );

        let antwort = dispatcher.dispatch(
            anfrage(5, SignalPayload::ToggleAudio { enabled: false }),
            &mut ctx_b,
        );
        if let SignalPayload::AudioToggled {
            success, enabled, ..
        } = antwort.payload
        {
            assert_eq!(success, Some(true));
            assert!(!enabled);
        } else {
            panic!("Erwartet AudioToggled-Bestaetigung");
        }

        // A sieht erst Bs participant_joined, dann den Toggle-Push
        let mut gesehen = false;
        while let Ok(push) = rx_a.try_recv() {
            if let SignalPayload::AudioToggled {
                participant_id,
                enabled,
                success,
            } = push.payload
            {
                assert_eq!(participant_id, Some(ctx_b.teilnehmer_id));
                assert_eq!(success, None);
                assert!(!enabled);
                gesehen = true;
            }
        }
        assert!(gesehen, "A muss den Toggle-Push sehen");
    }

    #[test]
    fn verbindung_beenden_raeumt_auf_und_broadcastet() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));

        let (mut ctx_a, _rx_a) = test_ctx();
        let (mut ctx_b, mut rx_b) = test_ctx();

        let raum_id = raum_mit_mitglied(&dispatcher, &mut ctx_a, "Abschied", "a");
        dispatcher.dispatch(
            anfrage(1, SignalPayload::Login {
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );
        dispatcher.dispatch(
            anfrage(2, SignalPayload::JoinRoom {
                room_id: raum_id,
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );

        dispatcher.verbindung_beenden(&ctx_a);

        // A ist raus, der Raum besteht weiter
        assert_eq!(state.raeume.raum_von_teilnehmer(&ctx_a.teilnehmer_id), None);
        assert_eq!(state.raeume.raum_holen(&raum_id).unwrap().participants, 1);

        // B bekommt participant_left
        let mut gesehen = false;
        while let Ok(push) = rx_b.try_recv() {
            if let SignalPayload::ParticipantLeft { participant_id } = push.payload {
                assert_eq!(participant_id, ctx_a.teilnehmer_id);
                gesehen = true;
            }
        }
        assert!(gesehen, "B muss participant_left sehen");

        // Zweiter Cleanup ist ein No-op
        dispatcher.verbindung_beenden(&ctx_a);
    }

    #[test]
    fn key_exchange_init_mit_stub() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);
        let (mut ctx, _rx) = test_ctx();

        raum_mit_mitglied(&dispatcher, &mut ctx, "Krypto", "k");

        let antwort = dispatcher.dispatch(
            anfrage(9, SignalPayload::KeyExchangeInit {
                public_key: vec![1, 2, 3],
            }),
            &mut ctx,
        );
        if let SignalPayload::KeyExchangeResponse { ciphertext } = antwort.payload {
            assert!(ciphertext.is_empty(), "Stub antwortet mit leeren Bytes");
        } else {
            panic!("Erwartet KeyExchangeResponse, bekam {:?}", antwort.payload);
        }
    }

    #[test]
    fn chat_nachricht_erreicht_den_raum() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);

        let (mut ctx_a, _rx_a) = test_ctx();
        let (mut ctx_b, mut rx_b) = test_ctx();

        let raum_id = raum_mit_mitglied(&dispatcher, &mut ctx_a, "Plausch", "a");
        dispatcher.dispatch(
            anfrage(1, SignalPayload::Login {
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );
        dispatcher.dispatch(
            anfrage(2, SignalPayload::JoinRoom {
                room_id: raum_id,
                username: "b".to_string(),
            }),
            &mut ctx_b,
        );
        let _ = rx_b.try_recv(); // participant_joined von B selbst faellt weg

        let antwort = dispatcher.dispatch(
            anfrage(3, SignalPayload::SendMessage {
                content: "Hallo zusammen".to_string(),
            }),
            &mut ctx_a,
        );
        assert!(matches!(
            antwort.payload,
            SignalPayload::MessageSent { success: true }
        ));

        let push = rx_b.try_recv().expect("B muss die Chat-Nachricht sehen");
        if let SignalPayload::ChatMessage {
            from_id,
            username,
            content,
            ..
        } = push.payload
        {
            assert_eq!(from_id, ctx_a.teilnehmer_id);
            assert_eq!(username, "a");
            assert_eq!(content, "Hallo zusammen");
        } else {
            panic!("Erwartet ChatMessage-Push");
        }
    }
}
