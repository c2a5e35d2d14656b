//! Client-Connection – Verwaltet eine einzelne TLS-Verbindung
//!
//! Jede akzeptierte Verbindung bekommt eine `ClientConnection` in einem
//! eigenen tokio-Task. Die Teilnehmer-ID wird hier, beim Verbindungsaufbau,
//! vergeben – vor dem Login.
//!
//! ## Ablauf
//! - Anfragen werden strikt sequenziell verarbeitet: ein Frame lesen,
//!   dispatchen, genau eine Antwort schreiben, dann erst weiterlesen
//!   (kein Pipelining pro Verbindung).
//! - Push-Nachrichten anderer Verbindungen laufen ueber die eigene
//!   Sende-Queue und werden zwischen Anfragen eingeschoben.
//! - Ungueltiges JSON: Fehler-Antwort, Verbindung bleibt offen.
//! - Framing-Fehler (zu grosses Frame), Lesefehler, Peer-Trennung:
//!   verbindungsfatal. Der Teardown traegt den Teilnehmer aus seinem Raum
//!   aus und verteilt `participant_left` – es gibt keinen Idle-Timeout,
//!   dies ist der einzige Cleanup-Pfad.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;

use visavis_protocol::signal::SignalMessage;
use visavis_protocol::wire::FrameCodec;

use crate::dispatcher::{MessageDispatcher, VerbindungsKontext};
use crate::server_state::SignalingState;

/// Groesse der Sende-Queue pro Verbindung
const SENDE_QUEUE_GROESSE: usize = 64;

/// Verarbeitet eine einzelne Client-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an den `MessageDispatcher` und
/// schreibt Antworten zurueck. Laeuft in einem eigenen tokio-Task.
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder das Shutdown-Signal
    /// eingeht. Das Shutdown-Signal wird an jedem Blockierpunkt beobachtet;
    /// Socket-Schliessung bleibt der Rueckfallweg.
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;
        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::new());

        // Sende-Queue: Broadcasts und gezielte Pushes anderer Verbindungen
        let (sende_tx, mut sende_rx) = mpsc::channel::<SignalMessage>(SENDE_QUEUE_GROESSE);

        let mut ctx = VerbindungsKontext::neu(peer_addr, sende_tx);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        tracing::debug!(
            peer = %peer_addr,
            teilnehmer_id = %ctx.teilnehmer_id,
            "Teilnehmer-ID vergeben"
        );

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(payload)) => {
                            let antwort = match serde_json::from_slice::<SignalMessage>(&payload) {
                                Ok(nachricht) => dispatcher.dispatch(nachricht, &mut ctx),
                                Err(e) => {
                                    // Behebbar: Fehler-Antwort, Verbindung bleibt offen
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %e,
                                        "Ungueltige Nachricht"
                                    );
                                    SignalMessage::fehler(None, "Ungueltige Nachricht")
                                }
                            };

                            if let Err(e) = framed.send(antwort).await {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    fehler = %e,
                                    "Senden fehlgeschlagen"
                                );
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            // Framing-Fehler (z.B. zu grosses Frame): fatal,
                            // keine Antwort
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Frame-Lesefehler – Verbindung wird getrennt"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Push-Nachricht aus der Sende-Queue
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler = %e,
                            "Push-Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Einziger Cleanup-Pfad: Raum verlassen, participant_left verteilen,
        // Media-Endpunkt entfernen
        dispatcher.verbindung_beenden(&ctx);

        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
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
    use tokio::io::AsyncWriteExt;
    use visavis_media::MediaSessionRegistry;
    use visavis_protocol::signal::SignalPayload;
    use visavis_protocol::wire::{read_frame, write_frame, DEFAULT_MAX_FRAME_SIZE};
    use visavis_rooms::RaumRegistry;

    fn test_state() -> Arc<SignalingState> {
        SignalingState::neu(
            SignalingKonfig::default(),
            Arc::new(RaumRegistry::neu()),
            Arc::new(MediaSessionRegistry::neu()),
        )
    }

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 48000)
    }

    /// Startet eine Verbindung ueber ein In-Memory-Duplex und gibt die
    /// Client-Seite zurueck
    fn verbindung_starten(
        state: Arc<SignalingState>,
    ) -> (
        tokio::io::DuplexStream,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let verbindung = ClientConnection::neu(state, test_addr());
        let handle = tokio::spawn(async move {
            verbindung.verarbeiten(server, shutdown_rx).await;
        });
        (client, shutdown_tx, handle)
    }

    #[tokio::test]
    async fn login_request_response() {
        let (mut client, _shutdown_tx, _handle) = verbindung_starten(test_state());

        let anfrage = SignalMessage::antwort(
            Some(1),
            SignalPayload::Login {
                username: "alice".to_string(),
            },
        );
        write_frame(&mut client, &anfrage, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        let antwort = read_frame(&mut client, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        assert_eq!(antwort.seq, Some(1));
        assert!(matches!(
            antwort.payload,
            SignalPayload::LoginResponse { success: true, .. }
        ));
    }

    #[tokio::test]
    async fn ungueltiges_json_haelt_verbindung_offen() {
        let (mut client, _shutdown_tx, _handle) = verbindung_starten(test_state());

        // Kaputtes JSON als korrekt gerahmtes Frame
        let kaputt = b"{nicht json";
        client
            .write_all(&(kaputt.len() as u32).to_be_bytes())
            .await
            .unwrap();
        client.write_all(kaputt).await.unwrap();

        let antwort = read_frame(&mut client, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        assert!(matches!(
            antwort.payload,
            SignalPayload::Error { success: false, .. }
        ));

        // Verbindung lebt noch: normale Anfrage funktioniert weiterhin
        let anfrage = SignalMessage::antwort(Some(2), SignalPayload::ListRooms);
        write_frame(&mut client, &anfrage, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        let antwort = read_frame(&mut client, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        assert!(matches!(antwort.payload, SignalPayload::RoomList { .. }));
    }

    #[tokio::test]
    async fn zu_grosses_frame_beendet_verbindung() {
        let state = test_state();
        let (mut client, _shutdown_tx, handle) = verbindung_starten(Arc::clone(&state));

        // Deklarierte Laenge 2 MiB: verbindungsfatal, keine Antwort
        client
            .write_all(&(2u32 * 1024 * 1024).to_be_bytes())
            .await
            .unwrap();
        client.flush().await.unwrap();

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn teardown_raeumt_raum_mitgliedschaft_auf() {
        let state = test_state();
        let (mut client, _shutdown_tx, handle) = verbindung_starten(Arc::clone(&state));

        // Raum erstellen und beitreten
        write_frame(
            &mut client,
            &SignalMessage::antwort(
                Some(1),
                SignalPayload::CreateRoom {
                    name: "Fluechtig".to_string(),
                    max_participants: None,
                },
            ),
            DEFAULT_MAX_FRAME_SIZE,
        )
        .await
        .unwrap();
        let antwort = read_frame(&mut client, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        let raum_id = match antwort.payload {
            SignalPayload::RoomCreated { room_id, .. } => room_id,
            other => panic!("Erwartet RoomCreated, bekam {:?}", other),
        };

        write_frame(
            &mut client,
            &SignalMessage::antwort(
                Some(2),
                SignalPayload::JoinRoom {
                    room_id: raum_id,
                    username: "kurz".to_string(),
                },
            ),
            DEFAULT_MAX_FRAME_SIZE,
        )
        .await
        .unwrap();
        let _ = read_frame(&mut client, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        assert_eq!(state.raeume.raum_holen(&raum_id).unwrap().participants, 1);

        // Client trennt: Socket-Schliessung ist der Cleanup-Ausloeser
        drop(client);
        handle.await.unwrap();

        assert_eq!(state.raeume.raum_holen(&raum_id).unwrap().participants, 0);
    }

    #[tokio::test]
    async fn shutdown_signal_beendet_verbindung() {
        let (client, shutdown_tx, handle) = verbindung_starten(test_state());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        drop(client);
    }
}
