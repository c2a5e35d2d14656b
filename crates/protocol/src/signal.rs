//! Signalisierungsprotokoll (TCP/TLS)
//!
//! Definiert alle Steuerungsnachrichten die ueber die TLS-Verbindung
//! zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Tagged Enum: das `type`-Feld bestimmt die Nachrichtenart
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Optionale `seq`-Korrelations-ID im Umschlag: der Client vergibt sie,
//!   der Server kopiert sie in die Antwort. Push-Nachrichten tragen keine.
//!   Clients ohne `seq` sehen das unveraenderte Wire-Format.
//!
//! Einige Tags werden in beide Richtungen verwendet (`media_offer` traegt
//! als Anfrage `target_id`, als Push `from_id`) – die betroffenen Varianten
//! fuehren deshalb beide Felder optional.

use serde::{Deserialize, Serialize};
use visavis_core::types::{RaumId, TeilnehmerId};

// ---------------------------------------------------------------------------
// Info-Strukturen
// ---------------------------------------------------------------------------

/// Raum-Eintrag in der `room_list`-Antwort (Snapshot, keine Live-Sicht)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaumInfo {
    pub id: RaumId,
    pub name: String,
    /// Aktuelle Teilnehmeranzahl
    pub participants: u32,
    pub max_participants: u32,
    pub is_locked: bool,
}

/// Teilnehmer-Eintrag in der `room_joined`-Antwort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeilnehmerInfo {
    pub id: TeilnehmerId,
    pub username: String,
    pub audio_enabled: bool,
    pub video_enabled: bool,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: SignalPayload
// ---------------------------------------------------------------------------

/// Alle Signalisierungsnachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalPayload {
    // -----------------------------------------------------------------------
    // Client -> Server
    // -----------------------------------------------------------------------
    /// Anmeldung mit Wunschnamen
    Login { username: String },
    /// Liste aller Raeume anfordern
    ListRooms,
    /// Neuen Raum erstellen
    CreateRoom {
        name: String,
        /// Kapazitaet (Standard: 10 wenn nicht angegeben)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_participants: Option<u32>,
    },
    /// Einem Raum beitreten
    JoinRoom { room_id: RaumId, username: String },
    /// Aktuellen Raum verlassen
    LeaveRoom,
    /// Raum-Chat-Nachricht senden
    SendMessage { content: String },
    /// Key-Exchange-Bytes an das Media-Subsystem routen
    KeyExchangeInit { public_key: Vec<u8> },

    // -----------------------------------------------------------------------
    // Bidirektional (Anfrage traegt target_id, Push traegt from_id)
    // -----------------------------------------------------------------------
    /// SDP-Offer an einen Teilnehmer im selben Raum
    MediaOffer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<TeilnehmerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_id: Option<TeilnehmerId>,
        sdp: String,
    },
    /// SDP-Answer an einen Teilnehmer im selben Raum
    MediaAnswer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<TeilnehmerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_id: Option<TeilnehmerId>,
        sdp: String,
    },
    /// ICE-Kandidat an einen Teilnehmer im selben Raum
    IceCandidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<TeilnehmerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_id: Option<TeilnehmerId>,
        candidate: String,
    },
    /// Eigenes Audio an-/abschalten
    ToggleAudio { enabled: bool },
    /// Eigenes Video an-/abschalten
    ToggleVideo { enabled: bool },

    // -----------------------------------------------------------------------
    // Server -> Client: Antworten
    // -----------------------------------------------------------------------
    LoginResponse {
        success: bool,
        participant_id: TeilnehmerId,
        username: String,
    },
    RoomList { rooms: Vec<RaumInfo> },
    RoomCreated {
        success: bool,
        room_id: RaumId,
        room_name: String,
    },
    RoomJoined {
        success: bool,
        room_id: RaumId,
        room_name: String,
        participants: Vec<TeilnehmerInfo>,
    },
    RoomLeft { success: bool },
    OfferSent { success: bool },
    AnswerSent { success: bool },
    CandidateSent { success: bool },
    MessageSent { success: bool },
    KeyExchangeResponse { ciphertext: Vec<u8> },

    // -----------------------------------------------------------------------
    // Bidirektional: Toggle-Bestaetigung (success) und Raum-Push (participant_id)
    // -----------------------------------------------------------------------
    AudioToggled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        success: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant_id: Option<TeilnehmerId>,
        enabled: bool,
    },
    VideoToggled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        success: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant_id: Option<TeilnehmerId>,
        enabled: bool,
    },

    // -----------------------------------------------------------------------
    // Server -> Client: Push-Benachrichtigungen
    // -----------------------------------------------------------------------
    ParticipantJoined {
        participant_id: TeilnehmerId,
        username: String,
    },
    ParticipantLeft { participant_id: TeilnehmerId },
    ChatMessage {
        from_id: TeilnehmerId,
        username: String,
        content: String,
        /// Unix-Timestamp in Sekunden
        timestamp: u64,
    },

    // -----------------------------------------------------------------------
    // Fehler
    // -----------------------------------------------------------------------
    Error { error: String, success: bool },
}

// ---------------------------------------------------------------------------
// SignalMessage (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Signalisierungsnachricht mit optionaler Korrelations-ID
///
/// Die `seq` vergibt der Client; der Server kopiert sie in die Antwort,
/// damit der Client Anfrage und Antwort auch dann zuordnen kann, wenn
/// Push-Nachrichten dazwischen eintreffen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Korrelations-ID (None bei Push-Nachrichten und Alt-Clients)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
    /// Inhalt der Nachricht
    #[serde(flatten)]
    pub payload: SignalPayload,
}

impl SignalMessage {
    /// Erstellt eine Nachricht ohne Korrelations-ID (Push-Pfad)
    pub fn neu(payload: SignalPayload) -> Self {
        Self { seq: None, payload }
    }

    /// Erstellt eine Antwort die die Korrelations-ID der Anfrage spiegelt
    pub fn antwort(seq: Option<u32>, payload: SignalPayload) -> Self {
        Self { seq, payload }
    }

    /// Erstellt eine Fehler-Antwort
    pub fn fehler(seq: Option<u32>, message: impl Into<String>) -> Self {
        Self::antwort(
            seq,
            SignalPayload::Error {
                error: message.into(),
                success: false,
            },
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
