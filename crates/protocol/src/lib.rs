//! visavis-protocol – Wire-Format des Signalisierungsprotokolls
//!
//! Drei Bausteine:
//! - [`signal`]: die JSON-Signalisierungsnachrichten (Tagged Enum)
//! - [`wire`]: Frame-Codec (Laengenpraefix + JSON) fuer TCP/TLS
//! - [`media`]: der binaere 12-Byte-Header der Media-Pakete (UDP-Grenze)

pub mod media;
pub mod signal;
pub mod wire;

// Bequeme Re-Exporte
pub use signal::{RaumInfo, SignalMessage, SignalPayload, TeilnehmerInfo};
pub use wire::{FrameCodec, DEFAULT_MAX_FRAME_SIZE};
