//! visavis-rooms – Raum- und Teilnehmer-Registry
//!
//! Der autoritative, nebenlaeufigkeitssichere Store fuer Raeume und
//! Mitgliedschaften. Raum-Map und Teilnehmer->Raum-Reverse-Index liegen
//! unter EINEM Mutex, damit kein anderer Thread je einen inkonsistenten
//! Zwischenzustand beobachten kann.

pub mod error;
pub mod raum;
pub mod registry;

// Bequeme Re-Exporte
pub use error::{RegistryError, RegistryResult};
pub use raum::{Raum, Teilnehmer, STANDARD_MAX_TEILNEHMER};
pub use registry::{BeitrittsInfo, RaumRegistry};
