//! Handler fuer alle Signalisierungsnachrichten
//!
//! Jeder Handler ist fuer eine Gruppe von Nachrichtentypen zustaendig und
//! hat Zugriff auf den gemeinsamen SignalingState. Handler sind synchron:
//! Registry-Operationen sind kurze kritische Abschnitte, Zustellung laeuft
//! nicht-blockierend ueber die Sende-Queues.

pub mod auth_handler;
pub mod chat_handler;
pub mod media_handler;
pub mod room_handler;
