//! Capture-Grenze (Kollaborator-Schnittstelle)
//!
//! Die A/V-Erfassung laeuft ausserhalb des Kerns und liefert Frames ueber
//! einen Callback. Der Kern behandelt Frames opak – hier stehen nur die
//! Typen des Grenzvertrags, keine Geraetebehandlung.

/// Art eines Media-Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTyp {
    Audio,
    Video,
}

/// Format-Metadaten eines Frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFormat {
    pub media_typ: MediaTyp,
    /// Freitext-Beschreibung der Quelle (z.B. "opus/48000" oder "vp8/640x480")
    pub beschreibung: String,
}

/// Ein roher, zeitgestempelter Frame aus der Capture-Quelle
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub daten: Vec<u8>,
    /// Mikrosekunden seit Epoch
    pub zeitstempel_us: u64,
    pub format: FrameFormat,
}

/// Callback-Senke fuer Capture-Frames
///
/// Die Capture-Quelle ruft `frame_empfangen` aus ihrem eigenen Kontext;
/// Implementierungen duerfen nicht blockieren.
pub trait FrameSenke: Send + Sync {
    fn frame_empfangen(&self, frame: CaptureFrame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn frame_senke_als_callback() {
        struct Zaehler(AtomicUsize);
        impl FrameSenke for Zaehler {
            fn frame_empfangen(&self, _frame: CaptureFrame) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let senke = Arc::new(Zaehler(AtomicUsize::new(0)));
        let frame = CaptureFrame {
            daten: vec![0u8; 160],
            zeitstempel_us: 1_700_000_000_000_000,
            format: FrameFormat {
                media_typ: MediaTyp::Audio,
                beschreibung: "opus/48000".to_string(),
            },
        };

        senke.frame_empfangen(frame.clone());
        senke.frame_empfangen(frame);
        assert_eq!(senke.0.load(Ordering::SeqCst), 2);
    }
}
