//! Frame classification
//!
//! Wraps the WebRTC-style detector from `earshot` behind a small trait so
//! the segmenter can be driven by a deterministic classifier in tests. The
//! detector runs at its most aggressive profile to keep background noise
//! from counting as speech.

use earshot::{VoiceActivityDetector, VoiceActivityProfile};

use super::FRAME_SAMPLES;

/// Per-frame classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLabel {
    Speech,
    Silence,
}

/// Classifies one 30 ms 16 kHz mono frame at a time
pub trait VadEngine: Send {
    fn classify(&mut self, frame: &[i16]) -> FrameLabel;
}

/// `earshot`-backed classifier, fixed at the most aggressive profile
pub struct EarshotVad {
    detector: VoiceActivityDetector,
}

impl EarshotVad {
    #[must_use]
    pub fn new() -> Self {
        Self {
            detector: VoiceActivityDetector::new(VoiceActivityProfile::VERY_AGGRESSIVE),
        }
    }
}

impl Default for EarshotVad {
    fn default() -> Self {
        Self::new()
    }
}

impl VadEngine for EarshotVad {
    fn classify(&mut self, frame: &[i16]) -> FrameLabel {
        debug_assert_eq!(frame.len(), FRAME_SAMPLES);
        match self.detector.predict_16khz(frame) {
            Ok(true) => FrameLabel::Speech,
            Ok(false) => FrameLabel::Silence,
            Err(e) => {
                tracing::trace!(error = ?e, "vad rejected frame, treating as silence");
                FrameLabel::Silence
            }
        }
    }
}

/// Convert one capture sample from f32 `[-1.0, 1.0]` to i16 PCM
#[allow(clippy::cast_possible_truncation)]
pub(super) fn sample_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
