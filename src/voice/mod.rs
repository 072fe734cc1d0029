//! Voice processing module
//!
//! Handles microphone capture, utterance segmentation, speech-to-text,
//! text-to-speech, and playback.

mod capture;
mod playback;
mod segmenter;
mod stt;
mod tts;
mod vad;

pub use capture::{
    CancelToken, CaptureHandle, input_device_names, output_device_names, samples_to_wav, start,
};
pub use playback::AudioPlayback;
pub use segmenter::{SegmentBuffer, SegmentStatus, VoiceActivitySegmenter};
pub use stt::{SpeechToText, Transcriber};
pub use tts::{Synthesizer, TextToSpeech};
pub use vad::{EarshotVad, FrameLabel, VadEngine};

/// Sample rate for capture (16 kHz for speech)
pub const SAMPLE_RATE: u32 = 16_000;

/// Duration of one VAD frame in milliseconds
pub const FRAME_DURATION_MS: u64 = 30;

/// Samples per 30 ms mono frame at 16 kHz
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const FRAME_SAMPLES: usize = (SAMPLE_RATE as u64 * FRAME_DURATION_MS / 1000) as usize;
