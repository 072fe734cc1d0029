//! Utterance segmentation
//!
//! Consumes a live stream of 30 ms frames and decides when one utterance
//! has ended: speech frames accumulate, silence frames count toward a
//! threshold, and leading silence before any speech never counts. There is
//! deliberately no maximum-duration cap; a caller that needs one cancels
//! the capture from above.

use super::FRAME_DURATION_MS;
use super::vad::{FrameLabel, VadEngine};

/// Accumulated in-utterance frames
///
/// Pure data structure; frames are stored whole so the sample count stays an
/// exact multiple of the frame size.
#[derive(Debug, Default)]
pub struct SegmentBuffer {
    frames: Vec<Vec<i16>>,
    total_samples: usize,
}

impl SegmentBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: Vec<i16>) {
        self.total_samples += frame.len();
        self.frames.push(frame);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    #[must_use]
    pub fn len_samples(&self) -> usize {
        self.total_samples
    }

    /// Flatten into one contiguous sample vector
    #[must_use]
    pub fn into_samples(self) -> Vec<i16> {
        let mut samples = Vec::with_capacity(self.total_samples);
        for frame in self.frames {
            samples.extend(frame);
        }
        samples
    }
}

/// Whether the segmenter wants more frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    /// Keep feeding frames
    Continue,
    /// Trailing silence reached the threshold; the utterance is complete
    Complete,
}

/// Silence-tail state machine over classified frames
pub struct VoiceActivitySegmenter {
    vad: Box<dyn VadEngine>,
    buffer: SegmentBuffer,
    silent_frames: usize,
    silent_frame_threshold: usize,
}

impl VoiceActivitySegmenter {
    /// Build a segmenter that ends an utterance after `silence_duration_ms`
    /// of continuous post-speech silence
    #[must_use]
    pub fn new(silence_duration_ms: u64, vad: Box<dyn VadEngine>) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let silent_frame_threshold = (silence_duration_ms / FRAME_DURATION_MS).max(1) as usize;
        Self {
            vad,
            buffer: SegmentBuffer::new(),
            silent_frames: 0,
            silent_frame_threshold,
        }
    }

    /// Feed one frame; returns whether the utterance has completed
    pub fn push_frame(&mut self, frame: Vec<i16>) -> SegmentStatus {
        match self.vad.classify(&frame) {
            FrameLabel::Speech => {
                self.buffer.push_frame(frame);
                self.silent_frames = 0;
            }
            FrameLabel::Silence => {
                // Leading silence before any speech never counts toward the
                // end-of-utterance threshold.
                if !self.buffer.is_empty() {
                    self.silent_frames += 1;
                }
                if self.silent_frames >= self.silent_frame_threshold {
                    return SegmentStatus::Complete;
                }
            }
        }
        SegmentStatus::Continue
    }

    /// True once at least one speech frame has been buffered
    #[must_use]
    pub fn has_speech(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Consume the segmenter and yield the buffered utterance samples
    #[must_use]
    pub fn into_samples(self) -> Vec<i16> {
        self.buffer.into_samples()
    }
}
