//! Utterance segmentation and audio plumbing, hardware-free

use voxchat::voice::{
    CancelToken, FrameLabel, SegmentStatus, VadEngine, VoiceActivitySegmenter, samples_to_wav,
};
use voxchat::voice::{FRAME_SAMPLES, SAMPLE_RATE};

/// Plays back a fixed speech/silence script, one label per frame
struct ScriptedVad {
    labels: Vec<FrameLabel>,
    cursor: usize,
}

impl ScriptedVad {
    fn new(labels: Vec<FrameLabel>) -> Self {
        Self { labels, cursor: 0 }
    }
}

impl VadEngine for ScriptedVad {
    fn classify(&mut self, _frame: &[i16]) -> FrameLabel {
        let label = self.labels.get(self.cursor).copied().unwrap_or(FrameLabel::Silence);
        self.cursor += 1;
        label
    }
}

fn frame(value: i16) -> Vec<i16> {
    vec![value; FRAME_SAMPLES]
}

fn segmenter(script: Vec<FrameLabel>, silence_ms: u64) -> VoiceActivitySegmenter {
    VoiceActivitySegmenter::new(silence_ms, Box::new(ScriptedVad::new(script)))
}

#[test]
fn utterance_ends_only_after_the_configured_silence() {
    use FrameLabel::{Silence, Speech};

    // 900 ms of silence is 30 frames at 30 ms each
    let script: Vec<FrameLabel> = std::iter::repeat_n(Speech, 10)
        .chain(std::iter::repeat_n(Silence, 30))
        .collect();
    let mut seg = segmenter(script, 900);

    for i in 0..39 {
        assert_eq!(seg.push_frame(frame(100)), SegmentStatus::Continue, "frame {i}");
    }
    assert_eq!(seg.push_frame(frame(100)), SegmentStatus::Complete);
}

#[test]
fn leading_silence_never_completes_an_utterance() {
    use FrameLabel::Silence;

    let mut seg = segmenter(vec![Silence; 200], 900);
    for _ in 0..200 {
        assert_eq!(seg.push_frame(frame(0)), SegmentStatus::Continue);
    }
    assert!(!seg.has_speech());
}

#[test]
fn speech_resets_the_silence_countdown() {
    use FrameLabel::{Silence, Speech};

    // 90 ms threshold is 3 silent frames; interleave speech before the third
    let script = vec![
        Speech, Silence, Silence, Speech, Silence, Silence, Silence,
    ];
    let mut seg = segmenter(script, 90);

    for _ in 0..6 {
        assert_eq!(seg.push_frame(frame(100)), SegmentStatus::Continue);
    }
    assert_eq!(seg.push_frame(frame(100)), SegmentStatus::Complete);
}

#[test]
fn only_speech_frames_reach_the_captured_samples() {
    use FrameLabel::{Silence, Speech};

    let script = vec![Speech, Speech, Silence, Silence, Silence];
    let mut seg = segmenter(script, 90);

    seg.push_frame(frame(1));
    seg.push_frame(frame(2));
    seg.push_frame(frame(0));
    seg.push_frame(frame(0));
    seg.push_frame(frame(0));

    let samples = seg.into_samples();
    assert_eq!(samples.len(), 2 * FRAME_SAMPLES);
    assert!(samples[..FRAME_SAMPLES].iter().all(|&s| s == 1));
    assert!(samples[FRAME_SAMPLES..].iter().all(|&s| s == 2));
}

#[test]
fn wav_encoding_is_mono_16khz_pcm() {
    let samples: Vec<i16> = (0..1600).collect();
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), 1600);
}

#[test]
fn cancel_token_reaches_every_clone() {
    let token = CancelToken::new();
    let seen_by_worker = token.clone();

    assert!(!seen_by_worker.is_cancelled());
    token.cancel();
    assert!(seen_by_worker.is_cancelled());
}
