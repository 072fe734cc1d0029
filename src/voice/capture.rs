//! Cancellable microphone capture
//!
//! One recording action owns the input device for its whole duration. The
//! cpal stream is built and polled on a dedicated worker thread (cpal
//! streams are not `Send`), frames flow through the segmenter there, and
//! the result comes back over a oneshot channel the caller awaits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate};
use tokio::sync::oneshot;

use crate::{Error, Result};

use super::segmenter::{SegmentStatus, VoiceActivitySegmenter};
use super::vad::{EarshotVad, sample_to_i16};
use super::{FRAME_SAMPLES, SAMPLE_RATE};

/// Poll interval while waiting for the device callback to fill a frame
const FRAME_POLL: Duration = Duration::from_millis(5);

/// Cooperative cancellation flag, observed at frame boundaries
///
/// Not a hard real-time guarantee: a cancel lands between frame processing
/// steps, never mid-frame.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle to one in-flight recording action
pub struct CaptureHandle {
    token: CancelToken,
    rx: oneshot::Receiver<Result<Option<Vec<i16>>>>,
}

impl CaptureHandle {
    #[cfg(test)]
    pub(crate) fn from_parts(
        token: CancelToken,
        rx: oneshot::Receiver<Result<Option<Vec<i16>>>>,
    ) -> Self {
        Self { token, rx }
    }

    /// Token shared with the capture loop
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Request cancellation of the recording; idempotent
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the capture loop to exit and yield its result
    ///
    /// `Ok(Some(samples))` is one complete utterance, `Ok(None)` means the
    /// recording was cancelled and the partial buffer discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the device could not be opened or the
    /// worker died before reporting.
    pub async fn join(self) -> Result<Option<Vec<i16>>> {
        self.rx
            .await
            .map_err(|_| Error::Audio("capture worker exited without a result".to_string()))?
    }
}

/// Start a recording action on a background worker thread
///
/// The worker opens the input device at 16 kHz mono, assembles 30 ms
/// frames from the device callback without overlap or loss, and runs the
/// segmenter until end-of-utterance or cancellation.
#[must_use]
pub fn start(device_index: Option<usize>, silence_duration_ms: u64) -> CaptureHandle {
    let token = CancelToken::new();
    let worker_token = token.clone();
    let (tx, rx) = oneshot::channel();

    let builder = std::thread::Builder::new().name("voxchat-capture".to_string());
    let spawned = builder.spawn(move || {
        let result = capture_utterance(device_index, silence_duration_ms, &worker_token);
        // Receiver may already be gone; nothing useful to do then.
        let _ = tx.send(result);
    });

    if let Err(e) = spawned {
        tracing::error!(error = %e, "failed to spawn capture worker");
    }

    CaptureHandle { token, rx }
}

/// Blocking capture + segmentation loop, run on the worker thread
fn capture_utterance(
    device_index: Option<usize>,
    silence_duration_ms: u64,
    token: &CancelToken,
) -> Result<Option<Vec<i16>>> {
    // A cancel that lands before the device opens is still a clean empty
    // result, not a device error.
    if token.is_cancelled() {
        return Ok(None);
    }

    let device = input_device(device_index)?;

    let supported_config = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(SAMPLE_RATE))
        .config();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = SAMPLE_RATE,
        "recording started"
    );

    let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let callback_buffer = Arc::clone(&buffer);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = callback_buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let mut segmenter = VoiceActivitySegmenter::new(silence_duration_ms, Box::new(EarshotVad::new()));

    loop {
        if token.is_cancelled() {
            tracing::debug!("recording cancelled");
            return Ok(None);
        }

        let frame = next_frame(&buffer);
        match frame {
            Some(frame) => {
                if segmenter.push_frame(frame) == SegmentStatus::Complete {
                    break;
                }
            }
            None => std::thread::sleep(FRAME_POLL),
        }
    }

    drop(stream);

    let samples = segmenter.into_samples();
    tracing::debug!(samples = samples.len(), "utterance captured");
    Ok(Some(samples))
}

/// Drain exactly one 30 ms frame from the shared buffer, if available
fn next_frame(buffer: &Arc<Mutex<Vec<f32>>>) -> Option<Vec<i16>> {
    let mut buf = buffer.lock().ok()?;
    if buf.len() < FRAME_SAMPLES {
        return None;
    }
    Some(buf.drain(..FRAME_SAMPLES).map(sample_to_i16).collect())
}

/// Resolve the input device by enumeration index, or the host default
fn input_device(device_index: Option<usize>) -> Result<Device> {
    let host = cpal::default_host();
    match device_index {
        Some(index) => host
            .input_devices()
            .map_err(|e| Error::Audio(e.to_string()))?
            .nth(index)
            .ok_or_else(|| Error::Audio(format!("no input device at index {index}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string())),
    }
}

/// Names of available input devices, in enumeration index order
///
/// # Errors
///
/// Returns error if the host cannot enumerate devices
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| Error::Audio(e.to_string()))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// Names of available output devices, in enumeration index order
///
/// # Errors
///
/// Returns error if the host cannot enumerate devices
pub fn output_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| Error::Audio(e.to_string()))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// Encode i16 mono samples as WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_before_any_frame_yields_empty_result() {
        let token = CancelToken::new();
        token.cancel();
        let result = capture_utterance(None, 900, &token).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn cancel_token_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn next_frame_waits_for_a_full_frame() {
        let buffer = Arc::new(Mutex::new(vec![0.0f32; FRAME_SAMPLES - 1]));
        assert!(next_frame(&buffer).is_none());

        buffer.lock().unwrap().push(0.5);
        let frame = next_frame(&buffer).unwrap();
        assert_eq!(frame.len(), FRAME_SAMPLES);
        assert!(buffer.lock().unwrap().is_empty());
    }

    #[test]
    fn next_frame_consumes_without_overlap() {
        let mut samples = vec![0.0f32; FRAME_SAMPLES];
        samples.extend(vec![1.0f32; FRAME_SAMPLES]);
        let buffer = Arc::new(Mutex::new(samples));

        let first = next_frame(&buffer).unwrap();
        let second = next_frame(&buffer).unwrap();
        assert!(first.iter().all(|&s| s == 0));
        assert!(second.iter().all(|&s| s == 32767));
        assert!(next_frame(&buffer).is_none());
    }

    #[test]
    fn samples_to_wav_writes_header_and_data() {
        let samples: Vec<i16> = vec![0, 100, -100, 32767];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(wav.len() > 44);
    }

    #[test]
    fn wav_roundtrips_samples() {
        let original: Vec<i16> = vec![0, 16384, -16384, 32767, -32768];
        let wav = samples_to_wav(&original, SAMPLE_RATE).unwrap();

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);

        let back: Vec<i16> = reader.samples::<i16>().map(std::result::Result::unwrap).collect();
        assert_eq!(back, original);
    }
}
