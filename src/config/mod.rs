//! Configuration management for voxchat

pub mod file;

use crate::Result;

/// Default trailing silence that ends an utterance, in milliseconds
pub const DEFAULT_SILENCE_DURATION_MS: u64 = 900;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Audio capture and playback settings
    pub audio: AudioConfig,

    /// Console output toggles
    pub output: OutputConfig,

    /// Insert time-passage notes when turns are far apart
    pub add_timestamps: bool,

    /// Speech-to-text backend
    pub stt: SttConfig,

    /// Text generation backend
    pub generation: GenerationConfig,

    /// Text-to-speech backend (disabled when `enabled` is false)
    pub tts: TtsConfig,
}

/// Audio device and segmentation settings
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Trailing silence that ends an utterance, in milliseconds
    pub silence_duration_ms: u64,

    /// Input device index (`None` for host default)
    pub recording_device: Option<usize>,

    /// Output device index (`None` for host default)
    pub playback_device: Option<usize>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_duration_ms: DEFAULT_SILENCE_DURATION_MS,
            recording_device: None,
            playback_device: None,
        }
    }
}

/// Console output toggles
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Print each transcription as it arrives
    pub print_transcription: bool,

    /// Print the assembled prompt before generation
    pub print_prompt: bool,

    /// Print the generated response
    pub print_response: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            print_transcription: true,
            print_prompt: false,
            print_response: true,
        }
    }
}

/// Speech-to-text backend settings
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Text generation backend settings
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text-to-speech backend settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub speed: f32,
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Currently infallible; returns `Result` so load-time validation can
    /// be added without touching call sites.
    #[allow(clippy::unnecessary_wraps)]
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let audio = AudioConfig {
            silence_duration_ms: std::env::var("VOXCHAT_SILENCE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.audio.silence_duration_ms)
                .unwrap_or(DEFAULT_SILENCE_DURATION_MS),
            recording_device: std::env::var("VOXCHAT_RECORDING_DEVICE")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.audio.recording_device),
            playback_device: std::env::var("VOXCHAT_PLAYBACK_DEVICE")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.audio.playback_device),
        };

        let output_default = OutputConfig::default();
        let output = OutputConfig {
            print_transcription: fc
                .output
                .print_transcription
                .unwrap_or(output_default.print_transcription),
            print_prompt: fc.output.print_prompt.unwrap_or(output_default.print_prompt),
            print_response: fc
                .output
                .print_response
                .unwrap_or(output_default.print_response),
        };

        let add_timestamps = std::env::var("VOXCHAT_ADD_TIMESTAMPS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(fc.add_timestamps)
            .unwrap_or(true);

        let stt = SttConfig {
            base_url: std::env::var("VOXCHAT_STT_URL")
                .ok()
                .or(fc.stt.base_url)
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key: std::env::var("VOXCHAT_STT_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .or(fc.stt.api_key)
                .unwrap_or_default(),
            model: std::env::var("VOXCHAT_STT_MODEL")
                .ok()
                .or(fc.stt.model)
                .unwrap_or_else(|| "whisper-1".to_string()),
        };

        let generation = GenerationConfig {
            base_url: std::env::var("VOXCHAT_GENERATION_URL")
                .ok()
                .or(fc.generation.base_url)
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key: std::env::var("VOXCHAT_GENERATION_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .or(fc.generation.api_key)
                .unwrap_or_default(),
            model: std::env::var("VOXCHAT_GENERATION_MODEL")
                .ok()
                .or(fc.generation.model)
                .unwrap_or_else(|| "gpt-3.5-turbo-instruct".to_string()),
            max_tokens: fc.generation.max_tokens.unwrap_or(20),
            temperature: fc.generation.temperature.unwrap_or(0.8),
        };

        let tts = TtsConfig {
            enabled: std::env::var("VOXCHAT_TTS_ENABLED")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.tts.enabled)
                .unwrap_or(false),
            base_url: std::env::var("VOXCHAT_TTS_URL")
                .ok()
                .or(fc.tts.base_url)
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key: std::env::var("VOXCHAT_TTS_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .or(fc.tts.api_key)
                .unwrap_or_default(),
            model: std::env::var("VOXCHAT_TTS_MODEL")
                .ok()
                .or(fc.tts.model)
                .unwrap_or_else(|| "tts-1".to_string()),
            speed: fc.tts.speed.unwrap_or(1.0),
        };

        Ok(Self {
            audio,
            output,
            add_timestamps,
            stt,
            generation,
            tts,
        })
    }
}
