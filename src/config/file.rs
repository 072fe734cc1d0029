//! TOML configuration file loading
//!
//! Supports `~/.config/voxchat/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoxchatConfigFile {
    /// Audio capture/playback configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Console output toggles
    #[serde(default)]
    pub output: OutputFileConfig,

    /// Whether time-passage notes are inserted between distant turns
    pub add_timestamps: Option<bool>,

    /// Speech-to-text backend configuration
    #[serde(default)]
    pub stt: BackendFileConfig,

    /// Text generation backend configuration
    #[serde(default)]
    pub generation: GenerationFileConfig,

    /// Text-to-speech backend configuration
    #[serde(default)]
    pub tts: TtsFileConfig,
}

/// Audio device and segmentation configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Trailing silence that ends an utterance, in milliseconds
    pub silence_duration_ms: Option<u64>,

    /// Input device index (omit for host default)
    pub recording_device: Option<usize>,

    /// Output device index (omit for host default)
    pub playback_device: Option<usize>,
}

/// Console output toggles
#[derive(Debug, Default, Deserialize)]
pub struct OutputFileConfig {
    pub print_transcription: Option<bool>,
    pub print_prompt: Option<bool>,
    pub print_response: Option<bool>,
}

/// Generic HTTP backend configuration (base URL + key + model)
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// Text generation backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct GenerationFileConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Text-to-speech backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub speed: Option<f32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoxchatConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> VoxchatConfigFile {
    let Some(path) = config_file_path() else {
        return VoxchatConfigFile::default();
    };

    if !path.exists() {
        return VoxchatConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VoxchatConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VoxchatConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voxchat/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voxchat").join("config.toml"))
}
