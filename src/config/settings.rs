//! Configuration settings for tolk.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::topics::default_topic_catalog;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub s3_input: S3InputSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub transcription: TranscriptionSettings,
    pub audio_normalization: AudioNormalizationSettings,
    pub video_compression: VideoCompressionSettings,
    pub hls: HlsSettings,
    pub google: GoogleSettings,
    /// Closed catalog of content topics used by analysis and validation.
    pub video_topics: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            s3_input: S3InputSettings::default(),
            storage: StorageSettings::default(),
            database: DatabaseSettings::default(),
            transcription: TranscriptionSettings::default(),
            audio_normalization: AudioNormalizationSettings::default(),
            video_compression: VideoCompressionSettings::default(),
            hls: HlsSettings::default(),
            google: GoogleSettings::default(),
            video_topics: default_topic_catalog(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for per-video JSON output.
    pub output_dir: String,
    /// Directory for temporary files (extracted audio, intermediates).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/.tolk/output".to_string(),
            temp_dir: "/tmp/tolk".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Input bucket settings (the pending/processing/completed/failed lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3InputSettings {
    pub enabled: bool,
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub pending_prefix: String,
    pub processing_prefix: String,
    pub completed_prefix: String,
    pub failed_prefix: String,
    pub enable_polling: bool,
    pub polling_interval_seconds: u64,
}

impl Default for S3InputSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            endpoint: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            pending_prefix: "pending/".to_string(),
            processing_prefix: "processing/".to_string(),
            completed_prefix: "completed/".to_string(),
            failed_prefix: "failed/".to_string(),
            enable_polling: false,
            polling_interval_seconds: 60,
        }
    }
}

/// Output (CDN-served) bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Domain the bucket is served from; result URLs are `https://<cdn_domain>/<key>`.
    pub cdn_domain: String,
    /// Key prefix under which processed videos are uploaded.
    pub upload_prefix: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: "us-east-1".to_string(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            cdn_domain: String::new(),
            upload_prefix: "videos".to_string(),
        }
    }
}

/// MySQL connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "tolk".to_string(),
        }
    }
}

/// Transcription provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    /// OpenAI Whisper API (default).
    #[default]
    #[serde(alias = "whisper")]
    Openai,
    /// Local Whisper invoked through a Python interpreter.
    #[serde(alias = "xenova")]
    Local,
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "whisper" => Ok(TranscriptionProvider::Openai),
            "local" | "xenova" => Ok(TranscriptionProvider::Local),
            _ => Err(format!("Unknown transcription provider: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionProvider::Openai => write!(f, "openai"),
            TranscriptionProvider::Local => write!(f, "local"),
        }
    }
}

/// Transcription and segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Transcription provider (openai, local).
    pub provider: TranscriptionProvider,
    /// Model identifier for the local provider (e.g. "small", "medium").
    pub model: String,
    /// Source language, as an ISO-639-1 code or a named alias ("english").
    pub language: String,
    /// Minimum words per phrase chunk.
    pub phrase_min_words: usize,
    /// Maximum words per phrase chunk.
    pub phrase_max_words: usize,
    /// Minimum phrase chunk duration in seconds.
    pub phrase_min_duration_seconds: f64,
    /// Maximum phrase chunk duration in seconds.
    pub phrase_max_duration_seconds: f64,
    /// Minimum words per word-view chunk.
    pub word_min_words: usize,
    /// Maximum words per word-view chunk.
    pub word_max_words: usize,
    /// Inter-word gap beyond which the current chunk is force-flushed.
    pub max_gap_between_word_chunks_seconds: f64,
    /// Python interpreter for the local provider.
    pub python_executable: String,
    /// Whisper model for the openai provider.
    pub openai_model: String,
    /// Compute device for the local provider (cpu, cuda, auto).
    pub device: String,
    pub beam_size: u32,
    pub best_of: u32,
    pub fp16: bool,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::Openai,
            model: "small".to_string(),
            language: "english".to_string(),
            phrase_min_words: 5,
            phrase_max_words: 9,
            phrase_min_duration_seconds: 1.0,
            phrase_max_duration_seconds: 4.5,
            word_min_words: 1,
            word_max_words: 1,
            max_gap_between_word_chunks_seconds: 1.5,
            python_executable: "python3".to_string(),
            openai_model: "whisper-1".to_string(),
            device: "auto".to_string(),
            beam_size: 5,
            best_of: 5,
            fp16: true,
        }
    }
}

/// Two-pass loudness normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioNormalizationSettings {
    pub apply: bool,
    /// Integrated loudness target in LUFS.
    pub target_lufs: f64,
    /// Loudness range target in LU.
    pub loudness_range: f64,
    /// True peak ceiling in dBTP.
    pub true_peak: f64,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for AudioNormalizationSettings {
    fn default() -> Self {
        Self {
            apply: true,
            target_lufs: -16.0,
            loudness_range: 7.0,
            true_peak: -1.5,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Optional video re-encoding applied during the normalization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoCompressionSettings {
    pub apply: bool,
    pub codec: String,
    pub preset: Option<String>,
    pub crf: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub pixel_format: String,
    pub max_bitrate: Option<String>,
    pub buf_size: Option<String>,
    pub tune: Option<String>,
}

impl Default for VideoCompressionSettings {
    fn default() -> Self {
        Self {
            apply: false,
            codec: "libx264".to_string(),
            preset: None,
            crf: None,
            max_width: None,
            max_height: None,
            pixel_format: "yuv420p".to_string(),
            max_bitrate: None,
            buf_size: None,
            tune: None,
        }
    }
}

/// A single HLS rendition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HlsRendition {
    /// Label used in the master playlist NAME attribute and file names.
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Video bitrate in ffmpeg notation, e.g. "2800k".
    pub video_bitrate: String,
    /// Audio bitrate in ffmpeg notation, e.g. "128k".
    pub audio_bitrate: String,
}

impl Default for HlsRendition {
    fn default() -> Self {
        Self {
            name: "720p".to_string(),
            width: Some(1280),
            height: Some(720),
            video_bitrate: "2800k".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

/// HLS packaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HlsSettings {
    pub enabled: bool,
    /// Also upload the normalized MP4 next to the HLS tree.
    pub include_mp4_fallback: bool,
    pub segment_duration: u32,
    pub playlist_type: String,
    pub master_playlist_name: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: Option<String>,
    /// Keyframe interval in frames.
    pub keyframe_interval: u32,
    pub target_frame_rate: u32,
    pub renditions: Vec<HlsRendition>,
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            include_mp4_fallback: false,
            segment_duration: 4,
            playlist_type: "vod".to_string(),
            master_playlist_name: "master.m3u8".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: None,
            keyframe_interval: 48,
            target_frame_rate: 30,
            renditions: vec![HlsRendition::default()],
        }
    }
}

/// Gemini endpoint settings (translation, analysis, exercises).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub gemini_model: String,
    /// Lines per translation batch.
    pub translation_chunk_size: usize,
    /// Attempts per translation batch.
    pub translation_attempts: u32,
    /// Target language for subtitles.
    pub translation_target_language: String,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-2.0-flash".to_string(),
            translation_chunk_size: 60,
            translation_attempts: 3,
            translation_target_language: "russian".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TolkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tolk")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_configuration() {
        let s = Settings::default();
        assert_eq!(s.s3_input.pending_prefix, "pending/");
        assert_eq!(s.s3_input.polling_interval_seconds, 60);
        assert!(!s.s3_input.enabled);
        assert_eq!(s.transcription.phrase_min_words, 5);
        assert_eq!(s.transcription.phrase_max_words, 9);
        assert_eq!(s.transcription.max_gap_between_word_chunks_seconds, 1.5);
        assert_eq!(s.audio_normalization.target_lufs, -16.0);
        assert_eq!(s.hls.segment_duration, 4);
        assert_eq!(s.hls.keyframe_interval, 48);
        assert_eq!(s.hls.renditions.len(), 1);
        assert_eq!(s.google.translation_chunk_size, 60);
        assert!(s.video_topics.len() >= 50);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let toml_src = r#"
            [transcription]
            provider = "xenova"
            language = "spanish"
            phrase_max_words = 7

            [hls]
            enabled = false
        "#;
        let s: Settings = toml::from_str(toml_src).unwrap();
        assert_eq!(s.transcription.provider, TranscriptionProvider::Local);
        assert_eq!(s.transcription.language, "spanish");
        assert_eq!(s.transcription.phrase_max_words, 7);
        assert_eq!(s.transcription.phrase_min_words, 5);
        assert!(!s.hls.enabled);
        assert_eq!(s.hls.master_playlist_name, "master.m3u8");
    }

    #[test]
    fn test_provider_parsing_accepts_aliases() {
        assert_eq!(
            "xenova".parse::<TranscriptionProvider>().unwrap(),
            TranscriptionProvider::Local
        );
        assert_eq!(
            "OpenAI".parse::<TranscriptionProvider>().unwrap(),
            TranscriptionProvider::Openai
        );
        assert!("bogus".parse::<TranscriptionProvider>().is_err());
    }
}
