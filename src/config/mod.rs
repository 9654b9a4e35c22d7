//! Configuration management for tolk.

mod settings;
mod topics;

pub use settings::{
    AudioNormalizationSettings, DatabaseSettings, GeneralSettings, GoogleSettings, HlsRendition,
    HlsSettings, S3InputSettings, Settings, StorageSettings, TranscriptionProvider,
    TranscriptionSettings, VideoCompressionSettings,
};
pub use topics::{default_topic_catalog, DEFAULT_TOPICS};
