//! tolk - Video ingestion for language learners
//!
//! A batch pipeline that turns raw videos from an object-store bucket into
//! learner-facing artifacts: timestamped transcripts at three granularities,
//! a translated subtitle track, a content-analysis record, auto-generated
//! exercises, a normalized MP4 and/or HLS package, and a database row
//! linking all of them.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `contract` - The typed data contract between stages, with validators
//! - `transcription` - Speech-to-text engines and the transcript segmenter
//! - `translate` - Chunked subtitle translation
//! - `llm` - Gemini client, JSON repair, analysis and exercise generation
//! - `media` - ffmpeg/ffprobe wrappers (extraction, loudnorm, HLS)
//! - `store` - Object-store lifecycle and uploads
//! - `db` - MySQL persistence
//! - `orchestrator` - The per-video stage graph
//! - `driver` - Batch and polling execution
//!
//! # Example
//!
//! ```rust,no_run
//! use tolk::config::Settings;
//! use tolk::driver::Driver;
//! use tolk::orchestrator::PipelineMode;
//! use std::sync::atomic::AtomicBool;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut driver = Driver::new(settings, PipelineMode::Full).await?;
//!
//!     let shutdown = AtomicBool::new(false);
//!     let report = driver.run_batch(&shutdown).await?;
//!     println!("{} completed, {} failed", report.completed(), report.failed());
//!
//!     driver.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod contract;
pub mod db;
pub mod driver;
pub mod error;
pub mod llm;
pub mod media;
pub mod orchestrator;
pub mod store;
pub mod transcription;
pub mod translate;

pub use error::{Result, TolkError};
