//! Per-video pipeline orchestrator.
//!
//! Runs the linear stage graph for one local video file:
//!
//! ```text
//! AudioExtracted -> Transcribed -> SegmentsBuilt -> Translated -> Analyzed
//!   -> ExercisesGenerated -> AudioNormalized -> Renamed -> Packaged
//!   -> Uploaded -> Persisted -> Done
//! ```
//!
//! Pipeline modes remove edges from the same graph rather than duplicating
//! it. Temporary resources are tracked on an explicit stack and removed on
//! every exit path; the source video itself is deleted only when the whole
//! orchestration succeeded.

use crate::config::Settings;
use crate::contract::validate::{validate_processed_video, validate_variants};
use crate::contract::{Analysis, Exercise, ProcessedVideo, TranscriptionVariants, Translation};
use crate::db::Database;
use crate::error::{Result, TolkError};
use crate::llm::{analyze_transcript, generate_exercises, GeminiClient};
use crate::media;
use crate::store::OutputStore;
use crate::transcription::{create_transcriber, resolve_language_code, segmenter, Transcriber};
use crate::translate::Translator;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Which stages of the graph run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Everything: translate, analyze, generate exercises, persist.
    #[default]
    Full,
    /// Skip exercise generation; persist with an empty exercise list.
    NoExercises,
    /// Skip translation, analysis, exercises, and the database; write only
    /// the transcription JSON.
    TranscriptionOnly,
}

impl PipelineMode {
    pub fn translation_enabled(&self) -> bool {
        !matches!(self, PipelineMode::TranscriptionOnly)
    }

    pub fn exercises_enabled(&self) -> bool {
        matches!(self, PipelineMode::Full)
    }

    pub fn persistence_enabled(&self) -> bool {
        !matches!(self, PipelineMode::TranscriptionOnly)
    }
}

impl std::str::FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(PipelineMode::Full),
            "no-exercises" => Ok(PipelineMode::NoExercises),
            "transcription-only" => Ok(PipelineMode::TranscriptionOnly),
            other => Err(format!("Unknown pipeline mode: {}", other)),
        }
    }
}

/// What one successful orchestration produced.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub safe_name: String,
    pub video_url: Option<String>,
    pub json_path: PathBuf,
    pub db_id: Option<u64>,
    pub duration_seconds: Option<u64>,
}

/// Stack of temporary paths removed on every exit. Cleanup failures are
/// logged and swallowed.
#[derive(Default)]
struct TempResources {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl TempResources {
    fn track_file(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    fn track_dir(&mut self, path: PathBuf) {
        self.dirs.push(path);
    }

    fn cleanup(&self) {
        for path in &self.files {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Could not remove temp file {:?}: {}", path, e);
                }
            }
        }
        for dir in &self.dirs {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    warn!("Could not remove temp directory {:?}: {}", dir, e);
                }
            }
        }
    }
}

/// The per-video orchestrator. Holds the process-wide collaborators: the
/// transcription engine, the Gemini client, the output store, and the
/// database connection.
pub struct Orchestrator {
    settings: Settings,
    mode: PipelineMode,
    transcriber: Box<dyn Transcriber>,
    gemini: Option<GeminiClient>,
    output_store: OutputStore,
    database: Option<Database>,
}

impl Orchestrator {
    /// Build the orchestrator and its collaborators. The Gemini client and
    /// the database connection are only created for modes that use them.
    pub async fn new(settings: Settings, mode: PipelineMode) -> Result<Self> {
        let transcriber = create_transcriber(&settings.transcription)?;

        let gemini = if mode.translation_enabled() {
            Some(GeminiClient::new(&settings.google.gemini_model)?)
        } else {
            None
        };

        let output_store = OutputStore::new(&settings.storage).await?;

        let database = if mode.persistence_enabled() {
            let mut db = Database::connect(&settings.database).await?;
            db.migrate().await?;
            Some(db)
        } else {
            None
        };

        std::fs::create_dir_all(settings.temp_dir())?;
        std::fs::create_dir_all(settings.output_dir())?;

        Ok(Self {
            settings,
            mode,
            transcriber,
            gemini,
            output_store,
            database,
        })
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Close long-lived resources (the database connection).
    pub async fn close(self) -> Result<()> {
        if let Some(db) = self.database {
            db.close().await?;
        }
        Ok(())
    }

    /// Process one local video through the full stage graph.
    ///
    /// On success the source file is deleted; on failure it stays on disk.
    /// Intermediates (WAV, normalized MP4, HLS directory) are removed on
    /// every exit path.
    #[instrument(skip(self), fields(video = %source_video.display()))]
    pub async fn process(&mut self, source_video: &Path) -> Result<ProcessOutcome> {
        let safe_id = generate_safe_id();
        let extension = source_video
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "mp4".to_string());
        let safe_name = format!("{}.{}", safe_id, extension);

        info!("Processing as {}", safe_name);

        let mut temp = TempResources::default();
        let mut source_current = source_video.to_path_buf();

        let result = self
            .run_stages(source_video, &safe_id, &safe_name, &mut temp, &mut source_current)
            .await;

        temp.cleanup();

        if result.is_ok() {
            if let Err(e) = std::fs::remove_file(&source_current) {
                warn!("Could not remove source video {:?}: {}", source_current, e);
            }
        }

        result
    }

    async fn run_stages(
        &mut self,
        source_video: &Path,
        safe_id: &str,
        safe_name: &str,
        temp: &mut TempResources,
        source_current: &mut PathBuf,
    ) -> Result<ProcessOutcome> {
        let temp_dir = self.settings.temp_dir();

        // AudioExtracted
        let extracted = media::extract_audio(source_video, &temp_dir).await?;
        temp.track_file(extracted.audio_path.clone());
        let duration_seconds = extracted.duration_seconds;

        // Transcribed
        let language_code = resolve_language_code(&self.settings.transcription.language);
        let engine = self
            .transcriber
            .transcribe(&extracted.audio_path, &language_code)
            .await?;

        // SegmentsBuilt
        let words = engine.word_entries();
        let variants =
            segmenter::build_variants(&engine.text, &words, &self.settings.transcription);
        let variants = validate_variants(variants)?;
        info!(
            "Segmented into {} phrases / {} words",
            variants.phrases.chunks.len(),
            variants.words.chunks.len()
        );

        // Translated / Analyzed / ExercisesGenerated
        let (translation, analysis, exercises) = self.run_ai_stages(&variants).await?;

        // AudioNormalized
        let normalization = &self.settings.audio_normalization;
        let compression = &self.settings.video_compression;
        let mut deliverable = source_video.to_path_buf();
        if normalization.apply || compression.apply {
            let normalized =
                media::normalize_audio(source_video, &temp_dir, normalization, compression).await?;
            if normalized != *source_video {
                temp.track_file(normalized.clone());
            }
            deliverable = normalized;
        }

        // Renamed
        let deliverable_was_source = deliverable == *source_video;
        let deliverable = ensure_basename(&deliverable, safe_name)?;
        if deliverable_was_source {
            *source_current = deliverable.clone();
        } else {
            temp.track_file(deliverable.clone());
        }

        // Packaged + Uploaded
        let video_url = self.package_and_upload(&deliverable, safe_id, safe_name, temp).await?;

        // Validate + write the JSON artifact
        let json_path = self.settings.output_dir().join(format!("{}.json", safe_id));

        let outcome = match self.mode {
            PipelineMode::TranscriptionOnly => {
                write_json(&json_path, &variants)?;
                ProcessOutcome {
                    safe_name: safe_name.to_string(),
                    video_url: Some(video_url),
                    json_path,
                    db_id: None,
                    duration_seconds,
                }
            }
            _ => {
                let video = ProcessedVideo {
                    video_name: safe_name.to_string(),
                    video_url,
                    duration_seconds,
                    transcription: variants,
                    translation: translation.unwrap_or_else(empty_translation),
                    analysis: analysis.ok_or_else(|| {
                        TolkError::Upstream("analysis stage produced no result".to_string())
                    })?,
                    exercises,
                    is_adult_content: false, // mirrored from analysis by the validator
                };
                let video = validate_processed_video(video, &self.settings.video_topics)?;

                write_json(&json_path, &video)?;

                // Persisted
                let db = self.database.as_mut().ok_or_else(|| {
                    TolkError::Config("database connection is not available".to_string())
                })?;
                let db_id = db.insert_video(&video).await?;

                ProcessOutcome {
                    safe_name: safe_name.to_string(),
                    video_url: Some(video.video_url),
                    json_path,
                    db_id: Some(db_id),
                    duration_seconds,
                }
            }
        };

        info!("Done: {}", safe_name);
        Ok(outcome)
    }

    /// Run the AI stages the current mode enables.
    async fn run_ai_stages(
        &self,
        variants: &TranscriptionVariants,
    ) -> Result<(Option<Translation>, Option<Analysis>, Vec<Exercise>)> {
        if !self.mode.translation_enabled() {
            return Ok((None, None, Vec::new()));
        }

        let gemini = self.gemini.as_ref().ok_or_else(|| {
            TolkError::Config("Gemini client is not available".to_string())
        })?;

        let translator = Translator::new(
            gemini,
            &self.settings.google,
            &self.settings.transcription.language,
        );
        let translation = translator.translate(&variants.phrases).await?;

        let analysis =
            analyze_transcript(gemini, &variants.full_text, &self.settings.video_topics).await?;

        let exercises = if self.mode.exercises_enabled() {
            generate_exercises(
                gemini,
                &variants.full_text,
                &self.settings.transcription.language,
            )
            .await?
        } else {
            Vec::new()
        };

        Ok((Some(translation), Some(analysis), exercises))
    }

    /// Package the deliverable (HLS with MP4 fallback, or MP4 only) and
    /// upload it. Returns the recorded video URL.
    async fn package_and_upload(
        &self,
        deliverable: &Path,
        safe_id: &str,
        safe_name: &str,
        temp: &mut TempResources,
    ) -> Result<String> {
        let prefix = self.settings.storage.upload_prefix.clone();
        let hls = &self.settings.hls;

        if hls.enabled {
            let hls_dir = self.settings.temp_dir().join(format!("{}_hls", safe_id));
            temp.track_dir(hls_dir.clone());

            let packaged = async {
                let output = media::encode_hls(deliverable, &hls_dir, safe_id, hls).await?;
                self.output_store
                    .upload_tree(
                        &output.output_dir,
                        &prefix,
                        safe_id,
                        &output.master_playlist_name,
                    )
                    .await
            }
            .await;

            match packaged {
                Ok(master_url) => {
                    if hls.include_mp4_fallback {
                        if let Err(e) = self
                            .output_store
                            .upload_file(deliverable, &prefix, safe_name)
                            .await
                        {
                            warn!("MP4 fallback upload failed (continuing): {}", e);
                        }
                    }
                    return Ok(master_url);
                }
                Err(e) => {
                    warn!("HLS packaging failed, falling back to plain MP4: {}", e);
                }
            }
        }

        self.output_store
            .upload_file(deliverable, &prefix, safe_name)
            .await
    }
}

/// Generate a 16-character alphanumeric safe ID.
pub fn generate_safe_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..16].to_string()
}

/// Ensure the on-disk basename equals `target_name`, renaming in place and
/// falling back to copy+unlink for cross-device moves.
fn ensure_basename(path: &Path, target_name: &str) -> Result<PathBuf> {
    let current_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if current_name == target_name {
        return Ok(path.to_path_buf());
    }

    let target = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(target_name);

    match std::fs::rename(path, &target) {
        Ok(()) => Ok(target),
        Err(rename_err) => {
            // Rename across filesystems fails; copy and unlink instead.
            std::fs::copy(path, &target).map_err(|copy_err| {
                TolkError::Io(std::io::Error::new(
                    copy_err.kind(),
                    format!(
                        "rename failed ({}) and copy fallback failed ({})",
                        rename_err, copy_err
                    ),
                ))
            })?;
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Could not unlink {:?} after copy: {}", path, e);
            }
            Ok(target)
        }
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn empty_translation() -> Translation {
    Translation {
        full_text: String::new(),
        chunks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_id_shape() {
        let id = generate_safe_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

        let other = generate_safe_id();
        assert_ne!(id, other);
    }

    #[test]
    fn test_pipeline_mode_edges() {
        assert!(PipelineMode::Full.exercises_enabled());
        assert!(!PipelineMode::NoExercises.exercises_enabled());
        assert!(PipelineMode::NoExercises.translation_enabled());
        assert!(!PipelineMode::TranscriptionOnly.translation_enabled());
        assert!(!PipelineMode::TranscriptionOnly.persistence_enabled());
    }

    #[test]
    fn test_pipeline_mode_parsing() {
        assert_eq!(
            "no-exercises".parse::<PipelineMode>().unwrap(),
            PipelineMode::NoExercises
        );
        assert!("bogus".parse::<PipelineMode>().is_err());
    }

    #[test]
    fn test_ensure_basename_renames() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("ugly name (1).mp4");
        std::fs::write(&original, b"data").unwrap();

        let renamed = ensure_basename(&original, "a1b2c3d4e5f6a7b8.mp4").unwrap();
        assert_eq!(
            renamed.file_name().and_then(|n| n.to_str()),
            Some("a1b2c3d4e5f6a7b8.mp4")
        );
        assert!(!original.exists());
        assert!(renamed.exists());
    }

    #[test]
    fn test_ensure_basename_noop_when_already_safe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a1b2c3d4e5f6a7b8.mp4");
        std::fs::write(&path, b"data").unwrap();

        let result = ensure_basename(&path, "a1b2c3d4e5f6a7b8.mp4").unwrap();
        assert_eq!(result, path);
        assert!(path.exists());
    }

    #[test]
    fn test_temp_resources_cleanup_swallows_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("intermediate.wav");
        std::fs::write(&file, b"x").unwrap();

        let mut temp = TempResources::default();
        temp.track_file(file.clone());
        temp.track_file(dir.path().join("never-created.mp4"));
        temp.track_dir(dir.path().join("no-such-dir"));

        temp.cleanup();
        assert!(!file.exists());
    }
}
