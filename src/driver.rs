//! Batch and polling drivers.
//!
//! One worker processes videos strictly sequentially. The polling mode
//! repeats the batch pass on an interval; an in-flight flag keeps cycles
//! from overlapping (a tick that lands mid-cycle is dropped, not queued),
//! and an interrupt finishes the current video before shutting down.

use crate::config::Settings;
use crate::error::{Result, TolkError};
use crate::media;
use crate::orchestrator::{Orchestrator, PipelineMode};
use crate::store::IngestStore;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Outcome of one video inside a batch.
#[derive(Debug)]
pub struct VideoReport {
    pub name: String,
    pub completed: bool,
    pub seconds: f64,
}

/// Outcome of one batch pass.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub videos: Vec<VideoReport>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.videos.iter().filter(|v| v.completed).count()
    }

    pub fn failed(&self) -> usize {
        self.videos.len() - self.completed()
    }
}

/// Drives the orchestrator over the S3 lifecycle or local inputs.
pub struct Driver {
    settings: Settings,
    orchestrator: Orchestrator,
    ingest: Option<IngestStore>,
}

impl Driver {
    pub async fn new(settings: Settings, mode: PipelineMode) -> Result<Self> {
        media::verify_tooling().await?;

        let ingest = if settings.s3_input.enabled {
            Some(IngestStore::new(&settings.s3_input).await?)
        } else {
            None
        };

        let orchestrator = Orchestrator::new(settings.clone(), mode).await?;

        Ok(Self {
            settings,
            orchestrator,
            ingest,
        })
    }

    /// Close long-lived resources.
    pub async fn shutdown(self) -> Result<()> {
        self.orchestrator.close().await
    }

    /// One pass over the pending prefix. Stops early (between videos) when
    /// `shutdown` is raised.
    pub async fn run_batch(&mut self, shutdown: &AtomicBool) -> Result<BatchReport> {
        let ingest = self.ingest.as_ref().ok_or_else(|| {
            TolkError::Config("s3_input is disabled; pass local files instead".to_string())
        })?;

        let pending = ingest.list_pending().await?;
        let mut report = BatchReport::default();

        if pending.is_empty() {
            info!("Nothing pending");
            return Ok(report);
        }

        eprintln!("  Processing {} video(s)...", pending.len());
        let pb = ProgressBar::new(pending.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Videos    [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("█▓░"),
        );

        let incoming_dir = self.settings.temp_dir().join("incoming");

        for video in pending {
            if shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested; stopping after the current video");
                break;
            }

            let started = Instant::now();

            // The move to processing/ is the mutual-exclusion primitive: a
            // failed move still processes the video under its old key.
            let key = ingest.move_to_processing(&video.key).await;

            let completed = match ingest.download(&key, &incoming_dir).await {
                Ok(local_path) => {
                    let result = self.orchestrator.process(&local_path).await;
                    // The local copy goes away regardless of the result.
                    remove_local(&local_path);

                    match result {
                        Ok(processed) => {
                            ingest.move_to_completed(&key).await;
                            info!(
                                "Completed {} -> {}",
                                video.name,
                                processed.video_url.as_deref().unwrap_or("(no upload)")
                            );
                            true
                        }
                        Err(e) => {
                            error!("Failed to process {}: {}", video.name, e);
                            ingest.move_to_failed(&key).await;
                            false
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to download {}: {}", key, e);
                    ingest.move_to_failed(&key).await;
                    false
                }
            };

            pb.inc(1);
            report.videos.push(VideoReport {
                name: video.name,
                completed,
                seconds: started.elapsed().as_secs_f64(),
            });
        }

        pb.finish_and_clear();
        print_report(&report);
        Ok(report)
    }

    /// Process local files through the same orchestration (no S3 lifecycle).
    /// Inputs are copied into the temp directory first so the originals
    /// survive the pipeline's source-deletion contract.
    pub async fn run_local(&mut self, inputs: &[PathBuf]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let incoming_dir = self.settings.temp_dir().join("incoming");
        std::fs::create_dir_all(&incoming_dir)?;

        for input in inputs {
            let started = Instant::now();
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("input")
                .to_string();
            let local_copy = incoming_dir.join(&name);

            let completed = match std::fs::copy(input, &local_copy) {
                Ok(_) => {
                    let result = self.orchestrator.process(&local_copy).await;
                    remove_local(&local_copy);

                    match result {
                        Ok(processed) => {
                            info!("Completed {} as {}", name, processed.safe_name);
                            true
                        }
                        Err(e) => {
                            error!("Failed to process {}: {}", name, e);
                            false
                        }
                    }
                }
                Err(e) => {
                    error!("Could not stage {}: {}", name, e);
                    false
                }
            };

            report.videos.push(VideoReport {
                name,
                completed,
                seconds: started.elapsed().as_secs_f64(),
            });
        }

        print_report(&report);
        Ok(report)
    }

    /// Poll the pending prefix until interrupted. Cycles never overlap; a
    /// per-video fatal never stops the loop.
    pub async fn run_polling(&mut self) -> Result<()> {
        let interval_seconds = self.settings.s3_input.polling_interval_seconds.max(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(AtomicBool::new(false));

        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received; finishing the current video");
                    shutdown.store(true, Ordering::SeqCst);
                }
            });
        }

        // The ticker drops (and logs) ticks that land while a cycle runs.
        let (tick_tx, mut tick_rx) = tokio::sync::mpsc::channel::<()>(1);
        {
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
                loop {
                    interval.tick().await;
                    if in_flight.load(Ordering::SeqCst) || tick_tx.try_send(()).is_err() {
                        info!("Previous polling cycle still running; skipping tick");
                    }
                }
            });
        }

        info!("Polling every {} second(s)", interval_seconds);

        while !shutdown.load(Ordering::SeqCst) {
            tokio::select! {
                received = tick_rx.recv() => {
                    if received.is_none() {
                        break;
                    }
                    in_flight.store(true, Ordering::SeqCst);
                    if let Err(e) = self.run_batch(&shutdown).await {
                        error!("Polling cycle failed: {}", e);
                    }
                    in_flight.store(false, Ordering::SeqCst);
                    // Anything buffered while we were busy is stale.
                    while tick_rx.try_recv().is_ok() {}
                }
                _ = wait_for_flag(shutdown.clone()) => {
                    break;
                }
            }
        }

        info!("Polling stopped");
        Ok(())
    }
}

async fn wait_for_flag(flag: Arc<AtomicBool>) {
    while !flag.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

fn remove_local(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Could not remove local copy {:?}: {}", path, e);
        }
    }
}

fn print_report(report: &BatchReport) {
    if report.videos.is_empty() {
        return;
    }

    eprintln!();
    eprintln!(
        "  {} completed, {} failed",
        style(report.completed()).green(),
        style(report.failed()).red()
    );
    for video in &report.videos {
        let status = if video.completed {
            style("ok").green()
        } else {
            style("failed").red()
        };
        eprintln!("    {:<40} {:>8.1}s  {}", video.name, video.seconds, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport {
            videos: vec![
                VideoReport {
                    name: "a.mp4".to_string(),
                    completed: true,
                    seconds: 12.0,
                },
                VideoReport {
                    name: "b.mp4".to_string(),
                    completed: false,
                    seconds: 3.5,
                },
            ],
        };
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
    }
}
