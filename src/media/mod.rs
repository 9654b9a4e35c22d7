//! Media toolchain wrappers (ffmpeg/ffprobe).
//!
//! Every operation runs the tool as a subprocess with full argv
//! construction and captured stderr. Failures surface as `MediaTool`
//! errors carrying the stderr tail.

mod audio;
mod hls;
mod normalize;

pub use audio::{extract_audio, probe_duration_seconds, ExtractedAudio};
pub use hls::{encode_hls, HlsOutput, HlsRenditionOutput};
pub use normalize::normalize_audio;

use crate::error::{Result, TolkError};
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// How much stderr to keep when a tool fails.
const STDERR_TAIL_CHARS: usize = 2_000;

pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= STDERR_TAIL_CHARS {
        text.into_owned()
    } else {
        chars[chars.len() - STDERR_TAIL_CHARS..].iter().collect()
    }
}

/// Run a media tool to completion, returning its output. Exit status is not
/// checked here; callers that need stderr on success (loudness measurement)
/// inspect the output themselves.
pub(crate) async fn run_tool<S: AsRef<OsStr>>(
    tool: &str,
    args: &[S],
) -> Result<std::process::Output> {
    debug!(
        "Running {} {}",
        tool,
        args.iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let result = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(output) => Ok(output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TolkError::ToolNotFound(tool.to_string()))
        }
        Err(e) => Err(TolkError::MediaTool {
            tool: tool.to_string(),
            detail: format!("failed to execute: {}", e),
        }),
    }
}

/// Run a media tool and fail with its stderr tail on a non-zero exit.
pub(crate) async fn run_tool_checked<S: AsRef<OsStr>>(tool: &str, args: &[S]) -> Result<()> {
    let output = run_tool(tool, args).await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(TolkError::MediaTool {
            tool: tool.to_string(),
            detail: stderr_tail(&output.stderr),
        })
    }
}

/// Verify that ffmpeg and ffprobe are runnable before a batch begins.
pub async fn verify_tooling() -> Result<()> {
    for tool in ["ffmpeg", "ffprobe"] {
        let output = run_tool(tool, &["-version"]).await?;
        if !output.status.success() {
            return Err(TolkError::MediaTool {
                tool: tool.to_string(),
                detail: "tool exists but -version failed".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_truncates_long_output() {
        let long = "x".repeat(5_000);
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.chars().count(), STDERR_TAIL_CHARS);
    }

    #[test]
    fn test_stderr_tail_keeps_short_output() {
        assert_eq!(stderr_tail(b"short error"), "short error");
    }
}
