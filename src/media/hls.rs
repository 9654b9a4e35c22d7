//! fMP4-HLS packaging and master playlist synthesis.

use super::run_tool_checked;
use crate::config::{HlsRendition, HlsSettings};
use crate::error::{Result, TolkError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// One encoded rendition.
#[derive(Debug, Clone)]
pub struct HlsRenditionOutput {
    pub name: String,
    /// Media playlist file name, relative to the output directory.
    pub playlist_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Peak bandwidth in bits per second (video + audio).
    pub bandwidth: u64,
}

/// The full HLS package.
#[derive(Debug)]
pub struct HlsOutput {
    pub output_dir: PathBuf,
    pub master_playlist_name: String,
    pub renditions: Vec<HlsRenditionOutput>,
}

/// Encode one fMP4-HLS rendition per configured entry and synthesize the
/// master playlist.
#[instrument(skip_all, fields(input = %input_path.display(), base = base_name))]
pub async fn encode_hls(
    input_path: &Path,
    output_dir: &Path,
    base_name: &str,
    settings: &HlsSettings,
) -> Result<HlsOutput> {
    if settings.renditions.is_empty() {
        return Err(TolkError::Config("hls.renditions is empty".to_string()));
    }

    std::fs::create_dir_all(output_dir)?;

    let mut outputs = Vec::with_capacity(settings.renditions.len());
    for rendition in &settings.renditions {
        info!("Encoding HLS rendition {}", rendition.name);
        outputs.push(encode_rendition(input_path, output_dir, base_name, rendition, settings).await?);
    }

    let master = build_master_playlist(&outputs);
    let master_path = output_dir.join(&settings.master_playlist_name);
    std::fs::write(&master_path, master)?;

    Ok(HlsOutput {
        output_dir: output_dir.to_path_buf(),
        master_playlist_name: settings.master_playlist_name.clone(),
        renditions: outputs,
    })
}

async fn encode_rendition(
    input_path: &Path,
    output_dir: &Path,
    base_name: &str,
    rendition: &HlsRendition,
    settings: &HlsSettings,
) -> Result<HlsRenditionOutput> {
    let playlist_name = format!("{}_{}.m3u8", base_name, rendition.name);
    let init_name = format!("{}_{}_init.mp4", base_name, rendition.name);
    let segment_pattern = output_dir.join(format!("{}_{}_%03d.m4s", base_name, rendition.name));
    let playlist_path = output_dir.join(&playlist_name);

    let keyframes = settings.keyframe_interval.to_string();
    let mut args: Vec<OsString> = vec!["-i".into(), input_path.into()];

    args.push("-c:v".into());
    args.push(settings.video_codec.clone().into());
    if let Some(preset) = &settings.preset {
        args.push("-preset".into());
        args.push(preset.clone().into());
    }
    args.push("-b:v".into());
    args.push(rendition.video_bitrate.clone().into());

    if let (Some(w), Some(h)) = (rendition.width, rendition.height) {
        args.push("-vf".into());
        args.push(
            format!(
                "scale=min({w}\\,iw):min({h}\\,ih):force_original_aspect_ratio=decrease,\
                 pad=ceil(iw/2)*2:ceil(ih/2)*2"
            )
            .into(),
        );
    }

    // Fixed GOP + CFR keeps segment boundaries aligned across renditions.
    args.push("-g".into());
    args.push(keyframes.clone().into());
    args.push("-keyint_min".into());
    args.push(keyframes.into());
    args.push("-sc_threshold".into());
    args.push("0".into());
    args.push("-r".into());
    args.push(settings.target_frame_rate.to_string().into());
    args.push("-vsync".into());
    args.push("cfr".into());

    args.push("-c:a".into());
    args.push(settings.audio_codec.clone().into());
    args.push("-b:a".into());
    args.push(rendition.audio_bitrate.clone().into());

    args.push("-hls_time".into());
    args.push(settings.segment_duration.to_string().into());
    args.push("-hls_playlist_type".into());
    args.push(settings.playlist_type.clone().into());
    args.push("-hls_segment_type".into());
    args.push("fmp4".into());
    args.push("-hls_flags".into());
    args.push("independent_segments".into());
    args.push("-hls_fmp4_init_filename".into());
    args.push(init_name.into());
    args.push("-hls_segment_filename".into());
    args.push(segment_pattern.into());
    args.push("-y".into());
    args.push("-loglevel".into());
    args.push("error".into());
    args.push(playlist_path.clone().into());

    run_tool_checked("ffmpeg", &args).await?;

    // The muxer may record the init segment with a directory component;
    // playlists must reference it by basename only.
    let playlist_text = std::fs::read_to_string(&playlist_path)?;
    std::fs::write(&playlist_path, rewrite_init_uri(&playlist_text))?;

    Ok(HlsRenditionOutput {
        name: rendition.name.clone(),
        playlist_name,
        width: rendition.width,
        height: rendition.height,
        bandwidth: parse_bitrate(&rendition.video_bitrate) + parse_bitrate(&rendition.audio_bitrate),
    })
}

/// Rewrite `#EXT-X-MAP` URIs to basename-only references.
fn rewrite_init_uri(playlist: &str) -> String {
    playlist
        .lines()
        .map(|line| {
            if let Some(rest) = line.strip_prefix("#EXT-X-MAP:URI=\"") {
                if let Some(uri) = rest.strip_suffix('"') {
                    let basename = uri.rsplit('/').next().unwrap_or(uri);
                    return format!("#EXT-X-MAP:URI=\"{}\"", basename);
                }
            }
            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

/// Synthesize the master playlist.
fn build_master_playlist(renditions: &[HlsRenditionOutput]) -> String {
    let mut master = String::from("#EXTM3U\n#EXT-X-VERSION:6\n");
    for rendition in renditions {
        master.push_str(&format!("#EXT-X-STREAM-INF:BANDWIDTH={}", rendition.bandwidth));
        if let (Some(w), Some(h)) = (rendition.width, rendition.height) {
            master.push_str(&format!(",RESOLUTION={}x{}", w, h));
        }
        master.push_str(&format!(",NAME=\"{}\"\n", rendition.name));
        master.push_str(&rendition.playlist_name);
        master.push('\n');
    }
    master
}

/// Parse an ffmpeg bitrate string ("2800k", "1.5M", "96000") to bits/s.
fn parse_bitrate(bitrate: &str) -> u64 {
    let trimmed = bitrate.trim();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('k') | Some('K') => (&trimmed[..trimmed.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&trimmed[..trimmed.len() - 1], 1_000_000.0),
        _ => (trimmed, 1.0),
    };
    digits
        .parse::<f64>()
        .map(|v| (v * multiplier) as u64)
        .unwrap_or(0)
}
