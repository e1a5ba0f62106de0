//! Turning command line paths into the list of videos to process.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions recognised as video files, lowercase.
const VIDEO_EXTENSIONS: &[&str] = &[
    "3g2", "3gp", "asf", "avi", "divx", "evo", "flv", "m1v", "m2p", "m2ts", "m2v", "m4v", "mk3d",
    "mkv", "mov", "movhd", "movx", "mp4", "mpeg", "mpg", "mts", "mxf", "ogm", "ogv", "ps", "qt",
    "rm", "rmvb", "ts", "vob", "webm", "wm", "wmv", "wmx", "x264", "xvid",
];

/// Whether `path` has a video file extension.
pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand `inputs` into video files. Directories are walked recursively in
/// name order; files that are not videos are skipped with a warning.
pub fn gather_videos(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk(input, &mut videos)?;
        } else if is_video(input) {
            videos.push(input.clone());
        } else {
            warn!("skipping {}: not a video file", input.display());
        }
    }
    debug!("{} video file(s) to process", videos.len());
    Ok(videos)
}

fn walk(dir: &Path, videos: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to list {}", dir.display()))?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk(&path, videos)?;
        } else if is_video(&path) {
            videos.push(path);
        }
    }
    Ok(())
}
