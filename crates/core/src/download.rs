//! Fetching the chosen subtitle and writing it next to the video.

use crate::config::Configuration;
use crate::error::DownloadError;
use crate::fingerprint::VideoFile;
use crate::search::{Candidate, SearchClient};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Extensions that count as an existing subtitle for a video.
pub const SUBTITLE_EXTENSIONS: [&str; 7] = ["srt", "sub", "sbv", "smi", "ssa", "ass", "usf"];

/// Directory subtitles for `video_path` are written to.
fn target_dir(video_path: &Path, config: &Configuration) -> PathBuf {
    match &config.output_dir {
        Some(dir) => dir.clone(),
        None => video_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    }
}

fn video_stem(video_path: &Path) -> String {
    video_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Where `candidate` is written for `video`.
///
/// The video extension is replaced by the candidate's format extension. The
/// language code is inserted before it when the suffix is on, or when it is
/// `auto` and more than one language group produced results.
pub fn destination_path(
    video: &VideoFile,
    candidate: &Candidate,
    config: &Configuration,
    languages_with_results: usize,
) -> PathBuf {
    let mut name = video_stem(video.path());
    if config.language_suffix.resolve(languages_with_results > 1) {
        name.push_str(&config.language_separator);
        name.push_str(&candidate.language_code);
    }
    name.push('.');
    name.push_str(&candidate.format_extension);
    target_dir(video.path(), config).join(name)
}

/// First subtitle already present for `video_path`, if any.
///
/// Both `Movie.srt` and `Movie<sep><lang>.srt` count, `<lang>` being the
/// first requested language code.
pub fn existing_subtitle(video_path: &Path, config: &Configuration) -> Option<PathBuf> {
    let dir = target_dir(video_path, config);
    let stem = video_stem(video_path);
    let with_lang = format!(
        "{stem}{}{}",
        config.language_separator,
        config.languages.first_code()
    );
    SUBTITLE_EXTENSIONS
        .iter()
        .flat_map(|ext| {
            [
                dir.join(format!("{stem}.{ext}")),
                dir.join(format!("{with_lang}.{ext}")),
            ]
        })
        .find(|path| path.is_file())
}

/// Resolves, fetches and writes one chosen candidate.
pub struct DownloadExecutor<'a, C: ?Sized> {
    client: &'a C,
    config: &'a Configuration,
}

impl<'a, C> DownloadExecutor<'a, C>
where
    C: SearchClient + ?Sized,
{
    /// Executor downloading through `client`.
    pub fn new(client: &'a C, config: &'a Configuration) -> Self {
        Self { client, config }
    }

    /// Bytes of `candidate`, retried like every other service call.
    pub async fn fetch(&self, candidate: &Candidate) -> Result<Vec<u8>, DownloadError> {
        trace!("fetch(ref={})", candidate.download_ref);
        let bytes = self
            .config
            .retry
            .run("download", || self.client.download(&candidate.download_ref))
            .await?;
        if bytes.is_empty() {
            return Err(DownloadError::Empty {
                file_name: candidate.file_name.clone(),
            });
        }
        Ok(bytes)
    }

    /// Write `bytes` to `destination` through a `.part` sibling renamed into
    /// place, so a failed write leaves no truncated subtitle behind.
    pub fn write(&self, destination: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
        let write_err = |source: std::io::Error| DownloadError::Write {
            path: destination.to_path_buf(),
            source,
        };
        if let Some(dir) = destination.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(write_err)?;
            }
        }
        let mut partial = destination.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        if let Err(source) = fs::write(&partial, bytes) {
            let _ = fs::remove_file(&partial);
            return Err(write_err(source));
        }
        fs::rename(&partial, destination).map_err(|source| {
            let _ = fs::remove_file(&partial);
            write_err(source)
        })
    }

    /// Download `candidate` for `video` and return the written path.
    pub async fn execute(
        &self,
        video: &VideoFile,
        candidate: &Candidate,
        languages_with_results: usize,
    ) -> Result<PathBuf, DownloadError> {
        let destination = destination_path(video, candidate, self.config, languages_with_results);
        debug!(
            "downloading {} to {}",
            candidate.file_name,
            destination.display()
        );
        let bytes = self.fetch(candidate).await?;
        self.write(&destination, &bytes)?;
        info!("saved {} ({} bytes)", destination.display(), bytes.len());
        Ok(destination)
    }
}
