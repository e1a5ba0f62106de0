//! One video's pass through the pipeline.

use crate::config::Configuration;
use crate::download::{existing_subtitle, DownloadExecutor};
use crate::error::PassError;
use crate::fingerprint::VideoFile;
use crate::present::InteractivePresenter;
use crate::search::candidates::collect_candidates;
use crate::search::SearchClient;
use crate::select::{Selection, SelectionEngine};
use std::path::{Path, PathBuf};
use tracing::{info, trace};

/// How a pass ended when nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Downloaded(PathBuf),
    NothingFound,
    /// The user declined every candidate.
    Cancelled,
    /// A subtitle was already present next to the video.
    Skipped(PathBuf),
}

impl PassOutcome {
    /// Whether a subtitle was written.
    pub fn is_download(&self) -> bool {
        matches!(self, Self::Downloaded(_))
    }
}

/// Everything a pass needs, borrowed for the lifetime of the run.
pub struct Session<'a, C: ?Sized> {
    client: &'a C,
    presenter: &'a dyn InteractivePresenter,
    config: &'a Configuration,
}

impl<'a, C> Session<'a, C>
where
    C: SearchClient + ?Sized,
{
    /// Session searching with `client` and asking through `presenter`.
    pub fn new(
        client: &'a C,
        presenter: &'a dyn InteractivePresenter,
        config: &'a Configuration,
    ) -> Self {
        Self {
            client,
            presenter,
            config,
        }
    }

    /// Find, choose and download a subtitle for the video at `path`.
    pub async fn run(&self, path: &Path) -> Result<PassOutcome, PassError> {
        trace!("run(path={})", path.display());
        if !self.config.overwrite {
            if let Some(existing) = existing_subtitle(path, self.config) {
                info!("subtitle already exists: {}", existing.display());
                return Ok(PassOutcome::Skipped(existing));
            }
        }

        let video = VideoFile::open(path)?;
        let set = collect_candidates(self.client, &video, self.config).await?;

        let engine = SelectionEngine::new(self.config, self.presenter);
        match engine.select(&video, &set)? {
            Selection::Empty => {
                info!("no subtitles found for {}", video.display_name());
                Ok(PassOutcome::NothingFound)
            }
            Selection::Cancelled => Ok(PassOutcome::Cancelled),
            Selection::Selected { index, by } => {
                let candidate = &set.candidates()[index];
                info!("selected {} ({by:?})", candidate.file_name);
                let executor = DownloadExecutor::new(self.client, self.config);
                let written = executor
                    .execute(&video, candidate, set.languages_with_results())
                    .await?;
                Ok(PassOutcome::Downloaded(written))
            }
        }
    }
}
