//! Building the candidate set for one video from per-language searches.

use super::{Candidate, CandidateBatch, SearchClient};
use crate::config::{Configuration, LanguageGroup, SearchMode};
use crate::error::{SearchError, ServiceError};
use crate::fingerprint::VideoFile;
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

/// Ordered search results for one video, with per-language bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
    languages_requested: usize,
    languages_with_results: usize,
    failed_groups: usize,
    title: Option<String>,
}

impl CandidateSet {
    /// Empty set for a request covering `languages_requested` codes.
    pub fn new(languages_requested: usize) -> Self {
        Self {
            languages_requested,
            ..Self::default()
        }
    }

    /// Append the results of language group `group`, tagging each candidate.
    pub fn push_batch(&mut self, group: usize, batch: CandidateBatch) {
        if batch.is_empty() {
            return;
        }
        if self.title.is_none() {
            self.title = batch.title;
        }
        self.languages_with_results += 1;
        self.candidates
            .extend(batch.candidates.into_iter().map(|mut c| {
                c.source_group = group;
                c
            }));
    }

    /// Candidates in request order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Candidate at `index`.
    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no search produced a candidate.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of language codes in the request.
    pub fn languages_requested(&self) -> usize {
        self.languages_requested
    }

    /// Number of language groups that produced at least one candidate.
    pub fn languages_with_results(&self) -> usize {
        self.languages_with_results
    }

    /// Number of language groups whose search failed after retrying.
    pub fn failed_groups(&self) -> usize {
        self.failed_groups
    }

    /// Title of the first result, for display.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

/// Run the configured searches for every language group of `config` and
/// collect the results in request order.
///
/// A group whose search fails is logged and skipped. Authentication errors
/// abort at once, and a request where every group failed is an error.
pub async fn collect_candidates<C>(
    client: &C,
    video: &VideoFile,
    config: &Configuration,
) -> Result<CandidateSet, SearchError>
where
    C: SearchClient + ?Sized,
{
    trace!(
        "collect_candidates(video={}, mode={})",
        video.display_name(),
        config.search_mode
    );
    let groups = config.languages.groups();
    let mut set = CandidateSet::new(config.languages.total_languages());
    let mut last_failure = None;

    for (index, group) in groups.iter().enumerate() {
        info!("searching {group} subtitles for {}", video.display_name());
        match search_group(client, video, group, config).await {
            Ok(batch) => {
                debug!("{group}: {} candidate(s)", batch.candidates.len());
                set.push_batch(index, batch);
            }
            Err(ServiceError::Auth(reason)) => return Err(SearchError::Auth(reason)),
            Err(err) => {
                warn!("search for {group} subtitles failed: {err}");
                set.failed_groups += 1;
                last_failure = Some(err);
            }
        }
    }

    match last_failure {
        Some(last) if set.is_empty() && set.failed_groups == groups.len() => {
            Err(SearchError::AllFailed {
                attempted: groups.len(),
                last,
            })
        }
        _ => Ok(set),
    }
}

/// Issue the searches `config.search_mode` calls for on one language group.
/// Exclusions apply to each search's results before the fallback decision.
async fn search_group<C>(
    client: &C,
    video: &VideoFile,
    group: &LanguageGroup,
    config: &Configuration,
) -> Result<CandidateBatch, ServiceError>
where
    C: SearchClient + ?Sized,
{
    let retry = &config.retry;
    let by_hash = || async move {
        retry
            .run("fingerprint search", || {
                client.search_by_fingerprint(video.fingerprint(), video.size(), group)
            })
            .await
            .map(|batch| filter_batch(batch, config))
    };
    let by_name = || async move {
        retry
            .run("filename search", || {
                client.search_by_filename(video.display_name(), group)
            })
            .await
            .map(|batch| filter_batch(batch, config))
    };

    match config.search_mode {
        SearchMode::Hash => by_hash().await,
        SearchMode::Filename => by_name().await,
        SearchMode::HashThenFilename => {
            let batch = by_hash().await?;
            if !batch.is_empty() {
                return Ok(batch);
            }
            info!("no fingerprint match for {group}, falling back to filename search");
            by_name().await
        }
        SearchMode::HashAndFilename => {
            let mut batch = by_hash().await?;
            batch.extend(by_name().await?);
            if config.dedupe {
                batch.candidates = dedupe_by_ref(batch.candidates);
            }
            Ok(batch)
        }
    }
}

/// Drop candidates excluded by the hearing-impaired and AI-translation flags.
fn filter_batch(mut batch: CandidateBatch, config: &Configuration) -> CandidateBatch {
    let before = batch.candidates.len();
    batch.candidates.retain(|c| {
        !(config.exclude_hearing_impaired && c.hearing_impaired)
            && !(config.exclude_ai_translated && c.ai_translated)
    });
    if batch.candidates.len() < before {
        trace!("excluded {} candidate(s)", before - batch.candidates.len());
    }
    batch
}

/// Keep the first candidate for each download reference.
fn dedupe_by_ref(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.download_ref.clone()))
        .collect()
}
