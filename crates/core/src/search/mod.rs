//! Search boundary: the contract of the remote subtitle service and the
//! candidate records it produces.

use crate::config::LanguageGroup;
use crate::error::ServiceError;
use async_trait::async_trait;

pub mod candidates;
pub mod opensubtitles;
pub mod retry;

/// How the service found a candidate. A fingerprint match is strictly
/// stronger evidence than a filename match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    ByFingerprint,
    ByFilename,
}

/// One subtitle search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub file_name: String,
    pub language_code: String,
    pub match_method: MatchMethod,
    pub hearing_impaired: bool,
    pub ai_translated: bool,
    /// Zero when the service has no rating.
    pub rating: f64,
    pub download_count: u64,
    /// Opaque token handed back to [`SearchClient::download`].
    pub download_ref: String,
    pub format_extension: String,
    /// Feature title reported by the service, for display only.
    pub title: Option<String>,
    /// Index of the language group whose search produced this candidate.
    pub source_group: usize,
}

impl Candidate {
    /// Candidate with neutral metadata and an `srt` extension.
    pub fn new(
        file_name: impl Into<String>,
        language_code: impl Into<String>,
        match_method: MatchMethod,
        download_ref: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            language_code: language_code.into(),
            match_method,
            hearing_impaired: false,
            ai_translated: false,
            rating: 0.0,
            download_count: 0,
            download_ref: download_ref.into(),
            format_extension: "srt".to_string(),
            title: None,
            source_group: 0,
        }
    }

    /// Whether the service matched this candidate on the fingerprint.
    pub fn is_fingerprint_match(&self) -> bool {
        self.match_method == MatchMethod::ByFingerprint
    }
}

/// Raw result of one service call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateBatch {
    pub candidates: Vec<Candidate>,
    /// Title of the first result, used only for display.
    pub title: Option<String>,
}

impl CandidateBatch {
    /// Batch of `candidates`, titled after the first one with a title.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        let title = candidates.iter().find_map(|c| c.title.clone());
        Self { candidates, title }
    }

    /// Whether the search found nothing.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Append `other` after this batch's own results.
    pub fn extend(&mut self, other: CandidateBatch) {
        if self.title.is_none() {
            self.title = other.title;
        }
        self.candidates.extend(other.candidates);
    }
}

/// The remote subtitle service as consumed by a pass.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Search for subtitles matching the content fingerprint of a video.
    async fn search_by_fingerprint(
        &self,
        fingerprint: &str,
        size: u64,
        language: &LanguageGroup,
    ) -> Result<CandidateBatch, ServiceError>;

    /// Search for subtitles by free-text file name.
    async fn search_by_filename(
        &self,
        name: &str,
        language: &LanguageGroup,
    ) -> Result<CandidateBatch, ServiceError>;

    /// Resolve a download reference and fetch the subtitle bytes.
    async fn download(&self, download_ref: &str) -> Result<Vec<u8>, ServiceError>;
}
