//! OpenSubtitles REST API client.
//! Searches `/subtitles` by movie hash or by query and resolves downloads
//! through `/download`.

use super::{Candidate, CandidateBatch, MatchMethod, SearchClient};
use crate::config::LanguageGroup;
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Production endpoint of the REST API.
pub const DEFAULT_BASE_URL: &str = "https://api.opensubtitles.com/api/v1";

const USER_AGENT: &str = concat!("subpick v", env!("CARGO_PKG_VERSION"));

/// Format requested from the download endpoint.
const SUB_FORMAT: &str = "srt";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SubtitleEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
struct Attributes {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    download_count: u64,
    #[serde(default)]
    hearing_impaired: bool,
    #[serde(default)]
    ai_translated: bool,
    #[serde(default)]
    machine_translated: bool,
    #[serde(default)]
    ratings: f64,
    #[serde(default)]
    moviehash_match: bool,
    #[serde(default)]
    release: Option<String>,
    #[serde(default)]
    feature_details: Option<FeatureDetails>,
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FeatureDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    movie_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    file_id: u64,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct DownloadRequest {
    file_id: u64,
    sub_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    link: String,
    #[serde(default)]
    remaining: Option<i64>,
}

/// Error body returned by the API on failures.
#[derive(Debug, Default, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Which search produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchKind {
    Hash,
    Query,
}

/// Client for `api.opensubtitles.com`.
#[derive(Debug, Clone)]
pub struct OpenSubtitlesClient {
    http: Client,
    base_url: String,
    api_key: String,
    exclude_hearing_impaired: bool,
    exclude_ai_translated: bool,
}

impl OpenSubtitlesClient {
    /// Create a client for the production API.
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            exclude_hearing_impaired: false,
            exclude_ai_translated: false,
        })
    }

    /// Point the client at another server (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Ask the service to leave out hearing-impaired and AI-translated uploads.
    pub fn with_exclusions(mut self, hearing_impaired: bool, ai_translated: bool) -> Self {
        self.exclude_hearing_impaired = hearing_impaired;
        self.exclude_ai_translated = ai_translated;
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Query parameters in the alphabetical order the API expects.
    fn search_params(
        &self,
        language: &LanguageGroup,
        key: &'static str,
        value: &str,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.exclude_ai_translated {
            params.push(("ai_translated", "exclude".to_string()));
        }
        if self.exclude_hearing_impaired {
            params.push(("hearing_impaired", "exclude".to_string()));
        }
        params.push(("languages", language.query_value().to_lowercase()));
        if self.exclude_ai_translated {
            params.push(("machine_translated", "exclude".to_string()));
        }
        params.push((key, value.to_string()));
        params
    }

    async fn search(
        &self,
        kind: SearchKind,
        params: Vec<(&'static str, String)>,
    ) -> Result<CandidateBatch, ServiceError> {
        let url = format!("{}/subtitles", self.base_url);
        trace!("GET {url} {params:?}");
        let response = self
            .authorized(self.http.get(&url).query(&params))
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Rejected(format!("malformed search response: {e}")))?;
        let batch = CandidateBatch::new(
            body.data
                .into_iter()
                .filter_map(|entry| to_candidate(entry, kind))
                .collect(),
        );
        debug!("search returned {} candidate(s)", batch.candidates.len());
        Ok(batch)
    }
}

#[async_trait]
impl SearchClient for OpenSubtitlesClient {
    async fn search_by_fingerprint(
        &self,
        fingerprint: &str,
        size: u64,
        language: &LanguageGroup,
    ) -> Result<CandidateBatch, ServiceError> {
        // The REST API matches on the hash alone.
        debug!("fingerprint search hash={fingerprint} size={size} languages={language}");
        let params = self.search_params(language, "moviehash", fingerprint);
        self.search(SearchKind::Hash, params).await
    }

    async fn search_by_filename(
        &self,
        name: &str,
        language: &LanguageGroup,
    ) -> Result<CandidateBatch, ServiceError> {
        debug!("filename search query={name} languages={language}");
        let params = self.search_params(language, "query", name);
        self.search(SearchKind::Query, params).await
    }

    async fn download(&self, download_ref: &str) -> Result<Vec<u8>, ServiceError> {
        let file_id: u64 = download_ref
            .parse()
            .map_err(|_| ServiceError::Rejected(format!("invalid file id {download_ref:?}")))?;
        let url = format!("{}/download", self.base_url);
        trace!("POST {url} file_id={file_id}");
        let response = self
            .authorized(self.http.post(&url))
            .json(&DownloadRequest {
                file_id,
                sub_format: SUB_FORMAT,
            })
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let link: DownloadResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Rejected(format!("malformed download response: {e}")))?;
        if let Some(remaining) = link.remaining {
            info!("subtitle downloads remaining today: {remaining}");
        }

        trace!("GET {}", link.link);
        let response = self
            .http
            .get(&link.link)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

fn to_candidate(entry: SubtitleEntry, kind: SearchKind) -> Option<Candidate> {
    let attrs = entry.attributes;
    let file = attrs.files.into_iter().next()?;
    let file_name = file
        .file_name
        .or(attrs.release)
        .unwrap_or_else(|| format!("subtitle-{}", file.file_id));
    let match_method = if kind == SearchKind::Hash && attrs.moviehash_match {
        MatchMethod::ByFingerprint
    } else {
        MatchMethod::ByFilename
    };
    let title = attrs
        .feature_details
        .and_then(|f| f.title.or(f.movie_name));
    Some(Candidate {
        file_name,
        language_code: attrs.language.unwrap_or_default(),
        match_method,
        hearing_impaired: attrs.hearing_impaired,
        ai_translated: attrs.ai_translated || attrs.machine_translated,
        rating: attrs.ratings,
        download_count: attrs.download_count,
        download_ref: file.file_id.to_string(),
        format_extension: SUB_FORMAT.to_string(),
        title,
        source_group: 0,
    })
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Transient(err.to_string())
}

/// Pass successful responses through and classify the rest.
async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Map an unsuccessful status and its body to a service error.
fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    let api: ApiMessage = serde_json::from_str(body).unwrap_or_default();
    let detail = api
        .message
        .or_else(|| api.errors.first().cloned())
        .unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::NOT_ACCEPTABLE
        | StatusCode::REQUEST_TIMEOUT => ServiceError::Transient(detail),
        s if s.is_server_error() => ServiceError::Transient(detail),
        _ => ServiceError::Rejected(detail),
    }
}
