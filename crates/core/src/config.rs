//! Run configuration shared by every stage of a pass.
//! A `Configuration` is built once from the command line and only read afterwards.

use crate::search::retry::RetryPolicy;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a mode or toggle string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} `{value}`, expected one of: {expected}")]
pub struct ParseModeError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseModeError {
    fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Which searches are issued for each language group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    Hash,
    Filename,
    #[default]
    HashThenFilename,
    HashAndFilename,
}

impl FromStr for SearchMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(Self::Hash),
            "filename" => Ok(Self::Filename),
            "hash_then_filename" => Ok(Self::HashThenFilename),
            "hash_and_filename" => Ok(Self::HashAndFilename),
            other => Err(ParseModeError::new(
                "search mode",
                other,
                "hash, filename, hash_then_filename, hash_and_filename",
            )),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hash => "hash",
            Self::Filename => "filename",
            Self::HashThenFilename => "hash_then_filename",
            Self::HashAndFilename => "hash_and_filename",
        })
    }
}

/// Governs whether and when a human is asked to choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Always prompt, even for a unique fingerprint match.
    Manual,
    /// Prompt unless a unique fingerprint match exists.
    #[default]
    Default,
    /// Never prompt.
    Auto,
}

impl FromStr for SelectionPolicy {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "default" => Ok(Self::Default),
            "auto" => Ok(Self::Auto),
            other => Err(ParseModeError::new(
                "selection mode",
                other,
                "manual, default, auto",
            )),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Default => "default",
            Self::Auto => "auto",
        })
    }
}

/// Tri-state switch used for display columns and the language suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    On,
    Off,
    #[default]
    Auto,
}

impl Toggle {
    /// Turn the toggle into a concrete value, using `when_auto` for `Auto`.
    pub fn resolve(self, when_auto: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Auto => when_auto,
        }
    }
}

impl FromStr for Toggle {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "auto" => Ok(Self::Auto),
            other => Err(ParseModeError::new("toggle", other, "on, off, auto")),
        }
    }
}

/// One top-level language request. Several codes in one group are searched
/// together and the first found wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageGroup {
    codes: Vec<String>,
}

impl LanguageGroup {
    /// Parse a comma-joined group such as `en,fr`. Returns `None` when empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let codes: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if codes.is_empty() {
            None
        } else {
            Some(Self { codes })
        }
    }

    /// Codes of this group in request order.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Value sent to the remote service for this group.
    pub fn query_value(&self) -> String {
        self.codes.join(",")
    }
}

impl fmt::Display for LanguageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query_value())
    }
}

/// Ordered language request; order encodes priority for automatic selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRequest {
    groups: Vec<LanguageGroup>,
}

impl Default for LanguageRequest {
    fn default() -> Self {
        Self {
            groups: vec![LanguageGroup {
                codes: vec!["en".to_string()],
            }],
        }
    }
}

impl LanguageRequest {
    /// Build a request from raw `-l` values. Empty values are ignored and an
    /// empty result falls back to the default request.
    pub fn parse<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups: Vec<LanguageGroup> = values
            .into_iter()
            .filter_map(|v| LanguageGroup::parse(v.as_ref()))
            .collect();
        if groups.is_empty() {
            Self::default()
        } else {
            Self { groups }
        }
    }

    /// Groups in request order.
    pub fn groups(&self) -> &[LanguageGroup] {
        &self.groups
    }

    /// Number of individual language codes over all groups.
    pub fn total_languages(&self) -> usize {
        self.groups.iter().map(|g| g.codes.len()).sum()
    }

    /// First code of the first group.
    pub fn first_code(&self) -> &str {
        self.groups
            .first()
            .and_then(|g| g.codes.first())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Codes ordered by ascending weight: a code's index is its weight.
    ///
    /// A single group is reversed, so its first-listed code weighs the most.
    /// Several groups keep their listed order, so the last-listed group
    /// weighs the most.
    pub fn priority_table(&self) -> Vec<String> {
        match self.groups.as_slice() {
            [single] => single.codes.iter().rev().cloned().collect(),
            groups => groups.iter().flat_map(|g| g.codes.iter().cloned()).collect(),
        }
    }
}

/// Which extra columns a presenter shows next to the subtitle name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPrefs {
    pub hearing_impaired: Toggle,
    pub language: Toggle,
    pub match_method: Toggle,
    pub rating: Toggle,
    pub download_count: Toggle,
}

impl Default for DisplayPrefs {
    fn default() -> Self {
        Self {
            hearing_impaired: Toggle::Auto,
            language: Toggle::Auto,
            match_method: Toggle::Auto,
            rating: Toggle::Off,
            download_count: Toggle::Off,
        }
    }
}

/// Immutable settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub search_mode: SearchMode,
    pub selection: SelectionPolicy,
    pub languages: LanguageRequest,
    pub exclude_hearing_impaired: bool,
    pub exclude_ai_translated: bool,
    /// Write subtitles into this directory instead of next to the video.
    pub output_dir: Option<PathBuf>,
    pub language_suffix: Toggle,
    pub language_separator: String,
    pub display: DisplayPrefs,
    /// Search even when a subtitle file already sits next to the video.
    pub overwrite: bool,
    /// Drop results already returned by the other search in `HashAndFilename` mode.
    pub dedupe: bool,
    pub retry: RetryPolicy,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::default(),
            selection: SelectionPolicy::default(),
            languages: LanguageRequest::default(),
            exclude_hearing_impaired: false,
            exclude_ai_translated: false,
            output_dir: None,
            language_suffix: Toggle::Auto,
            language_separator: "_".to_string(),
            display: DisplayPrefs::default(),
            overwrite: false,
            dedupe: false,
            retry: RetryPolicy::default(),
        }
    }
}
