//! Automatic choice among candidates.
//!
//! Each candidate gets an integer score: 100 per step of language priority,
//! one point for a fingerprint match and one point per (subtitle token,
//! video token) pair that are equal. The highest score wins and ties keep the
//! earliest candidate, so the order of the candidate set matters.

use crate::config::LanguageRequest;
use crate::search::candidates::CandidateSet;
use crate::search::Candidate;
use tracing::{debug, trace};

/// Weight of one step in the language priority table.
const LANGUAGE_WEIGHT: i64 = 100;

/// Split a file name into lowercase tokens on `.`, `-`, `_` and spaces.
/// Empty tokens are kept.
pub fn tokenize(name: &str) -> Vec<String> {
    name.replace(['-', ' ', '_'], ".")
        .to_lowercase()
        .split('.')
        .map(str::to_string)
        .collect()
}

/// Scores candidates against one video and one language request.
#[derive(Debug, Clone)]
pub struct AutoScorer {
    video_tokens: Vec<String>,
    priority: Vec<String>,
}

impl AutoScorer {
    /// Scorer for the video named `video_name` under the priorities of `languages`.
    pub fn new(video_name: &str, languages: &LanguageRequest) -> Self {
        Self {
            video_tokens: tokenize(video_name),
            priority: languages.priority_table(),
        }
    }

    /// Index of `code` in the priority table, 0 when absent.
    fn language_weight(&self, code: &str) -> i64 {
        self.priority
            .iter()
            .position(|p| p.eq_ignore_ascii_case(code))
            .unwrap_or(0) as i64
    }

    /// Integer score of `candidate`; higher is better.
    pub fn score(&self, candidate: &Candidate) -> i64 {
        let mut score = LANGUAGE_WEIGHT * self.language_weight(&candidate.language_code);
        if candidate.is_fingerprint_match() {
            score += 1;
        }
        for token in tokenize(&candidate.file_name) {
            score += self.video_tokens.iter().filter(|v| **v == token).count() as i64;
        }
        score
    }

    /// Pick the best candidate, returning its name and index.
    /// Only a strictly greater score replaces the current best.
    pub fn pick<'a>(&self, set: &'a CandidateSet) -> Option<(&'a str, usize)> {
        let mut best: Option<(usize, i64)> = None;
        for (i, candidate) in set.candidates().iter().enumerate() {
            let score = self.score(candidate);
            trace!("score {score} for {}", candidate.file_name);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, score)| {
            let name = set.candidates()[i].file_name.as_str();
            debug!("auto-selected {name} with score {score}");
            (name, i)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{CandidateBatch, MatchMethod};

    fn set_of(candidates: Vec<Candidate>) -> CandidateSet {
        let mut set = CandidateSet::new(1);
        set.push_batch(0, CandidateBatch::new(candidates));
        set
    }

    fn sub(name: &str, lang: &str, method: MatchMethod) -> Candidate {
        Candidate::new(name, lang, method, name)
    }

    #[test]
    fn tokenizes_like_the_service_names_files() {
        assert_eq!(
            tokenize("My_Movie - 2020.1080p"),
            vec!["my", "movie", "", "", "2020", "1080p"]
        );
    }

    #[test]
    fn prefers_larger_token_overlap() {
        let scorer = AutoScorer::new("Movie.S01E02.1080p.mkv", &LanguageRequest::parse(["eng"]));
        let set = set_of(vec![
            sub("Movie.S01E02.720p.srt", "eng", MatchMethod::ByFilename),
            sub("Movie.S01E02.1080p.WEB.srt", "eng", MatchMethod::ByFilename),
        ]);
        assert_eq!(scorer.score(&set.candidates()[0]), 2);
        assert_eq!(scorer.score(&set.candidates()[1]), 3);
        assert_eq!(scorer.pick(&set), Some(("Movie.S01E02.1080p.WEB.srt", 1)));
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let scorer = AutoScorer::new("Movie.mkv", &LanguageRequest::parse(["eng"]));
        let set = set_of(vec![
            sub("Movie.A.srt", "eng", MatchMethod::ByFilename),
            sub("Movie.B.srt", "eng", MatchMethod::ByFilename),
        ]);
        assert_eq!(scorer.pick(&set), Some(("Movie.A.srt", 0)));
    }

    #[test]
    fn last_listed_language_group_wins() {
        let scorer = AutoScorer::new("Movie.mkv", &LanguageRequest::parse(["fre", "eng"]));
        let set = set_of(vec![
            sub("Movie.srt", "fre", MatchMethod::ByFilename),
            sub("Movie.srt", "eng", MatchMethod::ByFilename),
        ]);
        assert_eq!(scorer.pick(&set).map(|(_, i)| i), Some(1));
    }

    #[test]
    fn first_code_of_a_single_group_wins() {
        let scorer = AutoScorer::new("Movie.mkv", &LanguageRequest::parse(["fre,eng"]));
        let set = set_of(vec![
            sub("Movie.srt", "eng", MatchMethod::ByFilename),
            sub("Movie.srt", "fre", MatchMethod::ByFilename),
        ]);
        assert_eq!(scorer.pick(&set).map(|(_, i)| i), Some(1));
    }

    #[test]
    fn fingerprint_match_breaks_an_otherwise_equal_score() {
        let scorer = AutoScorer::new("Movie.mkv", &LanguageRequest::parse(["eng"]));
        let set = set_of(vec![
            sub("Movie.srt", "eng", MatchMethod::ByFilename),
            sub("Movie.srt", "eng", MatchMethod::ByFingerprint),
        ]);
        assert_eq!(scorer.pick(&set).map(|(_, i)| i), Some(1));
    }

    /// A repeated token counts once for every equal video token.
    #[test]
    fn repeated_tokens_are_counted_every_time() {
        let scorer = AutoScorer::new("movie.movie.mkv", &LanguageRequest::parse(["eng"]));
        let candidate = sub("movie.srt", "eng", MatchMethod::ByFilename);
        assert_eq!(scorer.score(&candidate), 2);
    }

    #[test]
    fn unknown_language_weighs_nothing() {
        let scorer = AutoScorer::new("x.mkv", &LanguageRequest::parse(["fre", "eng"]));
        let candidate = sub("y.srt", "ger", MatchMethod::ByFilename);
        assert_eq!(scorer.score(&candidate), 0);
    }

    #[test]
    fn empty_set_has_no_pick() {
        let scorer = AutoScorer::new("x.mkv", &LanguageRequest::default());
        assert_eq!(scorer.pick(&CandidateSet::default()), None);
    }
}
