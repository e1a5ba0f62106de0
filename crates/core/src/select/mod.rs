//! Narrowing a candidate set to the one subtitle that gets downloaded.
//!
//! An empty set ends the pass. A single fingerprint match is taken as is
//! unless the policy is `Manual`. Anything else goes to the auto scorer or
//! to the presenter, depending on the policy.

use crate::config::{Configuration, DisplayPrefs, SearchMode, SelectionPolicy};
use crate::error::PresenterError;
use crate::fingerprint::VideoFile;
use crate::present::{DisplayColumns, InteractivePresenter, SelectionPrompt};
use crate::search::candidates::CandidateSet;
use tracing::{debug, info};

pub mod scorer;

pub use scorer::AutoScorer;

/// State reached once the search has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triage {
    Empty,
    OneHashMatch,
    MultipleCandidates,
}

/// Classify a finished search under `policy`.
pub fn triage(set: &CandidateSet, policy: SelectionPolicy) -> Triage {
    match set.candidates() {
        [] => Triage::Empty,
        [only] if only.is_fingerprint_match() && policy != SelectionPolicy::Manual => {
            Triage::OneHashMatch
        }
        _ => Triage::MultipleCandidates,
    }
}

/// How a candidate came to be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedBy {
    OneHashMatch,
    AutoScore,
    User,
}

/// Terminal state of the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The search found nothing.
    Empty,
    Selected { index: usize, by: SelectedBy },
    /// The user declined every candidate.
    Cancelled,
}

/// Resolve `auto` display preferences against the data actually present.
pub fn resolve_columns(
    prefs: &DisplayPrefs,
    set: &CandidateSet,
    search_mode: SearchMode,
) -> DisplayColumns {
    let candidates = set.candidates();
    DisplayColumns {
        hearing_impaired: prefs
            .hearing_impaired
            .resolve(candidates.iter().any(|c| c.hearing_impaired)),
        language: prefs.language.resolve(set.languages_requested() > 1),
        match_method: prefs
            .match_method
            .resolve(search_mode == SearchMode::HashAndFilename),
        rating: prefs.rating.resolve(candidates.iter().any(|c| c.rating != 0.0)),
        download_count: prefs.download_count.resolve(true),
    }
}

/// Applies the selection policy of a configuration.
pub struct SelectionEngine<'a> {
    config: &'a Configuration,
    presenter: &'a dyn InteractivePresenter,
}

impl<'a> SelectionEngine<'a> {
    /// Engine applying `config.selection`, asking through `presenter` when needed.
    pub fn new(config: &'a Configuration, presenter: &'a dyn InteractivePresenter) -> Self {
        Self { config, presenter }
    }

    /// Choose one candidate of `set` for `video`.
    pub fn select(&self, video: &VideoFile, set: &CandidateSet) -> Result<Selection, PresenterError> {
        let policy = self.config.selection;
        match triage(set, policy) {
            Triage::Empty => Ok(Selection::Empty),
            Triage::OneHashMatch => {
                debug!("single fingerprint match, selecting it without asking");
                Ok(Selection::Selected {
                    index: 0,
                    by: SelectedBy::OneHashMatch,
                })
            }
            Triage::MultipleCandidates if policy == SelectionPolicy::Auto => {
                let scorer = AutoScorer::new(video.display_name(), &self.config.languages);
                // A non-empty set always has a best candidate.
                Ok(scorer
                    .pick(set)
                    .map(|(_, index)| Selection::Selected {
                        index,
                        by: SelectedBy::AutoScore,
                    })
                    .unwrap_or(Selection::Empty))
            }
            Triage::MultipleCandidates => self.ask(video, set),
        }
    }

    fn ask(&self, video: &VideoFile, set: &CandidateSet) -> Result<Selection, PresenterError> {
        let columns = resolve_columns(&self.config.display, set, self.config.search_mode);
        debug!("asking the user to choose among {} candidates", set.len());
        let prompt = SelectionPrompt {
            video_name: video.display_name(),
            title: set.title(),
            candidates: set.candidates(),
            columns,
        };
        match self.presenter.present(&prompt)? {
            Some(index) if index < set.len() => Ok(Selection::Selected {
                index,
                by: SelectedBy::User,
            }),
            Some(index) => Err(PresenterError::OutOfRange {
                index,
                len: set.len(),
            }),
            None => {
                info!("subtitle selection cancelled for {}", video.display_name());
                Ok(Selection::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LanguageRequest, Toggle};
    use crate::search::{Candidate, CandidateBatch, MatchMethod};
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Presenter replaying a fixed answer and recording what it was shown.
    struct ScriptedPresenter {
        answer: Option<usize>,
        shown: RefCell<Vec<(usize, DisplayColumns)>>,
    }

    impl ScriptedPresenter {
        fn answering(answer: Option<usize>) -> Self {
            Self {
                answer,
                shown: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.shown.borrow().len()
        }
    }

    impl InteractivePresenter for ScriptedPresenter {
        fn present(&self, prompt: &SelectionPrompt<'_>) -> Result<Option<usize>, PresenterError> {
            self.shown
                .borrow_mut()
                .push((prompt.candidates.len(), prompt.columns));
            Ok(self.answer)
        }
    }

    fn video() -> VideoFile {
        VideoFile::from_parts(PathBuf::from("/v/Movie.mkv"), 131072, "0".repeat(16))
    }

    fn set_of(langs: usize, batches: Vec<Vec<Candidate>>) -> CandidateSet {
        let mut set = CandidateSet::new(langs);
        for (group, batch) in batches.into_iter().enumerate() {
            set.push_batch(group, CandidateBatch::new(batch));
        }
        set
    }

    fn config(policy: SelectionPolicy) -> Configuration {
        Configuration {
            selection: policy,
            ..Configuration::default()
        }
    }

    fn hash_sub(name: &str) -> Candidate {
        Candidate::new(name, "en", MatchMethod::ByFingerprint, name)
    }

    fn name_sub(name: &str) -> Candidate {
        Candidate::new(name, "en", MatchMethod::ByFilename, name)
    }

    #[test]
    fn empty_set_is_empty_for_every_policy() {
        let presenter = ScriptedPresenter::answering(Some(0));
        for policy in [SelectionPolicy::Manual, SelectionPolicy::Default, SelectionPolicy::Auto] {
            let cfg = config(policy);
            let engine = SelectionEngine::new(&cfg, &presenter);
            let selection = engine.select(&video(), &CandidateSet::new(1)).unwrap();
            assert_eq!(selection, Selection::Empty);
        }
        assert_eq!(presenter.calls(), 0);
    }

    #[test]
    fn single_hash_match_skips_the_presenter() {
        let set = set_of(1, vec![vec![hash_sub("a.srt")]]);
        for policy in [SelectionPolicy::Default, SelectionPolicy::Auto] {
            let presenter = ScriptedPresenter::answering(None);
            let cfg = config(policy);
            let selection = SelectionEngine::new(&cfg, &presenter)
                .select(&video(), &set)
                .unwrap();
            assert_eq!(
                selection,
                Selection::Selected {
                    index: 0,
                    by: SelectedBy::OneHashMatch
                }
            );
            assert_eq!(presenter.calls(), 0);
        }
    }

    #[test]
    fn manual_policy_always_asks() {
        let set = set_of(1, vec![vec![hash_sub("a.srt")]]);
        let presenter = ScriptedPresenter::answering(Some(0));
        let cfg = config(SelectionPolicy::Manual);
        let selection = SelectionEngine::new(&cfg, &presenter)
            .select(&video(), &set)
            .unwrap();
        assert_eq!(
            selection,
            Selection::Selected {
                index: 0,
                by: SelectedBy::User
            }
        );
        assert_eq!(presenter.calls(), 1);
    }

    #[test]
    fn single_filename_match_still_asks_in_default_mode() {
        let set = set_of(1, vec![vec![name_sub("a.srt")]]);
        assert_eq!(
            triage(&set, SelectionPolicy::Default),
            Triage::MultipleCandidates
        );
        let presenter = ScriptedPresenter::answering(None);
        let cfg = config(SelectionPolicy::Default);
        let selection = SelectionEngine::new(&cfg, &presenter)
            .select(&video(), &set)
            .unwrap();
        assert_eq!(selection, Selection::Cancelled);
    }

    #[test]
    fn auto_policy_never_asks() {
        let set = set_of(1, vec![vec![name_sub("Other.srt"), name_sub("Movie.srt")]]);
        let presenter = ScriptedPresenter::answering(None);
        let cfg = config(SelectionPolicy::Auto);
        let selection = SelectionEngine::new(&cfg, &presenter)
            .select(&video(), &set)
            .unwrap();
        assert_eq!(
            selection,
            Selection::Selected {
                index: 1,
                by: SelectedBy::AutoScore
            }
        );
        assert_eq!(presenter.calls(), 0);
    }

    #[test]
    fn out_of_range_answer_is_an_error() {
        let set = set_of(1, vec![vec![name_sub("a.srt"), name_sub("b.srt")]]);
        let presenter = ScriptedPresenter::answering(Some(5));
        let cfg = config(SelectionPolicy::Default);
        let err = SelectionEngine::new(&cfg, &presenter)
            .select(&video(), &set)
            .unwrap_err();
        assert!(matches!(err, PresenterError::OutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn columns_are_resolved_before_presenting() {
        let mut hi = name_sub("a.srt");
        hi.hearing_impaired = true;
        let set = set_of(2, vec![vec![hi], vec![name_sub("b.srt")]]);
        let presenter = ScriptedPresenter::answering(Some(1));
        let cfg = Configuration {
            selection: SelectionPolicy::Default,
            languages: LanguageRequest::parse(["en", "fr"]),
            ..Configuration::default()
        };
        SelectionEngine::new(&cfg, &presenter)
            .select(&video(), &set)
            .unwrap();
        let shown = presenter.shown.borrow();
        assert_eq!(
            shown[0],
            (
                2,
                DisplayColumns {
                    hearing_impaired: true,
                    language: true,
                    match_method: false,
                    rating: false,
                    download_count: false,
                }
            )
        );
    }

    #[test]
    fn auto_columns_follow_the_data() {
        let mut rated = name_sub("a.srt");
        rated.rating = 6.5;
        let set = set_of(1, vec![vec![rated]]);
        let prefs = DisplayPrefs {
            hearing_impaired: Toggle::Auto,
            language: Toggle::Auto,
            match_method: Toggle::Auto,
            rating: Toggle::Auto,
            download_count: Toggle::Auto,
        };
        let columns = resolve_columns(&prefs, &set, SearchMode::HashAndFilename);
        assert_eq!(
            columns,
            DisplayColumns {
                hearing_impaired: false,
                language: false,
                match_method: true,
                rating: true,
                download_count: true,
            }
        );
    }
}
