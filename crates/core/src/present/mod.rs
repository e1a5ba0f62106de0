//! Asking a human to choose a subtitle.
//!
//! A presenter renders the candidates it is given with the columns it is told
//! to show, and answers with an index into the list or `None` on cancel.
//! Which columns are shown is decided before a presenter is called.
//! Presenters also carry one-off notices, so a user without a terminal
//! still learns how a pass ended.

use crate::error::PresenterError;
use crate::search::{Candidate, MatchMethod};
use std::io::{BufRead, Write};

pub mod dialog;

pub use dialog::{KdialogPresenter, ZenityPresenter};

/// Extra columns shown next to each subtitle name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayColumns {
    pub hearing_impaired: bool,
    pub language: bool,
    pub match_method: bool,
    pub rating: bool,
    pub download_count: bool,
}

/// Everything a presenter needs to render one choice.
#[derive(Debug, Clone, Copy)]
pub struct SelectionPrompt<'a> {
    pub video_name: &'a str,
    pub title: Option<&'a str>,
    pub candidates: &'a [Candidate],
    pub columns: DisplayColumns,
}

impl SelectionPrompt<'_> {
    /// Number of candidates found by fingerprint.
    pub fn fingerprint_matches(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.is_fingerprint_match())
            .count()
    }

    /// Title to show, falling back to the video name.
    pub fn display_title(&self) -> &str {
        self.title.unwrap_or(self.video_name)
    }
}

/// Severity of a notice shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Capability to get a choice from a human.
pub trait InteractivePresenter {
    /// Show the candidates and return the chosen index, or `None` when the
    /// user cancels.
    fn present(&self, prompt: &SelectionPrompt<'_>) -> Result<Option<usize>, PresenterError>;

    /// Show a message that needs no answer. Backends without a message
    /// surface ignore it.
    fn notify(&self, _level: NoticeLevel, _title: &str, _text: &str) -> Result<(), PresenterError> {
        Ok(())
    }
}

/// Header and cells of the optional columns, in display order.
pub(crate) fn column_cells(
    columns: &DisplayColumns,
    c: &Candidate,
) -> Vec<(&'static str, String)> {
    let mut cells = Vec::new();
    if columns.hearing_impaired {
        let mark = if c.hearing_impaired { "✔" } else { "" };
        cells.push(("HI", mark.to_string()));
    }
    if columns.language {
        cells.push(("Language", c.language_code.clone()));
    }
    if columns.match_method {
        let method = match c.match_method {
            MatchMethod::ByFingerprint => "HASH",
            MatchMethod::ByFilename => "",
        };
        cells.push(("MatchedBy", method.to_string()));
    }
    if columns.rating {
        cells.push(("Rating", format!("{:.1}", c.rating)));
    }
    if columns.download_count {
        cells.push(("Downloads", c.download_count.to_string()));
    }
    cells
}

/// One line of text describing a candidate, used by text-based backends.
pub(crate) fn describe(columns: &DisplayColumns, c: &Candidate) -> String {
    let mut line = format!("\"{}\"", c.file_name);
    if columns.hearing_impaired && c.hearing_impaired {
        line.push_str(" > \"HI\"");
    }
    if columns.language {
        line.push_str(&format!(" > \"Language: {}\"", c.language_code));
    }
    if columns.match_method {
        let method = match c.match_method {
            MatchMethod::ByFingerprint => "hash",
            MatchMethod::ByFilename => "filename",
        };
        line.push_str(&format!(" > \"MatchedBy: {method}\""));
    }
    if columns.rating {
        line.push_str(&format!(" > \"Rating: {:.1}\"", c.rating));
    }
    if columns.download_count {
        line.push_str(&format!(" > \"Downloads: {}\"", c.download_count));
    }
    line
}

const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// Numbered list on the terminal; `0` cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPresenter;

impl InteractivePresenter for TerminalPresenter {
    fn present(&self, prompt: &SelectionPrompt<'_>) -> Result<Option<usize>, PresenterError> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        prompt_terminal(prompt, stdin.lock(), stdout.lock())
    }

    fn notify(&self, level: NoticeLevel, title: &str, text: &str) -> Result<(), PresenterError> {
        notice_terminal(level, title, text, std::io::stdout().lock())
    }
}

/// Print a notice as `>> title` followed by its text.
pub fn notice_terminal<W: Write>(
    level: NoticeLevel,
    title: &str,
    text: &str,
    mut output: W,
) -> Result<(), PresenterError> {
    let color = match level {
        NoticeLevel::Info => GREEN,
        NoticeLevel::Warning => YELLOW,
        NoticeLevel::Error => RED,
    };
    writeln!(output, "{color}>> {title}{RESET}")?;
    for line in text.lines().filter(|l| !l.is_empty()) {
        writeln!(output, ">> {line}")?;
    }
    output.flush()?;
    Ok(())
}

/// Print `prompt` to `output` and read choices from `input` until one is valid.
/// End of input counts as a cancel.
pub fn prompt_terminal<R: BufRead, W: Write>(
    prompt: &SelectionPrompt<'_>,
    mut input: R,
    mut output: W,
) -> Result<Option<usize>, PresenterError> {
    writeln!(output)?;
    writeln!(output, ">> Title: {}", prompt.display_title())?;
    writeln!(output, ">> Filename: {}", prompt.video_name)?;
    writeln!(output, ">> Available subtitles:")?;
    for (i, c) in prompt.candidates.iter().enumerate() {
        let color = if c.is_fingerprint_match() { GREEN } else { YELLOW };
        writeln!(output, "{color}[{}]{RESET} {}", i + 1, describe(&prompt.columns, c))?;
    }
    writeln!(output, "{RED}[0]{RESET} Cancel search")?;

    let count = prompt.candidates.len();
    let mut line = String::new();
    loop {
        write!(output, ">> Enter your choice (0-{count}): ")?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(None);
        }
        match line.trim().parse::<usize>() {
            Ok(0) => {
                writeln!(output, "Cancelling search...")?;
                return Ok(None);
            }
            Ok(n) if n <= count => return Ok(Some(n - 1)),
            _ => continue,
        }
    }
}
