//! Desktop dialog presenters backed by `zenity` and `kdialog`.
//! Both dialogs are given each candidate's index as a hidden key, so the
//! answer maps back to exactly one candidate even when names repeat.

use super::{column_cells, describe, InteractivePresenter, NoticeLevel, SelectionPrompt};
use crate::error::PresenterError;
use std::process::{Command, Output};
use tracing::trace;

/// Default dialog width in pixels.
pub const DEFAULT_WIDTH: u32 = 720;
/// Default dialog height in pixels.
pub const DEFAULT_HEIGHT: u32 = 320;

/// GTK list dialog through `zenity --list`.
#[derive(Debug, Clone, Copy)]
pub struct ZenityPresenter {
    pub width: u32,
    pub height: u32,
}

impl Default for ZenityPresenter {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Escape text for Pango markup used in zenity's `--text`.
fn markup_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build the zenity arguments for `prompt`.
/// The first column holds the candidate index and is hidden but printed.
pub fn zenity_args(prompt: &SelectionPrompt<'_>, width: u32, height: u32) -> Vec<String> {
    let title = markup_escape(prompt.display_title());
    let file = markup_escape(prompt.video_name);
    let by_hash = prompt.fingerprint_matches();
    let (window_title, text, list_header) = if by_hash == prompt.candidates.len() {
        (
            format!("Synchronized subtitles for: {}", prompt.display_title()),
            format!("<b>Title:</b> {title}\n<b>Filename:</b> {file}"),
            "Available subtitles (synchronized)",
        )
    } else if by_hash == 0 {
        (
            "Subtitles found!".to_string(),
            format!(
                "<b>Filename:</b> {file}\n<b>&gt;&gt; These results come from search by file name (not using movie hash) and may be unreliable...</b>"
            ),
            "Available subtitles",
        )
    } else {
        (
            format!("Subtitles for: {}", prompt.display_title()),
            format!("<b>Title:</b> {title}\n<b>Filename:</b> {file}"),
            "Available subtitles",
        )
    };

    let mut args = vec![
        "--list".to_string(),
        format!("--width={width}"),
        format!("--height={height}"),
        format!("--title={window_title}"),
        format!("--text={text}"),
        "--column=#".to_string(),
        format!("--column={list_header}"),
    ];
    if let Some(first) = prompt.candidates.first() {
        for (header, _) in column_cells(&prompt.columns, first) {
            args.push(format!("--column={header}"));
        }
    }
    args.push("--hide-column=1".to_string());
    args.push("--print-column=1".to_string());
    for (i, c) in prompt.candidates.iter().enumerate() {
        args.push(i.to_string());
        args.push(c.file_name.clone());
        args.extend(column_cells(&prompt.columns, c).into_iter().map(|(_, v)| v));
    }
    args
}

/// Interpret what zenity printed. An empty answer with exit status 0 means
/// the user confirmed without selecting, which picks the first entry.
pub fn parse_zenity_answer(stdout: &str) -> Result<usize, PresenterError> {
    let answer = stdout.trim();
    if answer.is_empty() {
        return Ok(0);
    }
    // Some zenity versions print the key column twice as `3|3`.
    let key = answer.split('|').next().unwrap_or(answer);
    key.trim()
        .parse()
        .map_err(|_| PresenterError::InvalidAnswer(answer.to_string()))
}

/// Build the zenity arguments for a message box.
pub fn zenity_notice_args(level: NoticeLevel, title: &str, text: &str, width: u32) -> Vec<String> {
    let kind = match level {
        NoticeLevel::Info => "--info",
        NoticeLevel::Warning => "--warning",
        NoticeLevel::Error => "--error",
    };
    vec![
        kind.to_string(),
        format!("--width={width}"),
        format!("--title={title}"),
        format!("--text={}", markup_escape(text)),
    ]
}

impl InteractivePresenter for ZenityPresenter {
    fn notify(&self, level: NoticeLevel, title: &str, text: &str) -> Result<(), PresenterError> {
        let args = zenity_notice_args(level, title, text, self.width);
        trace!("zenity {:?}", args);
        // Closing the box is as good as acknowledging it.
        run("zenity", &args).map(|_| ())
    }

    fn present(&self, prompt: &SelectionPrompt<'_>) -> Result<Option<usize>, PresenterError> {
        let args = zenity_args(prompt, self.width, self.height);
        trace!("zenity {:?}", args);
        let output = run("zenity", &args)?;
        match output.status.code() {
            Some(0) => parse_zenity_answer(&String::from_utf8_lossy(&output.stdout)).map(Some),
            Some(1) => Ok(None),
            code => Err(PresenterError::Failed {
                program: "zenity",
                code,
            }),
        }
    }
}

/// KDE menu dialog through `kdialog --menu`.
#[derive(Debug, Clone, Copy)]
pub struct KdialogPresenter {
    pub width: u32,
    pub height: u32,
}

impl Default for KdialogPresenter {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Build the kdialog arguments for `prompt`: one `tag label` pair per
/// candidate, the tag being its index.
pub fn kdialog_args(prompt: &SelectionPrompt<'_>, width: u32, height: u32) -> Vec<String> {
    let mut args = vec![
        format!("--title=Subtitles for: {}", prompt.display_title()),
        format!("--geometry={width}x{height}"),
        "--menu".to_string(),
        format!("Filename: {}", prompt.video_name),
    ];
    for (i, c) in prompt.candidates.iter().enumerate() {
        args.push(i.to_string());
        args.push(describe(&prompt.columns, c));
    }
    args
}

/// Build the kdialog arguments for a message box.
pub fn kdialog_notice_args(level: NoticeLevel, title: &str, text: &str) -> Vec<String> {
    let kind = match level {
        NoticeLevel::Info => "--msgbox",
        NoticeLevel::Warning => "--sorry",
        NoticeLevel::Error => "--error",
    };
    vec![
        format!("--title={title}"),
        kind.to_string(),
        text.to_string(),
    ]
}

impl InteractivePresenter for KdialogPresenter {
    fn notify(&self, level: NoticeLevel, title: &str, text: &str) -> Result<(), PresenterError> {
        let args = kdialog_notice_args(level, title, text);
        trace!("kdialog {:?}", args);
        run("kdialog", &args).map(|_| ())
    }

    fn present(&self, prompt: &SelectionPrompt<'_>) -> Result<Option<usize>, PresenterError> {
        let args = kdialog_args(prompt, self.width, self.height);
        trace!("kdialog {:?}", args);
        let output = run("kdialog", &args)?;
        match output.status.code() {
            Some(0) => {
                let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
                answer
                    .parse()
                    .map(Some)
                    .map_err(|_| PresenterError::InvalidAnswer(answer))
            }
            Some(1) => Ok(None),
            code => Err(PresenterError::Failed {
                program: "kdialog",
                code,
            }),
        }
    }
}

fn run(program: &'static str, args: &[String]) -> Result<Output, PresenterError> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(|source| PresenterError::Launch { program, source })
}
