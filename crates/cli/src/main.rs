//! Binary entry point: finds and downloads subtitles for the given videos.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use subpick_core::config::{
    Configuration, DisplayPrefs, LanguageRequest, SearchMode, SelectionPolicy, Toggle,
};
use subpick_core::present::{
    InteractivePresenter, KdialogPresenter, NoticeLevel, TerminalPresenter, ZenityPresenter,
};
use subpick_core::search::opensubtitles::OpenSubtitlesClient;
use subpick_core::search::retry::RetryPolicy;
use subpick_core::session::{PassOutcome, Session};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod files;

/// Pause between two videos, to stay under the service's rate limit.
const INTER_FILE_DELAY: Duration = Duration::from_millis(500);

/// Presenter backend used when a choice has to be made by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Gui {
    /// Pick from the desktop environment.
    Auto,
    /// zenity dialogs.
    Gnome,
    /// kdialog dialogs.
    Kde,
    /// Numbered list on the terminal.
    Cli,
}

/// Command line options for the binary.
#[derive(Parser, Debug)]
#[command(name = "subpick", version, about)]
struct Cli {
    /// Presenter backend.
    #[arg(short, long, value_enum, default_value = "auto")]
    gui: Gui,

    /// Shorthand for `--gui cli`.
    #[arg(long)]
    cli: bool,

    /// hash, filename, hash_then_filename or hash_and_filename.
    #[arg(short, long, default_value = "hash_then_filename")]
    search: SearchMode,

    /// manual, default or auto.
    #[arg(short = 't', long = "select", default_value = "default")]
    select: SelectionPolicy,

    /// Shorthand for `--select auto`.
    #[arg(short, long)]
    auto: bool,

    /// Language to search for. Repeat for several; `en,fr` is one group.
    #[arg(short, long = "lang")]
    lang: Vec<String>,

    /// Write subtitles into this directory instead of next to the video.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append the language code to the subtitle name: on, off or auto.
    #[arg(long, default_value = "auto")]
    suffix: Toggle,

    /// Separator placed before the language code.
    #[arg(long, default_value = "_")]
    separator: String,

    /// Leave out hearing-impaired subtitles.
    #[arg(long)]
    skip_hi: bool,

    /// Leave out machine or AI translated subtitles.
    #[arg(long)]
    skip_ai: bool,

    /// Search even when a subtitle already exists.
    #[arg(long)]
    overwrite: bool,

    /// Drop duplicate results in hash_and_filename mode.
    #[arg(long)]
    dedupe: bool,

    /// Show the hearing-impaired column: on, off or auto.
    #[arg(long, default_value = "auto")]
    show_hi: Toggle,

    /// Show the language column: on, off or auto.
    #[arg(long, default_value = "auto")]
    show_lang: Toggle,

    /// Show how each subtitle was matched: on, off or auto.
    #[arg(long, default_value = "auto")]
    show_match: Toggle,

    /// Show the rating column: on, off or auto.
    #[arg(long, default_value = "off")]
    show_rating: Toggle,

    /// Show the download count column: on, off or auto.
    #[arg(long, default_value = "off")]
    show_count: Toggle,

    /// Seconds to wait before retrying a failed service call.
    #[arg(long, default_value_t = 3)]
    retry_delay: u64,

    /// OpenSubtitles API key.
    #[arg(long, env = "OPENSUBTITLES_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Enable verbose debug and trace logs.
    #[arg(short, long)]
    verbose: bool,

    /// Video files or directories to process.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

impl Cli {
    fn configuration(&self) -> Configuration {
        Configuration {
            search_mode: self.search,
            selection: if self.auto {
                SelectionPolicy::Auto
            } else {
                self.select
            },
            languages: LanguageRequest::parse(&self.lang),
            exclude_hearing_impaired: self.skip_hi,
            exclude_ai_translated: self.skip_ai,
            output_dir: self.output.clone(),
            language_suffix: self.suffix,
            language_separator: self.separator.clone(),
            display: DisplayPrefs {
                hearing_impaired: self.show_hi,
                language: self.show_lang,
                match_method: self.show_match,
                rating: self.show_rating,
                download_count: self.show_count,
            },
            overwrite: self.overwrite,
            dedupe: self.dedupe,
            retry: RetryPolicy {
                delay: Duration::from_secs(self.retry_delay),
                ..RetryPolicy::default()
            },
        }
    }

    fn gui(&self) -> Gui {
        if self.cli {
            Gui::Cli
        } else {
            self.gui
        }
    }
}

/// Resolve `Gui::Auto` from the desktop session name.
fn resolve_gui(gui: Gui, desktop: Option<&str>) -> Gui {
    if gui != Gui::Auto {
        return gui;
    }
    let desktop = desktop.unwrap_or_default().to_ascii_uppercase();
    if desktop.contains("KDE") {
        Gui::Kde
    } else if ["GNOME", "CINNAMON", "MATE", "XFCE", "UNITY", "BUDGIE", "LXDE"]
        .iter()
        .any(|name| desktop.contains(name))
    {
        Gui::Gnome
    } else {
        Gui::Cli
    }
}

fn presenter_for(gui: Gui) -> Box<dyn InteractivePresenter> {
    match gui {
        Gui::Gnome => Box::new(ZenityPresenter::default()),
        Gui::Kde => Box::new(KdialogPresenter::default()),
        Gui::Auto | Gui::Cli => Box::new(TerminalPresenter),
    }
}

/// Outcome counts over every processed video.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    downloaded: usize,
    nothing: usize,
    failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: &PassOutcome) {
        if outcome.is_download() {
            self.downloaded += 1;
        } else {
            self.nothing += 1;
        }
    }

    /// 2 if any video failed, else 0 if any subtitle was downloaded, else 1.
    fn exit_code(&self) -> u8 {
        if self.failed > 0 {
            2
        } else if self.downloaded > 0 {
            0
        } else {
            1
        }
    }
}

/// Message shown through the presenter once a pass has ended.
#[derive(Debug, PartialEq, Eq)]
struct Notice {
    level: NoticeLevel,
    title: &'static str,
    text: String,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string()
}

/// Notice for a pass that ended without error. Downloads and cancels need none.
fn outcome_notice(video: &Path, outcome: &PassOutcome, languages: &LanguageRequest) -> Option<Notice> {
    match outcome {
        PassOutcome::Downloaded(_) | PassOutcome::Cancelled => None,
        PassOutcome::NothingFound => {
            let requested = languages
                .groups()
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Some(Notice {
                level: NoticeLevel::Info,
                title: "No subtitles found",
                text: format!(
                    "No subtitles available in {requested} for:\n{}",
                    file_name(video)
                ),
            })
        }
        PassOutcome::Skipped(existing) => Some(Notice {
            level: NoticeLevel::Info,
            title: "Subtitles already downloaded",
            text: format!(
                "A subtitles file already exists for:\n{}\n\n{}",
                file_name(video),
                existing.display()
            ),
        }),
    }
}

/// Notice for a failed pass.
fn failure_notice(err: &anyhow::Error, auth: bool) -> Notice {
    let text = if auth {
        format!("{err:#}\n\nCheck the OpenSubtitles API key.")
    } else {
        format!("{err:#}")
    };
    Notice {
        level: NoticeLevel::Error,
        title: "Subtitle download failed",
        text,
    }
}

fn show(presenter: &dyn InteractivePresenter, notice: &Notice) {
    if let Err(err) = presenter.notify(notice.level, notice.title, &notice.text) {
        warn!("could not show \"{}\": {err}", notice.title);
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::default()
            .add_directive("subpick=trace".parse()?)
            .add_directive("subpick_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("subpick=info".parse()?)
            .add_directive("subpick_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Application entry point which parses CLI args and runs one pass per video.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = cli.configuration();
    let client = OpenSubtitlesClient::new(&cli.api_key)
        .context("failed to build the HTTP client")?
        .with_exclusions(config.exclude_hearing_impaired, config.exclude_ai_translated);
    let desktop = std::env::var("XDG_CURRENT_DESKTOP")
        .or_else(|_| std::env::var("DESKTOP_SESSION"))
        .ok();
    let presenter = presenter_for(resolve_gui(cli.gui(), desktop.as_deref()));
    let session = Session::new(&client, presenter.as_ref(), &config);

    let videos = files::gather_videos(&cli.paths)?;
    if videos.is_empty() {
        warn!("no video file to process");
        return Ok(ExitCode::from(1));
    }

    let mut summary = Summary::default();
    for (i, video) in videos.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(INTER_FILE_DELAY).await;
        }
        let result = session
            .run(video)
            .await
            .with_context(|| format!("failed to get subtitles for {}", video.display()));
        match result {
            Ok(outcome) => {
                match &outcome {
                    PassOutcome::Downloaded(path) => info!("downloaded {}", path.display()),
                    PassOutcome::NothingFound => {
                        info!("no subtitles found for {}", video.display())
                    }
                    PassOutcome::Cancelled => info!("skipped {} at user request", video.display()),
                    PassOutcome::Skipped(path) => {
                        info!("{} already has {}", video.display(), path.display())
                    }
                }
                if let Some(notice) = outcome_notice(video, &outcome, &config.languages) {
                    show(presenter.as_ref(), &notice);
                }
                summary.record(&outcome);
            }
            Err(err) => {
                error!("{err:#}");
                summary.failed += 1;
                let auth = err
                    .downcast_ref::<subpick_core::error::PassError>()
                    .is_some_and(|e| e.is_auth());
                show(presenter.as_ref(), &failure_notice(&err, auth));
                if auth {
                    error!("the API key was rejected, not processing the remaining files");
                    break;
                }
            }
        }
    }
    info!(
        "{} downloaded, {} without subtitles, {} failed",
        summary.downloaded, summary.nothing, summary.failed
    );
    Ok(ExitCode::from(summary.exit_code()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["subpick", "--api-key", "k"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_the_core_configuration() {
        let cli = parse(&["movie.mkv"]);
        let config = cli.configuration();
        assert_eq!(config, Configuration::default());
        assert_eq!(cli.gui(), Gui::Auto);
    }

    #[test]
    fn flags_map_onto_the_configuration() {
        let cli = parse(&[
            "-s",
            "hash_and_filename",
            "--auto",
            "-l",
            "fre",
            "-l",
            "eng,spa",
            "--suffix",
            "on",
            "--separator",
            ".",
            "--skip-hi",
            "--show-rating",
            "auto",
            "--retry-delay",
            "0",
            "--cli",
            "a.mkv",
            "b.mkv",
        ]);
        let config = cli.configuration();
        assert_eq!(config.search_mode, SearchMode::HashAndFilename);
        assert_eq!(config.selection, SelectionPolicy::Auto);
        assert_eq!(config.languages.groups().len(), 2);
        assert_eq!(config.languages.total_languages(), 3);
        assert_eq!(config.language_suffix, Toggle::On);
        assert_eq!(config.language_separator, ".");
        assert!(config.exclude_hearing_impaired);
        assert!(!config.exclude_ai_translated);
        assert_eq!(config.display.rating, Toggle::Auto);
        assert_eq!(config.retry.delay, Duration::ZERO);
        assert_eq!(cli.gui(), Gui::Cli);
        assert_eq!(cli.paths.len(), 2);
    }

    #[test]
    fn rejects_unknown_modes() {
        let err = Cli::try_parse_from(["subpick", "--api-key", "k", "-s", "fuzzy", "a.mkv"]);
        assert!(err.is_err());
    }

    #[test]
    fn desktop_picks_the_dialog_backend() {
        assert_eq!(resolve_gui(Gui::Auto, Some("KDE")), Gui::Kde);
        assert_eq!(resolve_gui(Gui::Auto, Some("ubuntu:GNOME")), Gui::Gnome);
        assert_eq!(resolve_gui(Gui::Auto, Some("X-Cinnamon")), Gui::Gnome);
        assert_eq!(resolve_gui(Gui::Auto, None), Gui::Cli);
        assert_eq!(resolve_gui(Gui::Kde, Some("GNOME")), Gui::Kde);
    }

    #[test]
    fn empty_and_skipped_passes_are_announced() {
        let video = Path::new("/videos/Movie.mkv");
        let languages = LanguageRequest::parse(["fre", "eng,spa"]);

        let notice = outcome_notice(video, &PassOutcome::NothingFound, &languages).unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(
            notice.text,
            "No subtitles available in fre, eng,spa for:\nMovie.mkv"
        );

        let existing = PathBuf::from("/videos/Movie.srt");
        let notice = outcome_notice(video, &PassOutcome::Skipped(existing), &languages).unwrap();
        assert_eq!(notice.title, "Subtitles already downloaded");
        assert!(notice.text.ends_with("/videos/Movie.srt"));

        assert_eq!(outcome_notice(video, &PassOutcome::Cancelled, &languages), None);
        assert_eq!(
            outcome_notice(video, &PassOutcome::Downloaded(PathBuf::from("a.srt")), &languages),
            None
        );
    }

    #[test]
    fn failures_are_announced_as_errors() {
        let err = anyhow::anyhow!("service unavailable").context("failed to get subtitles for a.mkv");
        let notice = failure_notice(&err, false);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(
            notice.text,
            "failed to get subtitles for a.mkv: service unavailable"
        );
        assert!(failure_notice(&err, true).text.contains("API key"));
    }

    #[test]
    fn exit_code_prefers_failure_then_download() {
        let mut summary = Summary::default();
        assert_eq!(summary.exit_code(), 1);
        summary.record(&PassOutcome::Cancelled);
        assert_eq!(summary.exit_code(), 1);
        summary.record(&PassOutcome::Downloaded(PathBuf::from("a.srt")));
        assert_eq!(summary.exit_code(), 0);
        summary.failed += 1;
        assert_eq!(summary.exit_code(), 2);
    }
}
