use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use console::{Emoji, Term};
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressStyle};
use tracing::debug;

use podgrab::{
    AssumeYes, Confirm, FileRegistry, NoopReporter, Podcast, ProgressEvent, ProgressReporter,
    Registry, ReqwestClient, SharedProgressReporter, add_podcast, resolve_targets,
    update_podcasts,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Manage podcast subscriptions and download missing episodes
#[derive(Parser, Debug)]
#[command(name = "podgrab")]
#[command(about = "Manage podcast subscriptions and download missing episodes")]
#[command(version)]
struct Args {
    /// Path to the podcast registry file
    #[arg(long, env = "PODGRAB_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start managing a podcast and fetch its feed
    Add {
        /// Name under which the podcast is managed
        name: String,
        /// URL of the podcast's RSS feed
        feed_url: String,
        /// Directory for the downloaded episodes
        dir: PathBuf,
    },

    /// List managed podcasts
    List,

    /// Stop managing a podcast (downloaded files are kept)
    Remove {
        /// Name of the podcast
        name: String,
    },

    /// Download all episodes not yet present in local storage.
    ///
    /// The special name "all" updates all managed podcasts.
    Update {
        /// Podcasts to update, or "all"
        #[arg(required = true)]
        podcasts: Vec<String>,

        /// Download without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .expect("valid progress template");

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            download_bar: Mutex::new(None),
        }
    }

    fn start_download_bar(&self, length: u64, message: String) {
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .expect("valid progress template")
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(length));
        bar.set_style(style);
        bar.set_message(message);

        *self.download_bar.lock().unwrap() = Some(bar);
    }

    fn take_download_bar(&self) -> Option<ProgressBar> {
        self.download_bar.lock().unwrap().take()
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { podcast_name, url } => {
                self.main_bar.set_message(format!(
                    "{SEARCH}Fetching feed for {}: {}",
                    podcast_name.bold(),
                    url.cyan()
                ));
            }

            ProgressEvent::FeedDiffed {
                podcast_name,
                total_episodes,
                new_episodes,
            } => {
                self.main_bar.println(format!(
                    "{HEADPHONES}{} • {} episodes total, {} new",
                    podcast_name.bold().green(),
                    total_episodes.to_string().cyan(),
                    new_episodes.to_string().yellow()
                ));
            }

            ProgressEvent::PendingEpisodes {
                podcast_name,
                titles,
            } => {
                self.main_bar.finish_and_clear();
                print!("{}", pending_listing(&podcast_name, &titles));
            }

            ProgressEvent::NothingToDo => {
                self.main_bar.finish_and_clear();
                println!("\n{PARTY}No new episodes. Nothing to do.");
            }

            ProgressEvent::Declined => {
                println!("\nNothing downloaded.");
            }

            ProgressEvent::DownloadStarting {
                podcast_name,
                episode_title,
                episode_index,
                total_to_download,
                content_length,
            } => {
                self.start_download_bar(
                    content_length.unwrap_or(0),
                    format!(
                        "[{}/{}] {} {}",
                        (episode_index + 1).to_string().cyan(),
                        total_to_download.to_string().cyan(),
                        podcast_name.dimmed(),
                        truncate_title(&episode_title, 40)
                    ),
                );
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                }
            }

            ProgressEvent::DownloadCompleted {
                episode_title,
                bytes_downloaded,
            } => {
                if let Some(bar) = self.take_download_bar() {
                    bar.finish_and_clear();
                }
                println!(
                    "  {SUCCESS}{} ({})",
                    truncate_title(&episode_title, 40).green(),
                    HumanBytes(bytes_downloaded)
                );
            }

            ProgressEvent::DownloadFailed {
                episode_title,
                error,
            } => {
                let message = format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&episode_title, 30).red(),
                    error.red()
                );
                match self.take_download_bar() {
                    Some(bar) => bar.abandon_with_message(message),
                    None => println!("  {message}"),
                }
            }

            ProgressEvent::UpdateCompleted {
                downloaded_count,
                bytes_downloaded,
            } => {
                println!(
                    "\n{PARTY}{} {} episodes downloaded, {}",
                    "Update complete:".bold().green(),
                    downloaded_count.to_string().green().bold(),
                    HumanBytes(bytes_downloaded).to_string().cyan()
                );
            }
        }
    }
}

impl Drop for IndicatifReporter {
    fn drop(&mut self) {
        if let Some(bar) = self.download_bar.get_mut().ok().and_then(Option::take) {
            bar.abandon();
        }
        if !self.main_bar.is_finished() {
            self.main_bar.finish_and_clear();
        }
    }
}

/// Reporter for quiet runs that still ask for confirmation
///
/// Prints only the episode lists the prompt refers to.
struct ListingReporter;

impl ProgressReporter for ListingReporter {
    fn report(&self, event: ProgressEvent) {
        if let ProgressEvent::PendingEpisodes {
            podcast_name,
            titles,
        } = event
        {
            print!("{}", pending_listing(&podcast_name, &titles));
        }
    }
}

/// Block listing a podcast's new episodes ahead of the prompt
fn pending_listing(podcast_name: &str, titles: &[String]) -> String {
    let mut listing = format!("\n{}:\n{}\n", podcast_name.bold(), "-".repeat(18).dimmed());
    for title in titles {
        listing.push_str(title);
        listing.push('\n');
    }
    listing
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReporterKind {
    Progress,
    ListingOnly,
    Silent,
}

/// Pick the reporter; an interactive prompt always gets its episode list
fn reporter_kind(quiet: bool, prompts: bool) -> ReporterKind {
    match (quiet, prompts) {
        (false, _) => ReporterKind::Progress,
        (true, true) => ReporterKind::ListingOnly,
        (true, false) => ReporterKind::Silent,
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let head: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Confirmation prompt read from the terminal
struct TermConfirm {
    term: Term,
}

impl Confirm for TermConfirm {
    fn confirm(&self, message: &str) -> bool {
        if self.term.write_str(&format!("\n{message} [y/N] ")).is_err() {
            return false;
        }

        match self.term.read_line() {
            Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn init_logging(args: &Args) {
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn registry_path(args: &Args) -> Result<PathBuf> {
    if let Some(path) = &args.config {
        return Ok(path.clone());
    }

    let config_dir = dirs::config_dir()
        .context("Could not determine the configuration directory, pass --config")?;
    Ok(config_dir.join("podgrab").join("podcasts.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);
    debug!(?args, "CLI arguments parsed");

    let registry = FileRegistry::new(registry_path(&args)?);
    debug!(registry = %registry.path().display(), "Using registry");

    let client = ReqwestClient::new();

    let prompts = matches!(args.command, Command::Update { yes: false, .. });
    let reporter: SharedProgressReporter = match reporter_kind(args.quiet, prompts) {
        ReporterKind::Progress => {
            println!(
                "\n{}{} {}\n",
                MICROPHONE,
                "podgrab".bold().magenta(),
                "- Podcast Downloader".dimmed()
            );
            Arc::new(IndicatifReporter::new())
        }
        ReporterKind::ListingOnly => Arc::new(ListingReporter),
        ReporterKind::Silent => NoopReporter::shared(),
    };

    match args.command {
        Command::Add { name, feed_url, dir } => {
            let podcast = Podcast::new(name, feed_url, dir);
            let store = podcast.local_store.clone();

            add_podcast(&client, &registry, podcast, &reporter)
                .await
                .context("Failed to add podcast")?;
            // Stops the spinner before the final message
            drop(reporter);

            if !args.quiet {
                println!(
                    "\n{SUCCESS}Podcast added\n{FOLDER}Storage: {}\n",
                    store.display().to_string().cyan()
                );
            }
        }

        Command::List => {
            let podcasts = registry.list_all().context("Failed to read registry")?;
            if podcasts.is_empty() {
                println!("No podcasts managed yet.");
            }
            for podcast in podcasts {
                println!(
                    "{}\n  {}\n  {FOLDER}{}",
                    podcast.name.bold().green(),
                    podcast.feed_url.cyan(),
                    podcast.local_store.display()
                );
            }
        }

        Command::Remove { name } => {
            let podcast = registry.remove(&name).context("Failed to remove podcast")?;
            println!(
                "Removed {} (files in {} were kept)",
                podcast.name.bold(),
                podcast.local_store.display()
            );
        }

        Command::Update { podcasts, yes } => {
            let targets =
                resolve_targets(&registry, &podcasts).context("Failed to resolve podcasts")?;

            let confirm: Box<dyn Confirm> = if yes {
                Box::new(AssumeYes)
            } else {
                Box::new(TermConfirm {
                    term: Term::stderr(),
                })
            };

            update_podcasts(&client, &targets, confirm.as_ref(), &reporter)
                .await
                .context("Failed to update podcasts")?;
        }
    }

    Ok(())
}
