//! asploader - YouTube downloader with Soundpad integration
//!
//! Command-line front end over the backend actor: inspect a video, download it
//! as mp4 or mp3, manage settings, and run the local image proxy.

use anyhow::{anyhow, bail, Context, Result};
use asploader::backend::{BackendActor, BackendCommand, BackendEvent};
use asploader::downloader::{Container, DownloadJob, DownloadOutcome, Quality};
use asploader::extractor::{Extractor, YtDlpExtractor};
use asploader::formats::{resolve_formats, ResolvedFormat};
use asploader::proxy;
use asploader::utils::config::SettingsStore;
use asploader::utils::platform;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asploader")]
#[command(author, version, about = "Download YouTube videos as mp4 or mp3", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use a different settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show video details and the available qualities
    Info { url: String },

    /// Download a video
    Download {
        url: String,

        /// Extract audio as mp3 instead of downloading mp4
        #[arg(long)]
        audio: bool,

        /// low (480p), medium (720p) or high (best)
        #[arg(short, long)]
        quality: Option<Quality>,

        /// Exact format id from `info`
        #[arg(short, long)]
        format_id: Option<String>,

        /// Output directory (defaults to the active download path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ask where to save once the download finishes
        #[arg(long)]
        prompt: bool,
    },

    /// Inspect or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Talk to the Soundpad helper
    Soundpad {
        #[command(subcommand)]
        action: SoundpadAction,
    },

    /// Run the local image proxy
    Proxy {
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Reveal a path in the file browser
    Open { path: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the settings document
    Show,
    /// Add or replace a named download path
    AddPath { name: String, path: String },
    /// Make a named download path the active one
    UsePath { name: String },
    /// Remove a named download path
    RemovePath { name: String },
    /// Enable or disable forwarding mp3 downloads to Soundpad
    Soundpad {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Restore every setting to its default
    Reset,
}

#[derive(Subcommand)]
enum SoundpadAction {
    /// Check whether the helper is reachable
    Status,
    /// Add an audio file to the Soundpad library
    Add { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = match &cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default_location(),
    };
    debug!("Settings file: {}", store.path().display());

    match cli.command {
        Commands::Info { url } => info(store, url).await,
        Commands::Download {
            url,
            audio,
            quality,
            format_id,
            output,
            prompt,
        } => {
            let settings = store.load()?;
            let container = if audio { Container::Mp3 } else { Container::Mp4 };
            let quality = quality.unwrap_or(settings.last_used.quality);
            let output = output.unwrap_or_else(|| settings.downloads.active_path());
            let mut job = DownloadJob::new(url, output)
                .container(container)
                .quality(quality)
                .prompt_for_destination(prompt);
            if let Some(id) = format_id.filter(|id| !id.trim().is_empty()) {
                let chosen = resolve_choice(&job.source_url, id.trim()).await?;
                job = job.format(&chosen);
            }

            store.update(|s| {
                s.last_used.quality = quality;
                s.last_used.container = container;
                Ok(())
            })?;
            let forwards_to_soundpad = settings.soundpad.enabled && container.is_audio();
            download(store, job, forwards_to_soundpad).await
        }
        Commands::Settings { action } => settings_command(&store, action),
        Commands::Soundpad { action } => soundpad_command(store, action).await,
        Commands::Proxy { port } => {
            let port = match port {
                Some(port) => port,
                None => store.load()?.proxy.port,
            };
            proxy::serve(port).await
        }
        Commands::Open { path } => {
            let target = platform::expand_tilde(&path);
            if !platform::open_path(&target.to_string_lossy()) {
                bail!("Could not open {}", target.display());
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "asploader=info",
        1 => "asploader=debug",
        _ => "asploader=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Start the backend actor on its own task
async fn spawn_backend(
    store: SettingsStore,
) -> Result<(mpsc::Sender<BackendCommand>, mpsc::Receiver<BackendEvent>)> {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(128);
    let actor = BackendActor::new(store, command_rx, event_tx).await?;
    tokio::spawn(actor.run());
    Ok((command_tx, event_rx))
}

async fn info(store: SettingsStore, url: String) -> Result<()> {
    let (commands, mut events) = spawn_backend(store).await?;
    commands
        .send(BackendCommand::FetchVideoInfo { url, request_id: 1 })
        .await?;

    while let Some(event) = events.recv().await {
        if let BackendEvent::VideoInfo { result, .. } = event {
            let details = result.map_err(|e| anyhow!(e))?;
            println!("Title:    {}", details.title);
            if let Some(channel) = &details.channel_title {
                println!("Channel:  {}", channel);
            }
            if let Some(duration) = details.duration {
                println!("Duration: {}:{:02}", duration / 60, duration % 60);
            }
            if let Some(views) = details.view_count {
                println!("Views:    {}", views);
            }
            println!();
            println!("{:<10} {:<12} {:<6} {:>10}", "ID", "QUALITY", "EXT", "SIZE");
            for format in resolve_formats(&details.variants) {
                println!(
                    "{:<10} {:<12} {:<6} {:>10}",
                    format.format_id,
                    format.quality_label,
                    format.container_ext,
                    human_size(format.file_size_bytes)
                );
            }
            break;
        }
    }

    let _ = commands.send(BackendCommand::Shutdown).await;
    Ok(())
}

/// Look up a format id among the options `info` lists for this video
async fn resolve_choice(url: &str, format_id: &str) -> Result<ResolvedFormat> {
    let extractor = YtDlpExtractor::new()?;
    let formats = extractor.get_formats(url).await?;
    formats
        .into_iter()
        .find(|f| f.format_id == format_id)
        .ok_or_else(|| {
            anyhow!(
                "Format '{}' is not offered for this video (see `asploader info`)",
                format_id
            )
        })
}

async fn download(store: SettingsStore, job: DownloadJob, forwards_to_soundpad: bool) -> Result<()> {
    let (commands, mut events) = spawn_backend(store).await?;
    commands.send(BackendCommand::StartDownload(job)).await?;

    let mut outcome = None;
    while let Some(event) = events.recv().await {
        match event {
            BackendEvent::DownloadStarted { job_id } => debug!("Job {} started", job_id),
            BackendEvent::DownloadProgress { progress, .. } => {
                eprint!(
                    "\r{:>5.1}% of {} at {}/s   ",
                    progress.percent,
                    human_size(progress.total_bytes),
                    human_size(progress.speed_bps as u64)
                );
                let _ = std::io::stderr().flush();
            }
            BackendEvent::DownloadFinished { outcome: finished, .. } => {
                eprintln!();
                println!("{}", finished);
                let completed = matches!(finished, DownloadOutcome::Completed(_));
                outcome = Some(finished);
                if !(completed && forwards_to_soundpad) {
                    break;
                }
            }
            BackendEvent::SoundpadAdded { path, .. } => {
                println!("Added {} to Soundpad", path.display());
                break;
            }
            BackendEvent::SoundpadWarning(warning) => {
                eprintln!("Soundpad: {}", warning);
                break;
            }
            BackendEvent::Error(message) => {
                let _ = commands.send(BackendCommand::Shutdown).await;
                bail!(message);
            }
            _ => {}
        }
    }

    let _ = commands.send(BackendCommand::Shutdown).await;
    match outcome {
        Some(DownloadOutcome::Failed { .. }) => bail!("Download failed"),
        Some(_) => Ok(()),
        None => bail!("Backend stopped before the download finished"),
    }
}

fn settings_command(store: &SettingsStore, action: SettingsAction) -> Result<()> {
    let settings = match action {
        SettingsAction::Show => store.load()?,
        SettingsAction::AddPath { name, path } => store.update(|s| {
            s.downloads.add_path(&name, &path);
            Ok(())
        })?,
        SettingsAction::UsePath { name } => store.update(|s| s.downloads.use_path(&name))?,
        SettingsAction::RemovePath { name } => store.update(|s| s.downloads.remove_path(&name))?,
        SettingsAction::Soundpad { enabled, port } => store.update(|s| {
            s.soundpad.enabled = enabled;
            if let Some(port) = port {
                s.soundpad.port = port;
            }
            Ok(())
        })?,
        SettingsAction::Reset => store.reset()?,
    };
    let json = serde_json::to_string_pretty(&settings).context("Failed to format settings")?;
    println!("{}", json);
    Ok(())
}

async fn soundpad_command(store: SettingsStore, action: SoundpadAction) -> Result<()> {
    let (commands, mut events) = spawn_backend(store).await?;
    let command = match action {
        SoundpadAction::Status => BackendCommand::SoundpadStatus,
        SoundpadAction::Add { file } => {
            let path = file
                .canonicalize()
                .with_context(|| format!("{} does not exist", file.display()))?;
            BackendCommand::AddToSoundpad { path }
        }
    };
    commands.send(command).await?;

    let mut result = Ok(());
    while let Some(event) = events.recv().await {
        match event {
            BackendEvent::SoundpadStatus(running) => {
                println!("Soundpad helper {}", if running { "running" } else { "not running" });
                break;
            }
            BackendEvent::SoundpadAdded { path, result: added } => {
                match added {
                    Ok(()) => println!("Added {} to Soundpad", path.display()),
                    Err(e) => result = Err(anyhow!(e)),
                }
                break;
            }
            _ => {}
        }
    }

    let _ = commands.send(BackendCommand::Shutdown).await;
    result
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
