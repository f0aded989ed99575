use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use repitch::audio::open_audio_file;
use repitch::config::ClientConfig;
use repitch::error::ProcessError;
use repitch::form::clamp_semitones;
use repitch::format;
use repitch::models::PitchMode;
use repitch::progress::{CliListener, ProgressMode};
use repitch::session::{FormEdit, Session};
use repitch::transfer::Orchestrator;

#[derive(Parser)]
#[command(name = "repitch", about = "Pitch-shift an audio file on a remote processing service")]
struct Cli {
    /// Audio file to upload (MP3 or any audio type, max 50MB)
    file: Option<PathBuf>,

    /// Shift by this many semitones (-12..12, clamped)
    #[arg(short, long, allow_negative_numbers = true, conflicts_with = "note")]
    shift: Option<i64>,

    /// Shift to a target note instead (e.g. C4, A#3, Bb5)
    #[arg(short, long)]
    note: Option<String>,

    /// Processing endpoint URL
    #[arg(long, env = "REPITCH_ENDPOINT")]
    endpoint: Option<String>,

    /// JSON config file (default: ./repitch.json if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the result to this exact path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory to save the result in, under the server-suggested name
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Give up after this many seconds (0 waits forever)
    #[arg(long)]
    timeout: Option<u64>,

    /// Progress source
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,

    /// Output a JSON summary instead of a table
    #[arg(long)]
    json: bool,

    /// Launch interactive TUI
    #[arg(long)]
    tui: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(ref endpoint) = self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if let Some(mode) = self.progress {
            config.progress = mode;
        }
    }
}

fn init_logging(verbose: bool, tui: bool, config: &ClientConfig) -> Result<()> {
    let default = if verbose { "repitch=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if tui {
        // The terminal belongs to the UI; logs go to a file instead.
        let path = config.log_path();
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(log_file))
            .with_env_filter(filter)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
    Ok(())
}

async fn run_once(cli: &Cli, config: &ClientConfig) -> Result<()> {
    let mut session = Session::new(config.max_upload_bytes);

    if let Some(ref path) = cli.file {
        let file = open_audio_file(path).with_context(|| format!("Failed to open {}", path.display()))?;
        session.edit(FormEdit::SelectFile(Some(file)));
    }

    match cli.note {
        Some(ref note) => {
            session.edit(FormEdit::SetMode(PitchMode::Note));
            session.edit(FormEdit::SetNote(note.clone()));
        }
        None => {
            let requested = cli.shift.unwrap_or(0);
            let clamped = clamp_semitones(requested);
            if clamped as i64 != requested {
                warn!("shift {} is outside -12..12, using {}", requested, clamped);
            }
            session.edit(FormEdit::SemitonesFromRange(requested));
        }
    }

    // Form problems are reported before the endpoint is even looked at.
    let pending = match session.submit() {
        Ok(pending) => pending,
        Err(ProcessError::Validation(reason)) => bail!("{}", reason),
        Err(e) => bail!("Processing failed: {}", e),
    };

    let orchestrator = Orchestrator::new(config.transfer_settings())?;
    let mut listener = if cli.json {
        CliListener::hidden()
    } else {
        CliListener::new()
    };

    let outcome = session.drive(pending, &orchestrator, &mut listener).await;
    listener.finish();

    if let Err(e) = outcome {
        bail!("Processing failed: {}", e);
    }

    let saved = match cli.output {
        Some(ref path) => {
            session
                .resources()
                .download_to(path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            path.clone()
        }
        None => {
            std::fs::create_dir_all(&config.output_dir).with_context(|| {
                format!(
                    "Failed to create output directory: {}",
                    config.output_dir.display()
                )
            })?;
            session
                .resources()
                .download_to_dir(&config.output_dir)
                .context("Failed to save result")?
        }
    };
    info!("saved {}", saved.display());

    let view = session
        .resources()
        .view()
        .context("Processing finished without a result")?;
    let summary = format::summarize(&view, Some(saved.as_path()));

    if cli.json {
        println!("{}", format::format_json(&summary));
    } else {
        println!("{}", format::format_result(&summary));
    }

    session.reset();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut config = ClientConfig::load(cli.config.as_deref(), &cwd)?;
    cli.apply_overrides(&mut config);

    init_logging(cli.verbose, cli.tui, &config)?;

    // One thread: the transfer, its progress timer and the UI all share it.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    if cli.tui {
        return runtime.block_on(repitch::tui::run(&config, cli.file.as_deref()));
    }

    runtime.block_on(run_once(&cli, &config))
}
