use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cutout::commands::{CommandRegistry, CommandResult, SessionInfo};
use cutout::config::{self, Config};
use cutout::consts::{default_db_path, default_download_dir};
use cutout::decoder::ImageCrateDecoder;
use cutout::events::{Event, EventBus, ToastLevel};
use cutout::input::{DropZone, FilePicker, UploadFile};
use cutout::page::{self, PROCESSING};
use cutout::remover::BackgroundRemover;
use cutout::remover::chroma::{ChromaKeyRemover, DEFAULT_TOLERANCE};
use cutout::remover::http::{HttpRemover, HttpRemoverConfig};
use cutout::saver::SavedFile;
use cutout::saver::fs::DirectorySaver;
use cutout::spinner::Spinner;
use cutout::workflow::{SubmitOutcome, UploadWorkflow, WorkflowConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RemoverKind {
    /// Clear the flat border colour locally
    Chroma,
    /// POST the image to a remote removal service
    Http,
}

#[derive(Parser)]
#[command(
    name = "cutout",
    version,
    about = "Drop an image, remove its background, download the result."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Image to process. Omit to start the interactive prompt.
    file: Option<PathBuf>,

    /// Background remover
    #[arg(short, long, value_enum, default_value_t = RemoverKind::Chroma)]
    remover: RemoverKind,

    /// Endpoint for the http remover (overrides remover.endpoint)
    #[arg(long)]
    endpoint: Option<String>,

    /// Colour tolerance for the chroma remover (overrides chroma.tolerance)
    #[arg(long)]
    tolerance: Option<u8>,

    /// Give up on the remover after this many seconds (overrides remover.timeout_secs)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Directory downloads are saved into (overrides download.dir)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// SQLite settings database (use :memory: for ephemeral)
    #[arg(long)]
    db: Option<String>,

    /// Render the preview page as HTML and open it in the browser
    #[arg(long, default_value_t = false)]
    open: bool,

    /// Process only; do not save the result
    #[arg(long, default_value_t = false)]
    no_download: bool,

    /// Print a JSON report instead of the text preview (single-file mode)
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print one setting
    Get { key: String },
    /// Store a setting
    Set { key: String, value: String },
    /// Remove a setting
    Unset { key: String },
    /// Print every stored setting
    List,
}

#[derive(Serialize)]
struct RunReport {
    file: String,
    state: &'static str,
    processed_bytes: Option<usize>,
    processed_sha256: Option<String>,
    elapsed_ms: u64,
    saved: Option<SavedFile>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cutout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => {
            let path = default_db_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            path.display().to_string()
        }
    };
    let settings = Config::open(&db_path)?;

    if let Some(Command::Config { action }) = &cli.command {
        handle_config(&settings, action)?;
        return Ok(ExitCode::SUCCESS);
    }

    let remover = build_remover(&cli, &settings)?;
    let remover_name = remover.name().to_string();

    let download_dir = match &cli.out_dir {
        Some(dir) => dir.clone(),
        None => settings
            .get(config::DOWNLOAD_DIR)?
            .map(PathBuf::from)
            .unwrap_or_else(default_download_dir),
    };

    let timeout = match cli.timeout {
        Some(secs) => Some(secs),
        None => settings.get_parsed::<u64>(config::REMOVER_TIMEOUT_SECS)?,
    };

    let events = Arc::new(EventBus::default());
    let toasts = spawn_toast_printer(&events);

    let workflow = Arc::new(UploadWorkflow::new(
        Arc::new(ImageCrateDecoder::default()),
        remover,
        Arc::new(DirectorySaver::new(&download_dir)),
        Arc::clone(&events),
        WorkflowConfig {
            removal_timeout: timeout.map(Duration::from_secs),
            ..WorkflowConfig::default()
        },
    ));
    info!(remover = %remover_name, downloads = %download_dir.display(), "ready");

    let code = match &cli.file {
        Some(path) => run_once(&cli, &workflow, path).await?,
        None => {
            run_repl(&cli, &workflow, &remover_name, &download_dir).await?;
            ExitCode::SUCCESS
        }
    };

    // Dropping the workflow releases its image handles.
    drop(workflow);
    drop(events);
    let _ = toasts.await;
    Ok(code)
}

fn handle_config(settings: &Config, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => match settings.get(key)? {
            Some(value) => println!("{value}"),
            None => println!("(unset)"),
        },
        ConfigAction::Set { key, value } => {
            settings.set(key, value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            settings.remove(key)?;
            println!("✓ {key} unset");
        }
        ConfigAction::List => {
            let pairs = settings.list()?;
            if pairs.is_empty() {
                println!("(no settings stored)");
            }
            for (key, value) in pairs {
                if key == config::REMOVER_API_KEY {
                    println!("{key} = ********");
                } else {
                    println!("{key} = {value}");
                }
            }
        }
    }
    Ok(())
}

fn build_remover(cli: &Cli, settings: &Config) -> Result<Arc<dyn BackgroundRemover>> {
    match cli.remover {
        RemoverKind::Chroma => {
            let tolerance = match cli.tolerance {
                Some(t) => t,
                None => settings
                    .get_parsed::<u8>(config::CHROMA_TOLERANCE)?
                    .unwrap_or(DEFAULT_TOLERANCE),
            };
            Ok(Arc::new(ChromaKeyRemover::new(tolerance)))
        }
        RemoverKind::Http => {
            let endpoint = match &cli.endpoint {
                Some(e) => e.clone(),
                None => settings.get(config::REMOVER_ENDPOINT)?.with_context(|| {
                    format!(
                        "no endpoint: pass --endpoint or run `cutout config set {} <url>`",
                        config::REMOVER_ENDPOINT
                    )
                })?,
            };
            let mut http = HttpRemoverConfig::new(endpoint);
            http.api_key = settings
                .get(config::REMOVER_API_KEY)?
                .or_else(|| std::env::var("CUTOUT_API_KEY").ok().filter(|k| !k.is_empty()));
            Ok(Arc::new(HttpRemover::new(http)?))
        }
    }
}

/// Print toasts as they arrive, until the bus goes away.
fn spawn_toast_printer(events: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Event::Toast(toast)) => match toast.level {
                    ToastLevel::Success => eprintln!("\x1b[2K\r✓ {}", toast.message),
                    ToastLevel::Error => eprintln!("\x1b[2K\r✗ {}", toast.message),
                },
                Ok(other) => debug!(?other, "event"),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "toast printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn run_once(cli: &Cli, workflow: &Arc<UploadWorkflow>, path: &Path) -> Result<ExitCode> {
    let file = UploadFile::from_path(path).await?;
    let name = file.name.clone();

    let picker = FilePicker::new(Arc::clone(workflow));
    let spinner = Spinner::start(PROCESSING);
    let outcome = picker.select(vec![file]).await;
    let elapsed = spinner.stop().await;
    info!(file = %name, elapsed_ms = elapsed.as_millis() as u64, "upload settled");

    let mut saved = None;
    if matches!(outcome, Some(SubmitOutcome::Completed)) && !cli.no_download {
        saved = workflow.download()?;
    }

    let snapshot = workflow.snapshot();
    if cli.open {
        open_preview(&snapshot)?;
    }

    if cli.json {
        let report = RunReport {
            file: name,
            state: snapshot.state.as_str(),
            processed_bytes: snapshot.processed.as_ref().map(|p| p.bytes.len()),
            processed_sha256: snapshot.processed.as_ref().map(|p| p.digest()),
            elapsed_ms: elapsed.as_millis() as u64,
            saved,
            error: match &outcome {
                Some(SubmitOutcome::Rejected(e)) => Some(e.to_string()),
                Some(SubmitOutcome::Failed(e)) => Some(e.to_string()),
                _ => None,
            },
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", page::render_text(&snapshot));
        if let Some(saved) = &saved {
            println!("   saved      {}", saved.location);
        }
    }

    Ok(match outcome {
        Some(SubmitOutcome::Completed) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn run_repl(
    cli: &Cli,
    workflow: &Arc<UploadWorkflow>,
    remover_name: &str,
    download_dir: &Path,
) -> Result<()> {
    print!("\n{}", page::render_header());

    let registry = CommandRegistry::new();
    let drop_zone = DropZone::new(Arc::clone(workflow));
    let download_label = download_dir.display().to_string();
    let info = SessionInfo {
        workflow,
        remover: remover_name,
        download_dir: &download_label,
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\ncutout> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match registry.dispatch(input, &info).await {
            CommandResult::Quit => break,
            CommandResult::Handled => continue,
            CommandResult::NotACommand => {}
        }

        // Terminals quote dropped paths that contain spaces.
        let path = PathBuf::from(input.trim_matches(|c| c == '\'' || c == '"'));
        let file = match UploadFile::from_path(&path).await {
            Ok(file) => file,
            Err(e) => {
                eprintln!("✗ {e:#}");
                continue;
            }
        };

        drop_zone.drag_enter();
        let spinner = Spinner::start(PROCESSING);
        // Ctrl+C abandons the wait; the workflow discards the late result.
        let outcome = tokio::select! {
            outcome = drop_zone.drop_files(vec![file]) => outcome,
            _ = tokio::signal::ctrl_c() => {
                workflow.reset();
                None
            }
        };
        let elapsed = spinner.stop().await;
        debug!(elapsed_ms = elapsed.as_millis() as u64, "upload settled");

        let snapshot = workflow.snapshot();
        print!("{}", page::render_text(&snapshot));
        if matches!(outcome, Some(SubmitOutcome::Completed)) {
            println!("   /download to save");
            if cli.open {
                open_preview(&snapshot)?;
            }
        }
    }

    println!("goodbye.");
    Ok(())
}

fn open_preview(snapshot: &cutout::workflow::Snapshot) -> Result<()> {
    let path = page::write_html(snapshot, &std::env::temp_dir())?;
    // Headless sessions have no browser; the path is still printed.
    if let Err(e) = open::that(&path) {
        warn!(error = %e, "could not open browser");
    }
    println!("   preview    {}", path.display());
    Ok(())
}
