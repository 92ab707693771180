use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use clap::{Parser, Subcommand};
use pasteroute_cli::{
    settings::{self, Settings},
    sources,
};
use pasteroute_core::{ComposerInput, FileMetadata, SupportedExtensions};
use pasteroute_service::{
    FsTempFileStore, HostDocument, PasteCoordinator, PasteRegion, RegionOptions,
};
use serde::Serialize;
use tracing::{error, info, warn};

const CLI_REGION_ID: &str = "pasteroute-cli";

#[derive(Parser, Debug)]
#[command(name = "pasteroute")]
struct Args {
    /// Comma-separated extension allow-list, e.g. `png,jpg,pdf`.
    #[arg(long, global = true)]
    ext: Option<String>,
    /// Directory for materialized clipboard files.
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,
    /// Directory holding settings.json.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route the current system clipboard through a send box.
    Clipboard {
        /// Existing send box text.
        #[arg(long, default_value = "")]
        draft: String,
        /// Caret position in the draft (chars). Without it pasted text
        /// replaces the draft.
        #[arg(long)]
        cursor: Option<usize>,
        /// Send the resulting draft once the paste has been applied.
        #[arg(long, default_value_t = false)]
        send: bool,
    },
    /// Treat the given paths as files dropped onto the send box.
    Drop {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the resolved settings.
    Settings {
        /// Persist the command-line overrides.
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

#[derive(Debug, Serialize)]
struct PasteReport {
    handled: bool,
    files: Vec<FileMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    draft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sent: Option<String>,
}

#[derive(Debug, Serialize)]
struct SettingsReport<'a> {
    path: PathBuf,
    settings: &'a Settings,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!("pasteroute failed: {}", err);
        eprintln!("pasteroute: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), String> {
    let config_dir = args.config_dir.clone().unwrap_or_else(settings::config_dir);
    let settings_path = settings::settings_path(&config_dir);
    let mut settings = settings::load_settings(&settings_path);

    if let Some(list) = args.ext.as_deref() {
        settings.supported_extensions =
            SupportedExtensions::parse_list(list).map_err(|err| err.to_string())?;
    }
    if let Some(dir) = args.temp_dir.clone() {
        settings.temp_dir = Some(dir);
    }

    match args.command {
        Command::Clipboard {
            draft,
            cursor,
            send,
        } => run_clipboard(&settings, draft, cursor, send).await,
        Command::Drop { paths } => run_drop(&settings, paths).await,
        Command::Settings { save } => {
            if save {
                settings::save_settings(&settings_path, &settings)
                    .await
                    .map_err(|err| err.to_string())?;
                info!(path = %settings_path.display(), "settings saved");
            }
            print_json(&SettingsReport {
                path: settings_path,
                settings: &settings,
            })
        }
    }
}

async fn run_clipboard(
    settings: &Settings,
    draft: String,
    cursor: Option<usize>,
    send: bool,
) -> Result<(), String> {
    let coordinator = build_coordinator(settings);
    let host = HostDocument::new();
    coordinator.init(&host);

    let accepted: Arc<Mutex<Vec<FileMetadata>>> = Arc::new(Mutex::new(Vec::new()));
    let composer = Arc::new(Mutex::new(match cursor {
        Some(cursor) => ComposerInput::with_cursor(draft, cursor),
        None => ComposerInput::new(draft),
    }));

    let region = {
        let accepted = Arc::clone(&accepted);
        let composer = Arc::clone(&composer);
        let options = RegionOptions::new(move |files| {
            if let Ok(mut slot) = accepted.lock() {
                slot.extend(files);
            }
        })
        .with_extensions(settings.supported_extensions.clone())
        .with_text_paste(move |text| {
            if let Ok(mut input) = composer.lock() {
                input.insert_text(&text);
            }
        });
        PasteRegion::mount(&coordinator, CLI_REGION_ID, options).map_err(|err| err.to_string())?
    };
    region.focus();

    let payload = tokio::task::spawn_blocking(sources::snapshot_clipboard)
        .await
        .map_err(|err| err.to_string())?
        .map_err(|err| err.to_string())?;
    let has_text = payload.plain_text().is_some() && !payload.has_files();

    let event = host.fire_paste(payload).await;
    drop(region);
    coordinator.destroy();

    if !event.default_prevented() {
        info!("clipboard paste left to platform default");
    }

    let files = accepted.lock().map(|files| files.clone()).unwrap_or_default();
    let mut input = composer
        .lock()
        .map(|input| input.clone())
        .unwrap_or_default();
    let sent = if send {
        match input.begin_send() {
            Ok(message) => {
                input.finish_send(true);
                Some(message)
            }
            Err(err) => {
                warn!("draft not sent: {}", err);
                None
            }
        }
    } else {
        None
    };
    let draft = (has_text && event.default_prevented()).then(|| input.value().to_owned());

    print_json(&PasteReport {
        handled: event.default_prevented(),
        files,
        draft,
        sent,
    })
}

async fn run_drop(settings: &Settings, paths: Vec<PathBuf>) -> Result<(), String> {
    let coordinator = build_coordinator(settings);
    let accepted: Arc<Mutex<Vec<FileMetadata>>> = Arc::new(Mutex::new(Vec::new()));

    let region = {
        let accepted = Arc::clone(&accepted);
        let options = RegionOptions::new(move |files| {
            if let Ok(mut slot) = accepted.lock() {
                slot.extend(files);
            }
        })
        .with_extensions(settings.supported_extensions.clone());
        PasteRegion::mount(&coordinator, CLI_REGION_ID, options).map_err(|err| err.to_string())?
    };

    let mut entries = Vec::with_capacity(paths.len());
    for path in &paths {
        match sources::entry_for_path(path).await {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!("skipping {}: {}", path.display(), err),
        }
    }

    let count = region.drop_files(entries).await;
    info!(accepted = count, offered = paths.len(), "drop ingested");
    drop(region);

    let files = accepted.lock().map(|files| files.clone()).unwrap_or_default();
    print_json(&PasteReport {
        handled: true,
        files,
        draft: None,
        sent: None,
    })
}

fn build_coordinator(settings: &Settings) -> PasteCoordinator {
    let root = settings
        .temp_dir
        .clone()
        .unwrap_or_else(FsTempFileStore::default_root);
    PasteCoordinator::new(Arc::new(FsTempFileStore::new(root)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{out}");
    Ok(())
}
