//! Unistore CLI - file bridge for the store model
//!
//! Commands: info, list, validate, block, rename-script, add-block,
//! remove-block, touch
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or edit failure, 1 on I/O failure

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use unistore_core::{
    BlockKind, EditorConfig, EntryRef, IconSheet, Loaded, StoreDocument, StoreError,
    ValidationContext, Validator, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "unistore-cli")]
#[command(about = "Unistore CLI - inspect and edit .unistore store files")]
#[command(version = ENGINE_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to an editor config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortOrder {
    /// Most recently updated first
    Recency,
    /// Alphabetical by title
    Title,
    /// As stored in the file
    Document,
}

#[derive(Subcommand)]
enum Commands {
    /// Show store info, load repairs and fingerprint
    Info { file: PathBuf },

    /// List entries
    List {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "recency")]
        sort: SortOrder,
    },

    /// Validate every entry and script
    Validate {
        file: PathBuf,

        /// Icon sheet (.t3s) to check icon_index against; overrides the config
        #[arg(long)]
        icon_sheet: Option<PathBuf>,
    },

    /// Print a default block of the given kind
    Block { kind: String },

    /// Rename a script within an entry
    RenameScript {
        file: PathBuf,
        #[arg(short, long)]
        entry: usize,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Write here instead of overwriting FILE
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Insert a default block into a script
    AddBlock {
        file: PathBuf,
        #[arg(short, long)]
        entry: usize,
        #[arg(short, long)]
        script: String,
        #[arg(short, long)]
        index: usize,
        #[arg(short, long)]
        kind: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove a block from a script
    RemoveBlock {
        file: PathBuf,
        #[arg(short, long)]
        entry: usize,
        #[arg(short, long)]
        script: String,
        #[arg(short, long)]
        index: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stamp an entry's last_updated with the current UTC time
    Touch {
        file: PathBuf,
        #[arg(short, long)]
        entry: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = match &cli.config {
        Some(path) => match EditorConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail_io(format!("Failed to load config: {}", e)),
        },
        None => EditorConfig::default(),
    };
    let codec = match config.codec() {
        Ok(c) => c,
        Err(e) => return fail_io(e.to_string()),
    };

    match cli.command {
        Commands::Info { file } => {
            let loaded = match read_document(&file) {
                Ok(l) => l,
                Err(e) => return fail_io(e.to_string()),
            };
            let advisories: Vec<String> = loaded.advisories.iter().map(ToString::to_string).collect();
            match loaded.document.fingerprint() {
                Ok(fp) => {
                    print_json(&json!({
                        "storeInfo": loaded.document.info(),
                        "entries": loaded.document.len(),
                        "advisories": advisories,
                        "fingerprint": fp,
                        "engine_version": ENGINE_VERSION,
                    }));
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }

        Commands::List { file, sort } => {
            let loaded = match read_document(&file) {
                Ok(l) => l,
                Err(e) => return fail_io(e.to_string()),
            };
            let doc = &loaded.document;
            let ordered = match sort {
                SortOrder::Recency => doc.sorted_by_recency(&codec),
                SortOrder::Title => doc.sorted_by_title(),
                SortOrder::Document => Ok(doc
                    .entries()
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| EntryRef { index, entry })
                    .collect()),
            };
            match ordered {
                Ok(refs) => {
                    let rows: Vec<Value> = refs.iter().map(entry_row).collect();
                    print_json(&Value::Array(rows));
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }

        Commands::Validate { file, icon_sheet } => {
            let loaded = match read_document(&file) {
                Ok(l) => l,
                Err(e) => return fail_io(e.to_string()),
            };
            let sheet = match icon_sheet {
                Some(path) => IconSheet::load(&path).map(Some),
                None => config.load_icon_sheet(),
            };
            let sheet = match sheet {
                Ok(s) => s,
                Err(e) => return fail_io(format!("Failed to load icon sheet: {}", e)),
            };

            let ctx = ValidationContext { codec: &codec, icons: sheet.as_ref() };
            let result = Validator::new().validate(&loaded.document, &ctx);
            print_json(&json!({
                "valid": result.valid,
                "advisories": loaded.advisories.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "result": result,
            }));
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // Validation failure
            }
        }

        Commands::Block { kind } => match unistore_core::schema::create_default(&kind)
            .and_then(|block| block.to_value())
        {
            Ok(value) => {
                print_json(&value);
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },

        Commands::RenameScript { file, entry, from, to, output } => {
            edit(&file, output.as_deref(), |doc| {
                let name = doc.entry_mut(entry)?.rename_script(&from, &to)?;
                Ok(json!({ "script": name }))
            })
        }

        Commands::AddBlock { file, entry, script, index, kind, output } => {
            edit(&file, output.as_deref(), |doc| {
                let kind: BlockKind = kind.parse()?;
                let block = doc.entry_mut(entry)?.script_mut(&script)?.insert_at(index, kind)?;
                Ok(json!({ "block": block.to_value()? }))
            })
        }

        Commands::RemoveBlock { file, entry, script, index, output } => {
            edit(&file, output.as_deref(), |doc| {
                let block = doc.entry_mut(entry)?.script_mut(&script)?.remove_at(index)?;
                Ok(json!({ "removed": block.to_value()? }))
            })
        }

        Commands::Touch { file, entry, output } => {
            edit(&file, output.as_deref(), |doc| {
                let stamp = doc.entry_mut(entry)?.touch(&codec)?;
                Ok(json!({ "last_updated": stamp }))
            })
        }
    }
}

fn read_document(path: &Path) -> Result<Loaded, StoreError> {
    let content = fs::read_to_string(path)?;
    let raw: Value = serde_json::from_str(&content)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(StoreDocument::load_named(raw, &name))
}

fn write_document(doc: &StoreDocument, path: &Path) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(&doc.serialize()?)?;
    fs::write(path, text)?;
    Ok(())
}

/// Loads `file`, applies `op`, and writes the result to `output` (or back to `file`).
fn edit<F>(file: &Path, output: Option<&Path>, op: F) -> ExitCode
where
    F: FnOnce(&mut StoreDocument) -> Result<Value, StoreError>,
{
    let mut loaded = match read_document(file) {
        Ok(l) => l,
        Err(e) => return fail_io(e.to_string()),
    };
    let result = match op(&mut loaded.document) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let target = output.unwrap_or(file);
    if let Err(e) = write_document(&loaded.document, target) {
        return fail_io(format!("Failed to write {}: {}", target.display(), e));
    }
    print_json(&json!({
        "success": true,
        "result": result,
        "written": target.display().to_string(),
    }));
    ExitCode::SUCCESS
}

fn entry_row(r: &EntryRef<'_>) -> Value {
    json!({
        "index": r.index,
        "title": r.entry.title().ok(),
        "last_updated": r.entry.last_updated().ok(),
        "scripts": r.entry.script_names().collect::<Vec<_>>(),
    })
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("{}", e),
    }
}

fn fail(e: StoreError) -> ExitCode {
    let output = json!({
        "success": false,
        "error": e.to_string(),
    });
    println!("{}", output);
    ExitCode::from(2)
}

fn fail_io(message: String) -> ExitCode {
    let output = json!({
        "success": false,
        "error": message,
    });
    println!("{}", output);
    ExitCode::FAILURE
}
