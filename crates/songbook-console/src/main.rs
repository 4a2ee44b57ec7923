use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use rustyline::DefaultEditor;
use songbook_core::{
    MemoryStore, Music, MusicRepository, RepositoryConfig, StoreClient, music_catalog,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod executor;
mod parser;

use display::OutputMode;

/// Songbook Console: interactive and scriptable CLI over an in-process song table.
#[derive(Parser, Debug)]
#[command(name = "songbook-console", version)]
struct Cli {
    /// Execute a command non-interactively (can be repeated).
    #[arg(short, long = "exec")]
    exec: Vec<String>,

    /// Output results as machine-parseable JSON.
    #[arg(short, long)]
    json: bool,

    /// Seed the table from a JSON array of songs before running commands.
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,

    /// Table name used in log events (default: Music).
    #[arg(long, value_name = "NAME")]
    table: Option<String>,

    /// Reject queries that would need a full table scan.
    #[arg(long)]
    no_scan: bool,
}

impl Cli {
    fn config(&self) -> RepositoryConfig {
        let mut config = RepositoryConfig::default().scan_enabled(!self.no_scan);
        if let Some(table) = &self.table {
            config = config.table_name(table.clone());
        }
        config
    }
}

fn history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("songbook").join("history.txt"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let repo = build_repository(cli.config());

    if let Some(path) = &cli.load
        && let Err(e) = load_songs(&repo, path)
    {
        eprintln!("Failed to load {}: {e}", path.display());
        process::exit(1);
    }

    if !cli.exec.is_empty() {
        let code = run_exec_mode(&repo, &cli.exec, cli.json);
        process::exit(code);
    } else if !std::io::stdin().is_terminal() {
        let code = run_pipe_mode(&repo, cli.json);
        process::exit(code);
    } else {
        run_repl(&repo);
    }
}

fn build_repository(config: RepositoryConfig) -> MusicRepository<MemoryStore> {
    let store = MemoryStore::new(music_catalog().table_schema(&config.table_name));
    MusicRepository::with_config(store, config)
}

/// Save every song from a JSON array file. Returns how many were saved.
fn load_songs<S: StoreClient>(
    repo: &MusicRepository<S>,
    path: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let songs: Vec<Music> = serde_json::from_str(&text)?;
    let saved = repo.save_all(songs)?.len();
    info!(path = %path.display(), saved, "loaded songs");
    Ok(saved)
}

/// Parse, execute and render one line.
///
/// Returns `Ok(false)` on EXIT. Errors are already rendered.
fn run_line<S: StoreClient>(
    repo: &MusicRepository<S>,
    line: &str,
    mode: &OutputMode,
) -> Result<bool, ()> {
    let cmd = parser::parse(line).map_err(|e| display::render_error(&e, mode))?;
    let result = executor::execute(repo, cmd).map_err(|e| display::render_error(&e, mode))?;
    Ok(display::render(&result, mode))
}

fn output_mode(json_mode: bool) -> OutputMode {
    if json_mode {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    }
}

/// Execute one or more commands non-interactively (--exec mode).
///
/// Returns exit code: 0 = all succeeded, 1 = first error stops execution.
fn run_exec_mode<S: StoreClient>(
    repo: &MusicRepository<S>,
    commands: &[String],
    json_mode: bool,
) -> i32 {
    let mode = output_mode(json_mode);
    for cmd_str in commands {
        match run_line(repo, cmd_str, &mode) {
            Ok(true) => {}
            Ok(false) => return 0,
            Err(()) => return 1,
        }
    }
    0
}

/// Read commands from stdin (pipe mode).
///
/// Returns exit code: 0 = all succeeded, 1 = first error.
fn run_pipe_mode<S: StoreClient>(repo: &MusicRepository<S>, json_mode: bool) -> i32 {
    let mode = output_mode(json_mode);
    let stdin = std::io::stdin();
    run_lines(repo, stdin.lock(), &mode)
}

fn run_lines<S: StoreClient>(
    repo: &MusicRepository<S>,
    input: impl BufRead,
    mode: &OutputMode,
) -> i32 {
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                display::render_error(&e, mode);
                return 1;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match run_line(repo, trimmed, mode) {
            Ok(true) => {}
            Ok(false) => return 0,
            Err(()) => return 1,
        }
    }
    0
}

/// Interactive REPL mode.
fn run_repl<S: StoreClient>(repo: &MusicRepository<S>) {
    println!("Songbook Console v{}", env!("CARGO_PKG_VERSION"));
    println!("Type HELP for available commands.\n");

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to initialize line editor: {e}");
            return;
        }
    };
    let history = history_path();
    if let Some(path) = &history {
        // A missing history file is normal on first run.
        let _ = rl.load_history(path);
    }

    let prompt = format!("songbook:{}> ", repo.config().table_name);
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let cmd = match parser::parse(trimmed) {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        display::print_error(&e);
                        continue;
                    }
                };

                match executor::execute(repo, cmd) {
                    Ok(result) => {
                        if !display::render(&result, &OutputMode::Pretty) {
                            break;
                        }
                    }
                    Err(e) => display::print_error(&e),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!();
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("Bye!");
                break;
            }
            Err(e) => {
                eprintln!("Readline error: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history {
        let saved = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .map_err(|e| e.to_string())
            .and_then(|()| rl.save_history(path).map_err(|e| e.to_string()));
        if let Err(e) = saved {
            warn!(path = %path.display(), error = %e, "failed to save history");
        }
    }
}
