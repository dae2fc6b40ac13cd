use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use rcalc_cli::config::{self, SettingsArgs};
use rcalc_core::{is_error, HistoryEntry, Settings};
use rcalc_menu::{EvaluationSession, QalcEvaluator};
use rcalc_store::HistoryStore;

#[derive(Parser)]
#[command(
    name = "rcalc",
    version,
    about = "Calculator front-end for qalc with a persistent, editable result history"
)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the calculator menu over stdio (line-delimited JSON)
    Menu,

    /// Evaluate one expression and print the result
    Eval {
        /// Expression to evaluate
        #[arg(required = true, num_args = 1..)]
        expression: Vec<String>,

        /// Append the result to history
        #[arg(short, long)]
        save: bool,
    },

    /// Inspect or edit the history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List entries, newest first, with their row numbers
    List {
        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the entry at a row (1 = newest)
    Get {
        row: usize,
    },

    /// Delete the entry at a row (1 = newest)
    Delete {
        row: usize,
    },

    /// Delete every entry
    Clear,
}

fn main() -> Result<()> {
    // stdout carries results and the menu protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let file_config = config::load_config(cli.settings.config.as_deref())?;
    let settings = config::resolve(file_config, &cli.settings);
    debug!(?settings, "settings resolved");

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => cmd_menu(settings),
        Commands::Eval { expression, save } => cmd_eval(settings, &expression.join(" "), save),
        Commands::History { command } => {
            let mut history = open_history(&settings)?;
            match command {
                HistoryCommands::List { limit } => cmd_history_list(&history, limit),
                HistoryCommands::Get { row } => cmd_history_get(&history, row),
                HistoryCommands::Delete { row } => cmd_history_delete(&mut history, row),
                HistoryCommands::Clear => cmd_history_clear(&mut history),
            }
        }
        Commands::Config => cmd_config(&cli.settings, &settings),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn open_history(settings: &Settings) -> Result<HistoryStore> {
    HistoryStore::open(settings).context("failed to open history")
}

// ---------------------------------------------------------------------------
// Calculator commands
// ---------------------------------------------------------------------------

fn cmd_menu(settings: Settings) -> Result<()> {
    let history = open_history(&settings)?;
    let evaluator = Arc::new(QalcEvaluator::new(&settings));
    runtime()?.block_on(async move {
        let (session, completions) = EvaluationSession::new(settings, evaluator);
        rcalc_menu::run_server(session, completions, history).await
    })
}

fn cmd_eval(settings: Settings, expression: &str, save: bool) -> Result<()> {
    let mut history = open_history(&settings)?;
    let evaluator = Arc::new(QalcEvaluator::new(&settings));

    let result = runtime()?.block_on(async move {
        let (mut session, mut completions) = EvaluationSession::new(settings, evaluator);
        let result = session.evaluate_once(expression, &mut completions).await?;
        anyhow::Ok(result.to_string())
    })?;

    if is_error(&result) {
        bail!("{result}");
    }
    println!("{result}");

    if save {
        if !history.append(&result)? {
            bail!("nothing to save");
        }
        debug!("saved to history");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// History commands
// ---------------------------------------------------------------------------

fn cmd_history_list(history: &HistoryStore, limit: Option<usize>) -> Result<()> {
    if history.is_empty() {
        println!("History is empty.");
        return Ok(());
    }

    let shown = limit.unwrap_or(history.len());
    for (idx, entry) in history.newest_first().take(shown).enumerate() {
        println!("{:>4}  {entry}", idx + 1);
    }
    Ok(())
}

fn cmd_history_get(history: &HistoryStore, row: usize) -> Result<()> {
    match history.get(row) {
        Some(entry) => {
            println!("{entry}");
            Ok(())
        }
        None => bail!("no history entry at row {row}"),
    }
}

fn cmd_history_delete(history: &mut HistoryStore, row: usize) -> Result<()> {
    let removed: HistoryEntry = history.remove(row)?;
    println!("Deleted: {removed}");
    Ok(())
}

fn cmd_history_clear(history: &mut HistoryStore) -> Result<()> {
    let count = history.len();
    history.clear()?;
    println!("Cleared {count} entries.");
    Ok(())
}

fn cmd_config(args: &SettingsArgs, settings: &Settings) -> Result<()> {
    println!("Config: {}", config::show_config_path(args.config.as_deref()));
    println!();
    println!("[display]");
    println!("  no_bold = {}", settings.no_bold);
    println!("  no_unicode = {}", settings.no_unicode);
    println!("  terse = {}", settings.terse);
    println!("  hint_result = {:?}", settings.hint_result);
    println!("  hint_welcome = {:?}", settings.hint_welcome);
    println!("  error_color = {}", settings.error_color);
    println!();
    println!("[history]");
    println!("  enabled = {}", settings.history_enabled());
    println!("  persist = {}", settings.persist_history());
    println!("  auto_save = {}", settings.auto_save);
    println!("  save_on_custom_input = {}", settings.history_on_custom_input);
    println!("  max_lines = {}", settings.history_max_lines);
    println!("  path = {}", settings.history_path.display());
    println!();
    println!("[evaluator]");
    println!("  binary = {}", settings.qalc_binary);
    println!("  timeout_secs = {}", settings.eval_timeout_secs);
    println!();
    println!("[command]");
    println!(
        "  template = {}",
        settings.command.as_deref().unwrap_or("(none, print to stdout)")
    );
    Ok(())
}
