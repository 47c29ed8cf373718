use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use dealcheck_api::{FallbackBackend, HttpBackend, MockBackend, MockMode};
use dealcheck_core::{AnalyzeBackend, AnalyzeResult, ReceiptItem, Summary};
use dealcheck_store::{Database, HistoryStore, SessionStore, SqliteKv, StoredResult};

#[derive(Parser)]
#[command(name = "dealcheck", version, about = "Checks receipt prices against reference statistics")]
struct Cli {
    /// Analysis server URL (default: DEALCHECK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Sample data mode: always, never or auto (default: DEALCHECK_USE_MOCK)
    #[arg(long, global = true)]
    mock: Option<String>,

    /// Database file (default: DEALCHECK_DB or ~/.dealcheck/dealcheck.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a receipt image and keep the result as the working session
    Analyze {
        /// Path to the receipt image
        image: PathBuf,
    },
    /// Show the current working session
    Result {
        /// Print the raw JSON instead of the formatted view
        #[arg(long)]
        json: bool,
    },
    /// Edit the working session and recompute its summary
    Edit(EditArgs),
    /// Save the working session into history
    Save,
    /// Work with saved results
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Search the reference price catalog
    Search {
        /// Name or classification code fragment
        keyword: String,
    },
    /// Check whether the analysis server is up
    Health,
}

#[derive(Args)]
struct EditArgs {
    /// New purchase date label
    #[arg(long)]
    date: Option<String>,

    /// Which item to change, counting from 1 as listed
    #[arg(long)]
    item: Option<usize>,

    /// New raw label for the selected item
    #[arg(long)]
    name: Option<String>,

    /// New canonical label for the selected item
    #[arg(long)]
    canonical: Option<String>,

    /// New paid unit price for the selected item
    #[arg(long)]
    price: Option<f64>,

    /// New quantity for the selected item
    #[arg(long)]
    qty: Option<f64>,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List saved results, most recent first
    List,
    /// Show one saved result in full
    Show {
        id: String,
        /// Print the raw JSON instead of the formatted view
        #[arg(long)]
        json: bool,
    },
    /// Delete one saved result
    Delete { id: String },
    /// Delete all saved results
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let base_url = resolve_base_url(&cli);
    let mode = resolve_mode(&cli)?;
    let db_path = resolve_db_path(&cli);
    debug!(base_url = %base_url, mode = %mode, db = %db_path.display(), "configured");

    let db = Database::open(&db_path)?;
    let session = SessionStore::new(SqliteKv::new(db.clone()));
    let history = HistoryStore::new(SqliteKv::new(db));
    let backend = build_backend(&base_url, mode);

    match cli.command {
        Commands::Analyze { image } => run_analyze(backend.as_ref(), &session, &image).await,
        Commands::Result { json } => run_result(&session, json),
        Commands::Edit(args) => run_edit(&session, &args),
        Commands::Save => run_save(&session, &history),
        Commands::History { command } => match command {
            HistoryCommands::List => run_history_list(&history),
            HistoryCommands::Show { id, json } => run_history_show(&history, &id, json),
            HistoryCommands::Delete { id } => run_history_delete(&history, &id),
            HistoryCommands::Clear => run_history_clear(&history),
        },
        Commands::Search { keyword } => run_search(backend.as_ref(), &keyword).await,
        Commands::Health => run_health(backend.as_ref()).await,
    }
}

fn resolve_base_url(cli: &Cli) -> String {
    cli.api_url
        .clone()
        .or_else(|| std::env::var("DEALCHECK_API_URL").ok())
        .unwrap_or_default()
}

fn resolve_mode(cli: &Cli) -> anyhow::Result<MockMode> {
    let raw = cli
        .mock
        .clone()
        .or_else(|| std::env::var("DEALCHECK_USE_MOCK").ok());
    match raw {
        Some(raw) => raw.parse().map_err(anyhow::Error::msg),
        None => Ok(MockMode::default()),
    }
}

fn resolve_db_path(cli: &Cli) -> PathBuf {
    cli.db
        .clone()
        .or_else(|| std::env::var("DEALCHECK_DB").ok().map(PathBuf::from))
        .unwrap_or_else(|| dirs_home().join(".dealcheck").join("dealcheck.db"))
}

fn build_backend(base_url: &str, mode: MockMode) -> Box<dyn AnalyzeBackend> {
    if mode.wants_mock(base_url) {
        Box::new(MockBackend::new())
    } else {
        Box::new(FallbackBackend::new(HttpBackend::new(base_url), mode))
    }
}

async fn run_analyze(
    backend: &dyn AnalyzeBackend,
    session: &SessionStore<SqliteKv>,
    image: &Path,
) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("could not read {}", image.display()))?;
    let file_name = image
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("receipt.jpg");

    let result = backend.analyze_receipt(file_name, bytes).await?;
    session.save(&result)?;
    print_result(&result);
    Ok(())
}

fn run_result(session: &SessionStore<SqliteKv>, json: bool) -> anyhow::Result<()> {
    match session.load()? {
        Some(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
        Some(result) => print_result(&result),
        None => println!("No analysis session yet. Run `dealcheck analyze <image>` first."),
    }
    Ok(())
}

fn run_edit(session: &SessionStore<SqliteKv>, edit: &EditArgs) -> anyhow::Result<()> {
    let Some(mut result) = session.load()? else {
        bail!("no analysis session to edit");
    };

    if let Some(date) = &edit.date {
        result.purchase_date = Some(date.clone());
    }

    let wants_item_edit = edit.name.is_some()
        || edit.canonical.is_some()
        || edit.price.is_some()
        || edit.qty.is_some();
    if wants_item_edit {
        let Some(position) = edit.item else {
            bail!("pass --item to say which item to change");
        };
        let item = position
            .checked_sub(1)
            .and_then(|index| result.items.get_mut(index));
        let Some(item) = item else {
            bail!("no item {position} in the current result");
        };
        if let Some(name) = &edit.name {
            item.raw_name = name.clone();
        }
        if let Some(canonical) = &edit.canonical {
            item.canonical = Some(canonical.clone());
        }
        if let Some(price) = edit.price {
            item.paid_unit_price = Some(price);
        }
        if let Some(qty) = edit.qty {
            item.quantity = Some(qty);
        }
    }

    result.summary = Some(Summary::tally(&result.items));
    session.save(&result)?;
    print_result(&result);
    Ok(())
}

fn run_save(
    session: &SessionStore<SqliteKv>,
    history: &HistoryStore<SqliteKv>,
) -> anyhow::Result<()> {
    let Some(result) = session.load()? else {
        bail!("no analysis session to save");
    };
    let entry = StoredResult::new(result);
    let id = entry.id.clone();
    history.save(entry)?;
    println!("Saved as {id}");
    Ok(())
}

fn run_history_list(history: &HistoryStore<SqliteKv>) -> anyhow::Result<()> {
    let entries = history.load_all()?;
    if entries.is_empty() {
        println!("History is empty.");
        return Ok(());
    }
    for entry in &entries {
        // Counts come from the items themselves, not the stored summary
        let summary = Summary::tally(&entry.result.items);
        println!(
            "{}  {}  {} items  {}",
            entry.id,
            format_timestamp(entry.timestamp),
            entry.result.items.len(),
            summary_line(&summary),
        );
    }
    Ok(())
}

fn run_history_show(history: &HistoryStore<SqliteKv>, id: &str, json: bool) -> anyhow::Result<()> {
    let entries = history.load_all()?;
    match entries.into_iter().find(|entry| entry.id == id) {
        Some(entry) if json => println!("{}", serde_json::to_string_pretty(&entry)?),
        Some(entry) => {
            println!("{}  saved {}", entry.id, format_timestamp(entry.timestamp));
            print_result(&entry.result);
        }
        None => println!("No saved result with id {id}."),
    }
    Ok(())
}

fn run_history_delete(history: &HistoryStore<SqliteKv>, id: &str) -> anyhow::Result<()> {
    let existed = history.load_all()?.iter().any(|entry| entry.id == id);
    history.delete_by_id(id)?;
    if existed {
        println!("Deleted {id}.");
    } else {
        println!("No saved result with id {id}.");
    }
    Ok(())
}

fn run_history_clear(history: &HistoryStore<SqliteKv>) -> anyhow::Result<()> {
    history.clear()?;
    println!("History cleared.");
    Ok(())
}

async fn run_search(backend: &dyn AnalyzeBackend, keyword: &str) -> anyhow::Result<()> {
    let hits = backend.meta_search(keyword).await?;
    if hits.is_empty() {
        println!("No catalog entries matched \"{keyword}\".");
        return Ok(());
    }
    for hit in &hits {
        println!(
            "{:<8} {:<20} {}",
            hit.code.as_deref().unwrap_or("-"),
            hit.name.as_deref().unwrap_or("-"),
            hit.class_id.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

async fn run_health(backend: &dyn AnalyzeBackend) -> anyhow::Result<()> {
    let health = backend.health().await?;
    let models = if health.vision_model.is_empty() {
        "none".to_string()
    } else {
        health.vision_model.join(", ")
    };
    println!("ok: {}", health.ok);
    println!("vision models: {models}");
    println!("price statistics configured: {}", health.estat_app_id_set);
    Ok(())
}

fn print_result(result: &AnalyzeResult) {
    match &result.purchase_date {
        Some(date) => println!("Receipt dated {date}"),
        None => println!("Receipt with no date"),
    }
    if result.items.is_empty() {
        println!("  (no items)");
    }
    for (index, item) in result.items.iter().enumerate() {
        println!("{}", item_line(index + 1, item));
    }
    if let Some(summary) = &result.summary {
        println!("  {}", summary_line(summary));
    }
}

fn item_line(index: usize, item: &ReceiptItem) -> String {
    let mut line = format!("{index:>3}. {}", item.raw_name);
    if let Some(canonical) = &item.canonical {
        line.push_str(&format!(" ({canonical})"));
    }
    if let Some(price) = item.paid_unit_price {
        line.push_str(&format!("  paid {price:.2}"));
    }
    if let Some(qty) = item.quantity {
        line.push_str(&format!(" x{qty}"));
    }
    if let Some(estat) = &item.estat {
        if let Some(stat) = estat.stat_price {
            line.push_str(&format!("  ref {stat:.2}"));
        }
        if let Some(diff) = estat.diff {
            line.push_str(&format!("  diff {diff:+.2}"));
        }
        if let Some(judgement) = estat.judgement {
            line.push_str(&format!("  [{judgement}]"));
        }
        if let Some(note) = &estat.note {
            line.push_str(&format!("  {note}"));
        }
    }
    line
}

fn summary_line(summary: &Summary) -> String {
    format!(
        "{} deal, {} overpay, {} unknown, total diff {:+.2}",
        summary.deal_count, summary.overpay_count, summary.unknown_count, summary.total_diff
    )
}

fn format_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
