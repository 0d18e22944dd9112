use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use todolist::{
    DocumentStore, ListRepository,
    storage::{
        DurabilityMode, PersistenceManager,
        persistence::{DEFAULT_CHECKPOINT_THRESHOLD, JOURNAL_FILE, SNAPSHOT_FILE, read_journal},
    },
};

#[derive(Parser)]
#[command(name = "todolist-admin")]
#[command(about = "Offline maintenance for a todolist data directory")]
struct Cli {
    /// Directory holding the journal and snapshot.
    #[arg(long, default_value = ".data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the lists and item counts recovered from disk.
    Inspect,
    /// Fold the journal into a fresh snapshot.
    Checkpoint,
    /// Delete every stored item and list.
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect => inspect(&cli.data_dir).await,
        Command::Checkpoint => checkpoint(&cli.data_dir).await,
        Command::Reset { yes } => reset(&cli.data_dir, yes).await,
    }
}

fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.is_dir() {
        return Err(anyhow!(
            "Data directory '{}' does not exist",
            data_dir.display()
        ));
    }
    Ok(())
}

async fn open_store(data_dir: &Path) -> Result<DocumentStore> {
    ensure_data_dir(data_dir)?;
    DocumentStore::open(data_dir, DurabilityMode::Sync, DEFAULT_CHECKPOINT_THRESHOLD)
        .await
        .with_context(|| format!("Failed to open store in '{}'", data_dir.display()))
}

async fn inspect(data_dir: &Path) -> Result<()> {
    let pending = read_journal(&data_dir.join(JOURNAL_FILE))
        .await
        .context("Failed to read journal")?
        .len();
    let store = open_store(data_dir).await?;

    println!("Data directory: {}", data_dir.display());
    println!(
        "Snapshot: {}",
        if data_dir.join(SNAPSHOT_FILE).exists() {
            "present"
        } else {
            "absent"
        }
    );
    println!("Journal entries since last checkpoint: {pending}");
    println!("Today: {} item(s)", store.find_items().await?.len());

    for name in store.list_names().await? {
        let count = store
            .find_list(&name)
            .await?
            .map(|list| list.items.len())
            .unwrap_or_default();
        println!("{name}: {count} item(s)");
    }
    Ok(())
}

async fn checkpoint(data_dir: &Path) -> Result<()> {
    let store = open_store(data_dir).await?;
    store.checkpoint().await.context("Checkpoint failed")?;
    println!("Checkpoint written to {}", data_dir.join(SNAPSHOT_FILE).display());
    Ok(())
}

async fn reset(data_dir: &Path, yes: bool) -> Result<()> {
    if !yes {
        return Err(anyhow!("Refusing to reset without --yes"));
    }
    ensure_data_dir(data_dir)?;

    let Some(mut persistence) = PersistenceManager::open(data_dir, DurabilityMode::Sync).await?
    else {
        return Ok(());
    };
    persistence.reset().await.context("Reset failed")?;
    println!("Removed all lists and items from {}", data_dir.display());
    Ok(())
}
