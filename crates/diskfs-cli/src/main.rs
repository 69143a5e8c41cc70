//! diskfs command-line client.
//!
//! Usage:
//!   # Uses ~/.config/diskfs/config.ron and $DISKFS_TOKEN
//!   diskfs info
//!   diskfs ls /Photos
//!   diskfs put ./notes.txt /backup/notes.txt
//!   diskfs mkdir -p /backup/2024/q3
//!   diskfs rm -r /backup/2023
//!
//!   # Work inside a subtree
//!   diskfs --root /backup ls /
//!
//!   # Throwaway in-memory disk, no network
//!   diskfs --memory mkdir -p /a/b
//!
//! Ctrl-C cancels the in-flight remote call.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use diskfs_core::{DiskConfig, DiskFs, FileInfo, HttpClient, MemoryClient, ResourceClient};

/// Filesystem-style access to a cloud disk.
#[derive(Parser, Debug)]
#[command(name = "diskfs")]
#[command(about = "Filesystem-style access to a cloud disk")]
struct Args {
    /// Config file (RON). Defaults to the platform config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// OAuth token, overriding config and environment
    #[arg(long, global = true)]
    token: Option<String>,

    /// Scope every path to this remote directory
    #[arg(long, global = true)]
    root: Option<String>,

    /// Use an empty in-memory disk instead of the remote API
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show disk usage and owner
    Info,
    /// Print metadata for a path as JSON
    Stat { path: String },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Read the listing in batches of this many entries
        #[arg(short = 'n', long)]
        batch: Option<isize>,
    },
    /// Write a remote file to stdout
    Cat { path: String },
    /// Upload a local file
    Put {
        local: PathBuf,
        remote: String,
        /// Fail if the remote path already exists
        #[arg(long)]
        exclusive: bool,
    },
    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents, skip existing directories
        #[arg(short, long)]
        parents: bool,
    },
    /// Delete a file or directory
    Rm {
        path: String,
        /// Delete directories and everything in them
        #[arg(short, long)]
        recursive: bool,
    },
}

fn client(args: &Args) -> Result<Arc<dyn ResourceClient>> {
    if args.memory {
        tracing::info!("using in-memory disk");
        return Ok(Arc::new(MemoryClient::new()));
    }
    let mut config = DiskConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(token) = &args.token {
        config.token = Some(token.clone());
    }
    if config.token.is_none() {
        bail!("no OAuth token: pass --token, set DISKFS_TOKEN, or add `token` to the config file");
    }
    Ok(Arc::new(HttpClient::from_config(&config)?))
}

fn print_entry(entry: &FileInfo) {
    let kind = if entry.is_dir() { 'd' } else { '-' };
    println!(
        "{kind} {:>12} {} {}",
        entry.size,
        entry.modified.format("%Y-%m-%d %H:%M"),
        entry.name
    );
}

async fn run(fs: DiskFs, command: Command) -> Result<()> {
    match command {
        Command::Info => {
            println!("{}", fs.disk_info().await?);
        }
        Command::Stat { path } => {
            let info = fs.stat(&path).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Ls { path, batch: None } => {
            for entry in fs.read_dir(&path).await? {
                print_entry(&entry);
            }
        }
        Command::Ls {
            path,
            batch: Some(n),
        } => {
            let mut dir = fs.open(&path).await?;
            loop {
                let batch = dir.read_dir(n).await?;
                batch.entries.iter().for_each(print_entry);
                if batch.eof || n <= 0 {
                    break;
                }
            }
            dir.close();
        }
        Command::Cat { path } => {
            let mut file = fs.open(&path).await?;
            let data = file.read_to_end().await?;
            file.close();
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
        Command::Put {
            local,
            remote,
            exclusive,
        } => {
            let data = tokio::fs::read(&local)
                .await
                .with_context(|| format!("reading {}", local.display()))?;
            if exclusive {
                fs.write_file_exclusive(&remote, &data).await?;
            } else {
                fs.write_file(&remote, &data).await?;
            }
            tracing::info!(remote = %remote, bytes = data.len(), "uploaded");
        }
        Command::Mkdir { path, parents } => {
            if parents {
                fs.mkdir_all(&path).await?;
            } else {
                fs.mkdir(&path).await?;
            }
        }
        Command::Rm { path, recursive } => {
            if recursive {
                fs.remove_all(&path).await?;
            } else {
                fs.remove(&path).await?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let client = client(&args)?;
    let fs = if args.memory {
        DiskFs::from_arc(client)
    } else {
        DiskFs::connect(client).await?
    };
    let mut fs = fs.with_cancellation(cancel);

    if let Some(root) = &args.root {
        fs = fs.sub(root).await?;
    }

    run(fs, args.command).await
}
