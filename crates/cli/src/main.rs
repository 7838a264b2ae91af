//! Command-line front end for a local larder drive.

mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use futures::StreamExt;
use larder_core::config::AppConfig;
use larder_drive::{Drive, DriveError, DriveResult, FileSource};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Part size used when uploading in chunked mode.
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Personal drive backed by a SQLite catalog and a blob store")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "LARDER_CONFIG",
        default_value = "larder.toml",
        global = true
    )]
    config: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct OwnerArgs {
    /// Owner whose drive to operate on
    #[arg(long, env = "LARDER_OWNER")]
    owner: Uuid,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a directory
    Mkdir {
        name: String,
        /// Parent directory id (root if omitted)
        #[arg(long)]
        parent: Option<i64>,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Upload a local file
    Upload {
        path: PathBuf,
        /// Destination directory id (root if omitted)
        #[arg(long)]
        parent: Option<i64>,
        /// Name to store the file under (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
        /// Upload in numbered parts (implied for files above the direct upload ceiling)
        #[arg(long)]
        chunked: bool,
        /// Part size in bytes for chunked uploads
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// List a directory
    Ls {
        /// Directory id (root if omitted)
        #[arg(long)]
        parent: Option<i64>,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Move nodes into a directory
    Mv {
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Destination directory id (root if omitted)
        #[arg(long)]
        to: Option<i64>,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Rename a node
    Rename {
        id: i64,
        name: String,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Delete a node and everything below it
    Rm {
        id: i64,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Download a file
    Get {
        id: i64,
        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Show quota usage
    Space {
        #[command(flatten)]
        owner: OwnerArgs,
    },
}

/// Attach the stable error code so scripts can match on it.
trait CodedExt<T> {
    fn coded(self) -> Result<T>;
}

impl<T> CodedExt<T> for DriveResult<T> {
    fn coded(self) -> Result<T> {
        self.map_err(|e: DriveError| {
            let message = format!("{}: {}", e.code(), e);
            anyhow::Error::new(e).context(message)
        })
    }
}

fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if Path::new(path).exists() {
        tracing::debug!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}, using defaults", path);
    }

    let config: AppConfig = figment
        .merge(
            Env::prefixed("LARDER_")
                .ignore(&["config", "owner"])
                .split("__"),
        )
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

async fn open_drive(config: &AppConfig) -> Result<Drive> {
    let storage = larder_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::debug!(backend = storage.backend_name(), "Storage backend ready");

    let metadata = larder_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata health check failed")?;
    tracing::debug!("Metadata store ready");

    Ok(Drive::new(metadata, storage, config.drive.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli {
        config,
        json,
        command,
    } = Cli::parse();

    let config = load_config(&config)?;
    let drive = open_drive(&config).await?;

    match command {
        Commands::Mkdir {
            name,
            parent,
            owner,
        } => {
            let listing = drive
                .create_directory(owner.owner, &name, parent)
                .await
                .coded()?;
            show_listing(&listing, json)
        }
        Commands::Upload {
            path,
            parent,
            name,
            chunked,
            chunk_size,
            owner,
        } => handle_upload(&drive, owner.owner, parent, &path, name, chunked, chunk_size, json).await,
        Commands::Ls { parent, owner } => {
            let listing = drive.get_tree(owner.owner, parent).await.coded()?;
            show_listing(&listing, json)
        }
        Commands::Mv { ids, to, owner } => {
            drive.move_nodes(owner.owner, &ids, to).await.coded()?;
            if json {
                render::print_json(&serde_json::json!({ "moved": ids, "destination": to }))
            } else {
                println!("Moved {} item(s)", ids.len());
                Ok(())
            }
        }
        Commands::Rename { id, name, owner } => {
            drive.rename(owner.owner, id, &name).await.coded()?;
            if json {
                render::print_json(&serde_json::json!({ "id": id, "name": name.trim() }))
            } else {
                println!("Renamed {id} to {}", name.trim());
                Ok(())
            }
        }
        Commands::Rm { id, owner } => {
            let summary = drive.delete(owner.owner, id).await.coded()?;
            if json {
                render::print_json(&summary)
            } else {
                render::render_delete(&summary);
                Ok(())
            }
        }
        Commands::Get { id, output, owner } => {
            handle_get(&drive, owner.owner, id, output.as_deref()).await
        }
        Commands::Space { owner } => {
            let space = drive
                .space(owner.owner, config.drive.quota_bytes)
                .await
                .coded()?;
            if json {
                render::print_json(&space)
            } else {
                render::render_space(&space);
                Ok(())
            }
        }
    }
}

fn show_listing(listing: &[larder_drive::TreeEntry], json: bool) -> Result<()> {
    if json {
        render::print_json(listing)
    } else {
        render::render_listing(listing);
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_upload(
    drive: &Drive,
    owner: Uuid,
    parent: Option<i64>,
    path: &Path,
    name: Option<String>,
    chunked: bool,
    chunk_size: usize,
    json: bool,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("upload path has no file name")?,
    };

    let mut source = FileSource::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;

    let limits = drive.default_limits();
    let declared = larder_drive::UploadSource::declared_len(&source).unwrap_or(0);
    let chunked = chunked || declared > drive.config().direct_upload_ceiling;
    let listing = if chunked {
        if chunk_size == 0 {
            anyhow::bail!("--chunk-size must be greater than 0");
        }
        let handle = drive
            .prepare_chunked_upload(owner, parent, &name, declared, limits)
            .await
            .coded()?;

        let mut number: u32 = 0;
        loop {
            let mut buf = Vec::with_capacity(chunk_size);
            let read = (&mut source)
                .take(chunk_size as u64)
                .read_to_end(&mut buf)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            if read == 0 && number > 0 {
                break;
            }
            drive
                .append_chunk(owner, handle, number, buf.into())
                .await
                .coded()?;
            number += 1;
            if read < chunk_size {
                break;
            }
        }

        let info = drive.chunk_info(owner, handle).await.coded()?;
        tracing::info!(
            handle = %handle,
            chunks = info.count,
            total_size = info.total_size,
            "All chunks sent"
        );
        drive
            .finalize_chunked_upload(owner, handle, limits.quota)
            .await
            .coded()?
    } else {
        drive
            .upload_file(owner, parent, &name, &mut source, limits)
            .await
            .coded()?
    };

    show_listing(&listing, json)
}

async fn handle_get(drive: &Drive, owner: Uuid, id: i64, output: Option<&Path>) -> Result<()> {
    let mut download = drive.get_file(owner, id).await.coded()?;

    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = match output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut written = 0u64;
    while let Some(chunk) = download.stream.next().await {
        let chunk = chunk.context("failed to read file content")?;
        written += chunk.len() as u64;
        writer
            .write_all(&chunk)
            .await
            .context("failed to write output")?;
    }
    writer.flush().await.context("failed to write output")?;

    tracing::info!(
        name = %download.original_name,
        bytes = written,
        "File downloaded"
    );
    if let Some(path) = output {
        eprintln!(
            "Saved {} ({}) to {}",
            download.original_name,
            render::format_bytes(download.size),
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_coded_errors_carry_code() {
        let result: DriveResult<()> = Err(DriveError::MovingIntoSelf);
        let err = result.coded().unwrap_err();
        assert!(err.to_string().starts_with("moving_into_self:"));
    }

    #[test]
    fn test_mv_requires_ids() {
        let parsed = Cli::try_parse_from([
            "larder",
            "mv",
            "--owner",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
        ]);
        assert!(parsed.is_err());
    }
}
