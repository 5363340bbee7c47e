//! Storage subcommands.

use std::path::PathBuf;

use anyhow::Context;
use bytes::Bytes;
use clap::Subcommand;
use stowage_core::{StorageRegistry, StorageService};
use stowage_openstack::{OpenStackConfig, OpenStackStorage, STORAGE_NAME};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::TRACING_TARGET_COMMAND;

/// Path argument standing for stdin or stdout.
const STDIO: &str = "-";

/// A single storage operation.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Upload a file (or stdin with `-`) under a reference
    Put {
        /// Reference to store the contents under
        reference: String,
        /// File to upload, `-` for stdin
        file: PathBuf,
    },

    /// Download the contents of a reference
    Get {
        /// Reference to fetch
        reference: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a reference
    Delete {
        /// Reference to delete
        reference: String,
    },

    /// List references one page at a time
    List {
        /// Continuation token printed by a previous call
        #[arg(long, default_value = "")]
        token: String,
        /// Page size for this listing
        #[arg(long)]
        limit: Option<usize>,
        /// Follow continuation tokens until the last page
        #[arg(long)]
        all: bool,
    },

    /// Print the public URL prefix of the container
    LinkBase,

    /// Create the container
    CreateContainer {
        /// Make the container world-readable
        #[arg(long)]
        public: bool,
    },

    /// Delete the (empty) container
    DeleteContainer,
}

impl Command {
    /// Runs the command against the configured container.
    pub async fn execute(self, mut config: OpenStackConfig) -> anyhow::Result<()> {
        tracing::debug!(
            target: TRACING_TARGET_COMMAND,
            command = ?self,
            "Executing command"
        );

        match self {
            Self::Put { reference, file } => {
                let contents = read_input(&file).await?;
                let storage = dial(&config).await?;
                storage
                    .put(&reference, contents)
                    .await
                    .with_context(|| format!("failed to put {reference:?}"))?;
            }
            Self::Get { reference, output } => {
                let storage = dial(&config).await?;
                let contents = storage
                    .download(&reference)
                    .await
                    .with_context(|| format!("failed to download {reference:?}"))?;
                write_output(output.as_deref(), &contents).await?;
            }
            Self::Delete { reference } => {
                let storage = dial(&config).await?;
                storage
                    .delete(&reference)
                    .await
                    .with_context(|| format!("failed to delete {reference:?}"))?;
            }
            Self::List { token, limit, all } => {
                if let Some(limit) = limit {
                    config.list_limit = limit;
                }
                let storage = dial(&config).await?;
                list(&storage, token, all).await?;
            }
            Self::LinkBase => {
                let storage = dial(&config).await?;
                let base = storage
                    .link_base()
                    .await
                    .context("failed to get link base")?;
                println!("{base}");
            }
            Self::CreateContainer { public } => {
                let storage = connect(config).await?;
                storage
                    .create_container(public)
                    .await
                    .context("failed to create container")?;
            }
            Self::DeleteContainer => {
                let storage = connect(config).await?;
                storage
                    .delete_container()
                    .await
                    .context("failed to delete container")?;
            }
        }

        Ok(())
    }
}

/// Dials the OpenStack backend through the registry.
async fn dial(config: &OpenStackConfig) -> anyhow::Result<StorageService> {
    let mut registry = StorageRegistry::new();
    stowage_openstack::register(&mut registry).context("failed to register storage")?;

    registry
        .dial(STORAGE_NAME, config.to_opts())
        .await
        .context("failed to connect to OpenStack")
}

/// Connects to the OpenStack backend directly, for container management.
async fn connect(config: OpenStackConfig) -> anyhow::Result<OpenStackStorage> {
    OpenStackStorage::connect(config)
        .await
        .context("failed to connect to OpenStack")
}

async fn list(storage: &StorageService, mut token: String, all: bool) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();

    loop {
        let page = storage.list(&token).await.context("failed to list")?;

        let mut lines = String::new();
        for item in &page.refs {
            lines.push_str(&format!("{}\t{}\n", item.size, item.reference));
        }
        stdout.write_all(lines.as_bytes()).await?;

        if page.is_last() {
            break;
        }
        if !all {
            eprintln!("next token: {}", page.next_token);
            break;
        }
        token = page.next_token;
    }

    stdout.flush().await?;
    Ok(())
}

async fn read_input(file: &std::path::Path) -> anyhow::Result<Bytes> {
    if file.as_os_str() == STDIO {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdin")?;
        return Ok(Bytes::from(buf));
    }

    let buf = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    Ok(Bytes::from(buf))
}

async fn write_output(output: Option<&std::path::Path>, contents: &[u8]) -> anyhow::Result<()> {
    match output {
        Some(path) if path.as_os_str() != STDIO => tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        _ => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(contents).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}
