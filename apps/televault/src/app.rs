//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use televault_index::{FileKind, FileRecord, MetadataStore, format_size};
use televault_remote::{Client, RemoteTransport};
use televault_transfer::{DeleteOutcome, DownloadOutcome, UploadOutcome};
use televault_vault::{DEFAULT_RECENT_LIMIT, SortOrder, UploadHandle, Vault, VaultStats};

use crate::cli::Commands;
use crate::config::Config;

/// Runs one subcommand to completion.
pub async fn run(command: Commands, config: Config, config_path: &Path) -> anyhow::Result<()> {
    let vault = open_vault(&config)?;

    match command {
        Commands::Upload { paths } => {
            require_credentials(&config, config_path)?;
            upload(&vault, &paths).await
        }
        Commands::Download { id, dest } => {
            require_credentials(&config, config_path)?;
            let dest = dest.unwrap_or_else(|| config.download_path());
            download(&vault, &id, &dest).await
        }
        Commands::Delete { id } => {
            require_credentials(&config, config_path)?;
            delete(&vault, &id).await
        }
        Commands::List { kind, sort, recent } => {
            let limit = recent.map(|n| n.unwrap_or(DEFAULT_RECENT_LIMIT));
            list(&vault, kind, sort, limit).await
        }
        Commands::Stats => stats(&vault).await,
        Commands::Reconcile => reconcile(&vault).await,
    }
}

fn open_vault(config: &Config) -> anyhow::Result<Vault> {
    let client = Client::new(&config.bot_token)
        .context("failed to build HTTP client")?
        .with_base_url(&config.api_base_url);
    let transport: Arc<dyn RemoteTransport> = Arc::new(client);
    let store = MetadataStore::new(config.index_path());

    Ok(Vault::new(store, transport, config.chat_id.trim()).with_max_upload_size(config.max_upload_bytes))
}

fn require_credentials(config: &Config, config_path: &Path) -> anyhow::Result<()> {
    if !config.is_configured() {
        bail!(
            "bot_token and chat_id must be set in {}",
            config_path.display()
        );
    }
    Ok(())
}

async fn upload(vault: &Vault, paths: &[PathBuf]) -> anyhow::Result<()> {
    let mut running = Vec::new();
    let mut failed = 0usize;
    for path in paths {
        match vault.upload(path).await {
            Ok(handle) => running.push((path.display().to_string(), handle)),
            Err(e) => {
                println!("{}: {e}", path.display());
                failed += 1;
            }
        }
    }

    let ids: Vec<String> = running.iter().map(|(_, h)| h.id.clone()).collect();
    let canceller = vault.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling uploads");
            for id in &ids {
                if let Err(e) = canceller.cancel_upload(id).await {
                    tracing::warn!(id = %id, error = %e, "cancel failed");
                }
            }
        }
    });

    let outcomes = futures_util::future::join_all(
        running
            .into_iter()
            .map(|(name, handle)| follow_upload(name, handle)),
    )
    .await;
    ctrl_c.abort();

    failed += outcomes.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        bail!("{failed} of {} uploads did not complete", paths.len());
    }
    Ok(())
}

/// Prints progress for one upload; returns whether it succeeded.
async fn follow_upload(name: String, mut handle: UploadHandle) -> bool {
    while let Some(percent) = handle.progress.recv().await {
        println!("{name}: {percent}%");
    }

    match handle.task.await {
        Ok(UploadOutcome::Succeeded { .. }) => {
            println!("{name}: uploaded (id {})", handle.id);
            true
        }
        Ok(UploadOutcome::Failed(msg)) => {
            println!("{name}: upload failed: {msg}");
            false
        }
        Ok(UploadOutcome::Cancelled) => {
            println!("{name}: upload cancelled");
            false
        }
        Err(e) => {
            tracing::error!(file = %name, error = %e, "upload task failed");
            false
        }
    }
}

async fn download(vault: &Vault, id: &str, dest: &Path) -> anyhow::Result<()> {
    let mut handle = vault.start_download(id, dest).await?;
    while let Some(percent) = handle.progress.recv().await {
        println!("{percent}%");
    }

    match handle.task.await? {
        DownloadOutcome::Succeeded(path) => {
            println!("saved to {}", path.display());
            Ok(())
        }
        DownloadOutcome::Failed(msg) => bail!("download failed: {msg}"),
    }
}

async fn delete(vault: &Vault, id: &str) -> anyhow::Result<()> {
    match vault.delete(id).await? {
        DeleteOutcome::Succeeded => {
            println!("deleted {id}");
            Ok(())
        }
        DeleteOutcome::Failed(msg) => bail!("delete failed: {msg}"),
    }
}

/// `recent` keeps the newest N of the filtered records before sorting.
async fn list(
    vault: &Vault,
    kind: Option<FileKind>,
    sort: SortOrder,
    recent: Option<usize>,
) -> anyhow::Result<()> {
    let mut records = match kind {
        Some(kind) => vault.list_by_kind(kind).await?,
        None => vault.list().await?,
    };
    if let Some(limit) = recent {
        records.truncate(limit);
    }
    sort.sort(&mut records);

    if records.is_empty() {
        println!("no files");
        return Ok(());
    }
    for record in &records {
        println!("{}", listing_line(record));
    }
    Ok(())
}

async fn stats(vault: &Vault) -> anyhow::Result<()> {
    println!("{}", stats_report(&vault.stats().await?));
    Ok(())
}

fn stats_report(stats: &VaultStats) -> String {
    let mut lines = vec![format!(
        "{} file(s), {} total",
        stats.files,
        format_size(stats.total_size)
    )];
    for kind in [
        FileKind::Image,
        FileKind::Video,
        FileKind::Audio,
        FileKind::Pdf,
        FileKind::Other,
    ] {
        lines.push(format!("  {:<5}  {}", kind, stats.count(kind)));
    }
    if stats.pending > 0 {
        lines.push(format!("  {} upload(s) not finished", stats.pending));
    }
    lines.join("\n")
}

async fn reconcile(vault: &Vault) -> anyhow::Result<()> {
    let removed = vault.reconcile_abandoned().await?;
    for record in &removed {
        println!("removed {} ({})", record.id(), record.name());
    }
    println!("{} abandoned record(s) removed", removed.len());
    Ok(())
}

fn listing_line(record: &FileRecord) -> String {
    let status = if record.is_uploaded() {
        "stored"
    } else {
        "pending"
    };
    let created = chrono::DateTime::from_timestamp_millis(record.created_at())
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());

    format!(
        "{}  {:<5}  {:>9}  {:<7}  {}  {}",
        record.id(),
        record.kind(),
        format_size(record.size()),
        status,
        created,
        record.name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_line_shows_record_fields() {
        let mut record = FileRecord::with_id("abc", "cat.png", 1536, 0, "/tmp/cat.png");
        record.mark_uploaded("fid", "7").unwrap();

        let line = listing_line(&record);
        assert!(line.starts_with("abc  image"), "{line}");
        assert!(line.contains("1.5 KB"));
        assert!(line.contains("stored"));
        assert!(line.contains("1970-01-01 00:00"));
        assert!(line.ends_with("cat.png"));
    }

    #[test]
    fn pending_records_are_marked() {
        let record = FileRecord::with_id("p", "notes.txt", 10, 0, "/tmp/notes.txt");
        assert!(listing_line(&record).contains("pending"));
    }

    #[test]
    fn stats_report_lists_every_kind() {
        let stats = VaultStats {
            files: 3,
            total_size: 2048,
            pending: 1,
            images: 2,
            pdfs: 1,
            ..VaultStats::default()
        };
        let report = stats_report(&stats);
        assert!(report.starts_with("3 file(s), 2.0 KB total"), "{report}");
        assert!(report.contains("image  2"));
        assert!(report.contains("video  0"));
        assert!(report.contains("1 upload(s) not finished"));
    }

    #[tokio::test]
    async fn upload_leaves_other_pending_records_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            bot_token: "1:x".into(),
            chat_id: "-100".into(),
            api_base_url: "http://127.0.0.1:9".into(),
            data_dir: tmp.path().display().to_string(),
            ..Config::default()
        };
        let store = MetadataStore::new(config.index_path());
        store.append(&FileRecord::with_id("other", "o.txt", 1, 1, "/tmp/o")).unwrap();

        let missing = tmp.path().join("missing.txt");
        let path = tmp.path().join("config.toml");
        let result = run(Commands::Upload { paths: vec![missing] }, config, &path).await;

        assert!(result.is_err());
        assert!(store.get("other").unwrap().is_some());
    }

    #[tokio::test]
    async fn remote_commands_need_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: tmp.path().display().to_string(),
            ..Config::default()
        };
        let path = tmp.path().join("config.toml");

        let err = run(Commands::Delete { id: "x".into() }, config.clone(), &path)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bot_token and chat_id"));

        // Local commands work without them.
        run(Commands::Reconcile, config, &path).await.unwrap();
    }
}
