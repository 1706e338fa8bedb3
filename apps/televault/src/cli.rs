use std::path::PathBuf;

use clap::{Parser, Subcommand};
use televault_index::FileKind;
use televault_vault::SortOrder;

#[derive(Parser)]
#[command(author, version, about = "Personal file vault backed by a Telegram channel", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/televault/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload files to the channel (Ctrl-C cancels)
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Download a stored file by record id
    Download {
        id: String,
        /// Destination directory (default: download_dir from the config)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Delete a file from the channel and the index
    Delete { id: String },
    /// List indexed files
    List {
        /// image, video, audio, pdf or other
        #[arg(long)]
        kind: Option<FileKind>,
        /// name, name-desc, newest, oldest, largest or smallest
        #[arg(long, default_value_t = SortOrder::Newest)]
        sort: SortOrder,
        /// Only the N newest files (a default limit if N is omitted)
        #[arg(long, num_args = 0..=1)]
        recent: Option<Option<usize>>,
    },
    /// Show file counts per kind and the total size
    Stats,
    /// Remove records of uploads that never finished. Run it while no other
    /// client is uploading to the same index.
    Reconcile,
}
