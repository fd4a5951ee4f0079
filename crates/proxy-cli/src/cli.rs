//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use proxy_models::{AspectRatio, MediaKind, ScanMode};

/// Proxy media cache maintenance
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project folder; its `proxies` subfolder is searched first
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Global proxy folder (overrides PROXY_FOLDER)
    #[arg(long, global = true)]
    pub proxy_folder: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report the cache state of a clip identity
    Locate {
        /// Clip identity (content hash)
        hash: String,

        #[arg(long, default_value = "video")]
        kind: MediaKind,
    },

    /// Render a proxy for a media file and wait for it
    Generate {
        /// Source media file
        resource: PathBuf,

        /// Clip identity (content hash)
        #[arg(long)]
        hash: String,

        /// Treat the source as a still image
        #[arg(long)]
        image: bool,

        /// Deinterlace mode: auto, progressive, tff or bff
        #[arg(long)]
        scan_mode: Option<ScanMode>,

        /// Display aspect ratio override, e.g. 16:9
        #[arg(long)]
        aspect: Option<AspectRatio>,

        /// Skip ffprobe and render without source metadata
        #[arg(long)]
        no_probe: bool,
    },

    /// Restore original resources in a saved project document
    Rewrite {
        /// Project document to rewrite
        file: PathBuf,

        /// Project root; resources below it are written relative
        #[arg(long, default_value = "")]
        root: String,
    },

    /// Remove abandoned pending markers
    ClearPending {
        /// Minimum marker age in seconds (defaults to the job timeout)
        #[arg(long)]
        older_than: Option<u64>,
    },
}
