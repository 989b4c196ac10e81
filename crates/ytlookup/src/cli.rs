use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::resolve::FormatSelection;
use crate::search::DEFAULT_MAX_RESULTS;
use crate::tools::yt_dlp::ExtractorConfig;

/// Top-level CLI definition for ytlookup.
#[derive(Parser, Debug)]
#[command(name = "ytlookup")]
#[command(version, about = "Resolve songs to audio stream URLs and search video metadata via yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the direct audio stream URL of the top search hit for a song.
    Resolve(ResolveArgs),
    /// Search for videos and print their metadata as a JSON array.
    Search(SearchArgs),
    /// Serve search and resolve over HTTP.
    Serve(ServeArgs),
}

/// Flags shared by every command that runs the extractor.
#[derive(clap::Args, Debug, Clone)]
pub struct ExtractorArgs {
    /// Path to the yt-dlp executable.
    #[arg(long = "yt-dlp", value_name = "PATH", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Timeout applied per extractor invocation (seconds, 0 disables it).
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl ExtractorArgs {
    pub fn to_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            binary: self.yt_dlp.clone(),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}

/// Arguments for the `resolve` subcommand.
#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Free-text song name to search for.
    pub song: String,

    /// Which requested format to print: an index into the list, or `audio` for the first audio-only one.
    #[arg(long, default_value = "1")]
    pub format: FormatSelection,

    /// Cookie file passed to yt-dlp; defaults to `cookies.txt` next to this executable when present.
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    #[command(flatten)]
    pub extractor: ExtractorArgs,
}

/// Arguments for the `search` subcommand.
#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Free-text search query.
    pub query: String,

    /// Maximum number of results to return.
    #[arg(default_value_t = DEFAULT_MAX_RESULTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_results: u32,

    /// Sort order: `date`, `views` or `alphabetic`. Other values keep the extractor's order.
    pub sort_by: Option<String>,

    /// Fail with a non-zero exit code when the extractor errors instead of printing `[]`.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Pretty-print the JSON output.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    #[command(flatten)]
    pub extractor: ExtractorArgs,
}

/// Arguments for the `serve` subcommand.
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Socket address for the HTTP listener.
    #[arg(long, default_value = "127.0.0.1:8787")]
    pub http_addr: SocketAddr,

    /// Cookie file used for resolve requests; defaults to `cookies.txt` next to this executable when present.
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    #[command(flatten)]
    pub extractor: ExtractorArgs,
}
