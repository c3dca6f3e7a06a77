//! Command-line flags for the search server.
//!
//! Flags mirror the environment variables in spec §6 so the server can be
//! driven without an env file. Flags take precedence over environment
//! variables when both are set (`clap`'s `env` attribute resolves this).

use clap::Parser;

/// HTTP server exposing the biblical resource search engine over
/// `POST`/`GET /search`.
#[derive(Parser, Debug, Clone)]
#[command(name = "scripture-search-server")]
#[command(version)]
#[command(about = "Stateless biblical resource search engine HTTP server", long_about = None)]
pub struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "SEARCH_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Base URL of the upstream resource catalog API (spec §6).
    #[arg(
        long,
        env = "SEARCH_CATALOG_BASE_URL",
        default_value = "https://git.door43.org/api"
    )]
    pub catalog_base_url: String,

    /// Maximum number of workers dispatched concurrently per request.
    #[arg(long, env = "SEARCH_MAX_PARALLELISM")]
    pub max_parallelism: Option<usize>,

    /// Default request timeout when the caller does not specify one, in ms.
    #[arg(long, env = "SEARCH_TIMEOUT_MS_DEFAULT")]
    pub timeout_ms_default: Option<u64>,

    /// Maximum archive size accepted by the fetcher, in bytes.
    #[arg(long, env = "SEARCH_ARCHIVE_MAX_BYTES")]
    pub archive_max_bytes: Option<u64>,

    /// Maximum number of matching entries read from one archive.
    #[arg(long, env = "SEARCH_MAX_FILES_PER_RESOURCE")]
    pub max_files_per_resource: Option<usize>,

    /// Maximum characters returned in a hit's preview window.
    #[arg(long, env = "SEARCH_PREVIEW_MAX_CHARS")]
    pub preview_max_chars: Option<usize>,

    /// Disable the content-addressed archive cache and descriptor memo.
    #[arg(long, env = "SEARCH_CACHE_ENABLED")]
    pub cache_enabled: Option<bool>,

    /// Enable verbose (debug-level) logging.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational logging (only warnings and errors).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}
