//! # scripture-search-core
//!
//! Core functionality for the stateless biblical resource search engine: a
//! CPU- and I/O-bound search core that answers ranked full-text queries
//! over a dynamically-discovered, per-request corpus of Bible translation
//! artifacts. It holds no persistent search state between requests.
//!
//! ## Architecture
//!
//! The crate mirrors the five-component pipeline described by the
//! engine's design: the orchestrator is the only component exposed to
//! callers.
//!
//! - **Catalog Resolver** (`catalog`): resolves (language, owner,
//!   reference) to candidate resource descriptors.
//! - **Archive Fetcher** (`fetcher`): delivers archive bytes, with a
//!   content-addressed cache.
//! - **Archive Reader** (`archive`): streams ZIP entries, filtered by
//!   file-type rules and caps.
//! - **BM25 Indexer** (`bm25`): tokenizes and ranks a worker-local corpus.
//! - **Per-Resource Worker** (`worker`): runs fetch → read → index → query
//!   → preview → bound for one resource, in isolation.
//! - **Orchestrator** (`orchestrator`): fans out one worker per resource
//!   under a global deadline, merges and reranks, assembles the response.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scripture_search_core::{Orchestrator, EngineConfig, SearchRequest};
//!
//! # async fn run() -> scripture_search_core::Result<()> {
//! let orchestrator = Orchestrator::new(
//!     EngineConfig::from_env(),
//!     "https://git.door43.org/api".to_string(),
//! )?;
//!
//! let request = SearchRequest {
//!     query: "grace".to_string(),
//!     language: "en".to_string(),
//!     owner: "unfoldingWord".to_string(),
//!     reference: None,
//!     limit: 50,
//!     include_helps: true,
//!     fuzzy: 0.2,
//!     prefix: true,
//!     timeout_ms: None,
//! };
//!
//! let response = orchestrator.search(&request).await?;
//! println!("found {} hits", response.hits.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`] with structured error
//! information; see [`error`] for the taxonomy and which variants ever
//! propagate versus which are captured as response diagnostics.

/// Streaming ZIP archive reading, filtered by extension whitelist and caps
pub mod archive;
/// Tokenization, in-memory inverted index, and BM25-style scoring
pub mod bm25;
/// In-memory content-addressed cache with request coalescing
pub mod cache;
/// Catalog resolution with a static fallback for upstream outages
pub mod catalog;
/// Engine configuration sourced from environment variables
pub mod config;
/// Error types and result aliases
pub mod error;
/// Archive fetching over HTTP with a byte cap
pub mod fetcher;
/// Request-level fan-out, merge, and rerank coordination
pub mod orchestrator;
/// Contextual snippet extraction around a matched term
pub mod preview;
/// Core data types and structures
pub mod types;
/// Per-resource worker pipeline
pub mod worker;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
pub use types::{
    ArchiveEntry, Document, Failure, Hit, ResourceDescriptor, ResourceKind, SearchRequest,
    SearchResponse,
};
