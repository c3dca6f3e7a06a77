//! Per-resource worker: fetch → read → index → query → preview → bound,
//! in isolation, with its own CPU budget. Never propagates an error to the
//! orchestrator — every failure mode produces a diagnostic and an empty
//! hit list (spec §4.4).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::archive::read_archive;
use crate::bm25::Index;
use crate::fetcher::ArchiveFetcher;
use crate::preview::extract_preview;
use crate::types::{Document, Failure, Hit, ResourceDescriptor};
use crate::Error;

/// Options controlling one worker's query and bounding behavior.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Fuzzy-match tolerance (0.0-1.0).
    pub fuzzy: f32,
    /// Whether prefix matches contribute a bonus.
    pub prefix: bool,
    /// Maximum preview length in characters.
    pub preview_max_chars: usize,
    /// Maximum hits this worker returns, after sort.
    pub per_worker_limit: usize,
    /// CPU budget in milliseconds before indexing stops early.
    pub cpu_budget_ms: u64,
    /// Deadline for this worker's fetch + read + index + query pipeline.
    pub deadline: Duration,
    /// Cap on archive entries read.
    pub max_files_per_resource: usize,
    /// Cap on bytes read per archive entry.
    pub max_bytes_per_file: u64,
}

/// Outcome of running one worker: its hits (possibly empty) and at most
/// one diagnostic identifying the terminal stage that stopped it.
#[derive(Debug, Default)]
pub struct WorkerOutcome {
    /// Ranked hits, bounded to `per_worker_limit`.
    pub hits: Vec<Hit>,
    /// At most one diagnostic (spec §4.4 state machine: one terminal reason).
    pub diagnostic: Option<Failure>,
}

/// Run the full per-resource pipeline for `descriptor` against `query`,
/// honoring `options.deadline` as a per-worker timeout and
/// `cancellation` as a cooperative cancellation signal.
///
/// This function never returns an `Err`: every failure mode is captured
/// as a [`Failure`] diagnostic on the returned [`WorkerOutcome`], per the
/// state machine in spec §4.4 (`INIT → FETCHING → READING → INDEXING →
/// QUERYING → DONE`, with any-stage failure going directly to `DONE`).
pub async fn run_worker(
    descriptor: &ResourceDescriptor,
    query: &str,
    options: &WorkerOptions,
    fetcher: Arc<ArchiveFetcher>,
    cancellation: tokio_util::sync::CancellationToken,
) -> WorkerOutcome {
    match tokio::time::timeout(
        options.deadline,
        run_worker_inner(descriptor, query, options, &fetcher, &cancellation),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(resource = descriptor.resource_id, "worker abandoned after deadline");
            WorkerOutcome {
                hits: Vec::new(),
                diagnostic: Some(Failure {
                    resource: descriptor.resource_id.clone(),
                    reason: Error::WorkerTimeout.failure_reason(),
                }),
            }
        }
    }
}

async fn run_worker_inner(
    descriptor: &ResourceDescriptor,
    query: &str,
    options: &WorkerOptions,
    fetcher: &ArchiveFetcher,
    cancellation: &tokio_util::sync::CancellationToken,
) -> WorkerOutcome {
    // FETCHING
    if cancellation.is_cancelled() {
        return cancelled(descriptor);
    }
    debug!(resource = descriptor.resource_id, "worker fetching archive");
    let bytes = tokio::select! {
        result = fetcher.fetch(&descriptor.archive_url, options.deadline) => match result {
            Ok(bytes) => bytes,
            Err(err) => return failed(descriptor, &err),
        },
        () = cancellation.cancelled() => return cancelled(descriptor),
    };

    // READING
    if cancellation.is_cancelled() {
        return cancelled(descriptor);
    }
    debug!(resource = descriptor.resource_id, "worker reading archive");
    let read_outcome = match read_archive(
        &bytes,
        descriptor.kind,
        descriptor.book_filter.as_deref(),
        options.max_files_per_resource,
        options.max_bytes_per_file,
    ) {
        Ok(outcome) => outcome,
        Err(err) => return failed(descriptor, &err),
    };

    if read_outcome.oversized_skipped > 0 {
        debug!(
            resource = descriptor.resource_id,
            skipped = read_outcome.oversized_skipped,
            "skipped oversized entries"
        );
    }

    // INDEXING, budgeted
    if cancellation.is_cancelled() {
        return cancelled(descriptor);
    }
    let started = Instant::now();
    let budget = Duration::from_millis(options.cpu_budget_ms);
    let mut documents = Vec::with_capacity(read_outcome.entries.len());
    let mut budget_exceeded = false;

    for entry in read_outcome.entries {
        if started.elapsed() > budget {
            budget_exceeded = true;
            break;
        }
        if entry.content.trim().is_empty() {
            continue; // empty/whitespace-only documents are dropped (spec §3)
        }
        documents.push(Document {
            doc_id: Document::make_doc_id(&descriptor.resource_id, &entry.path),
            content: entry.content,
            kind: descriptor.kind,
            resource_id: descriptor.resource_id.clone(),
            path: entry.path,
        });
    }

    // QUERYING
    let index = Index::build(&documents);
    let scored = index.query(query, options.fuzzy, options.prefix);

    let hits: Vec<Hit> = scored
        .into_iter()
        .take(options.per_worker_limit)
        .map(|scored_doc| Hit {
            resource_id: scored_doc.document.resource_id.clone(),
            resource_kind: scored_doc.document.kind,
            path: scored_doc.document.path.clone(),
            score: scored_doc.score,
            preview: extract_preview(
                &scored_doc.document.content,
                scored_doc.first_hit.byte_offset,
                options.preview_max_chars,
            ),
        })
        .collect();

    let diagnostic = if budget_exceeded {
        warn!(
            resource = descriptor.resource_id,
            indexed = documents.len(),
            "worker exceeded CPU budget, scored partial corpus"
        );
        Some(Failure {
            resource: descriptor.resource_id.clone(),
            reason: Error::BudgetExceeded {
                budget_ms: options.cpu_budget_ms,
                indexed: documents.len(),
            }
            .failure_reason(),
        })
    } else {
        None
    };

    WorkerOutcome { hits, diagnostic }
}

fn failed(descriptor: &ResourceDescriptor, err: &Error) -> WorkerOutcome {
    warn!(resource = descriptor.resource_id, error = %err, "worker failed");
    WorkerOutcome {
        hits: Vec::new(),
        diagnostic: Some(Failure {
            resource: descriptor.resource_id.clone(),
            reason: err.failure_reason(),
        }),
    }
}

fn cancelled(descriptor: &ResourceDescriptor) -> WorkerOutcome {
    WorkerOutcome {
        hits: Vec::new(),
        diagnostic: Some(Failure {
            resource: descriptor.resource_id.clone(),
            reason: Error::Cancelled.failure_reason(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentCache;
    use crate::types::ResourceKind;
    use std::io::{Cursor, Write};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zip::write::SimpleFileOptions;

    fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            for (name, content) in files {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    fn base_options() -> WorkerOptions {
        WorkerOptions {
            fuzzy: 0.2,
            prefix: true,
            preview_max_chars: 280,
            per_worker_limit: 50,
            cpu_budget_ms: 400,
            deadline: Duration::from_secs(5),
            max_files_per_resource: 500,
            max_bytes_per_file: 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn successful_run_returns_hits() {
        let server = MockServer::start().await;
        let zip = build_zip(&[("bible/kt/grace.md", "Grace is the unmerited favor of God.")]);
        Mock::given(method("GET"))
            .and(path("/en_tw.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(zip))
            .mount(&server)
            .await;

        let descriptor = ResourceDescriptor {
            owner: "unfoldingWord".into(),
            language: "en".into(),
            resource_id: "en_tw".into(),
            kind: ResourceKind::Words,
            archive_url: format!("{}/en_tw.zip", server.uri()),
            default_branch: Some("master".into()),
            book_filter: None,
        };

        let cache = Arc::new(ContentCache::new(16));
        let fetcher = Arc::new(ArchiveFetcher::new(1024 * 1024, false, cache).unwrap());
        let cancellation = tokio_util::sync::CancellationToken::new();

        let outcome = run_worker(&descriptor, "grace", &base_options(), fetcher, cancellation).await;
        assert_eq!(outcome.hits.len(), 1);
        assert!(outcome.hits[0].preview.to_lowercase().contains("grace"));
        assert!(outcome.diagnostic.is_none());
    }

    #[tokio::test]
    async fn fetch_failure_produces_diagnostic_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.zip"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let descriptor = ResourceDescriptor {
            owner: "unfoldingWord".into(),
            language: "en".into(),
            resource_id: "en_missing".into(),
            kind: ResourceKind::Bible,
            archive_url: format!("{}/missing.zip", server.uri()),
            default_branch: None,
            book_filter: None,
        };

        let cache = Arc::new(ContentCache::new(16));
        let fetcher = Arc::new(ArchiveFetcher::new(1024 * 1024, false, cache).unwrap());
        let cancellation = tokio_util::sync::CancellationToken::new();

        let outcome = run_worker(&descriptor, "grace", &base_options(), fetcher, cancellation).await;
        assert!(outcome.hits.is_empty());
        assert_eq!(outcome.diagnostic.unwrap().reason, "fetch_not_found");
    }

    #[tokio::test]
    async fn pre_cancelled_worker_returns_cancelled_diagnostic() {
        let descriptor = ResourceDescriptor {
            owner: "unfoldingWord".into(),
            language: "en".into(),
            resource_id: "en_tw".into(),
            kind: ResourceKind::Words,
            archive_url: "https://example.invalid/en_tw.zip".into(),
            default_branch: None,
            book_filter: None,
        };
        let cache = Arc::new(ContentCache::new(16));
        let fetcher = Arc::new(ArchiveFetcher::new(1024 * 1024, false, cache).unwrap());
        let cancellation = tokio_util::sync::CancellationToken::new();
        cancellation.cancel();

        let outcome = run_worker(&descriptor, "grace", &base_options(), fetcher, cancellation).await;
        assert!(outcome.hits.is_empty());
        assert_eq!(outcome.diagnostic.unwrap().reason, "cancelled");
    }
}
