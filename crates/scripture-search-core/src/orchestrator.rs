//! Request-level coordination: resolve descriptors, fan out one worker per
//! resource under a global deadline, merge and rerank hits, and assemble
//! the response (spec §4.5).
//!
//! The fan-out is built on `futures::stream::{iter, buffer_unordered}`
//! bounded by `max_parallelism`, mirroring
//! `GenerateOrchestrator::scrape_all` in the teacher's CLI crate — the
//! teacher's own parallel-fan-out-with-bounded-concurrency routine,
//! written for scraping many URLs under a concurrency cap. Same shape,
//! different payload: per-resource search instead of per-URL scraping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::ContentCache;
use crate::catalog::CatalogResolver;
use crate::config::EngineConfig;
use crate::fetcher::ArchiveFetcher;
use crate::types::{Failure, Hit, SearchRequest, SearchResponse};
use crate::worker::{run_worker, WorkerOptions};
use crate::{Error, Result};

/// The request-level coordinator. Holds the shared, cross-request caches
/// and HTTP clients; stateless with respect to any individual search.
pub struct Orchestrator {
    config: EngineConfig,
    catalog: CatalogResolver,
    fetcher: Arc<ArchiveFetcher>,
}

impl Orchestrator {
    /// Build an orchestrator wired to `catalog_base_url`, with caches
    /// sized for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if either HTTP client fails to build.
    pub fn new(config: EngineConfig, catalog_base_url: String) -> Result<Self> {
        let archive_cache = Arc::new(ContentCache::new(64));
        let descriptor_cache = Arc::new(ContentCache::new(256));

        let catalog = CatalogResolver::new(
            catalog_base_url,
            descriptor_cache,
            config.cache_enabled,
            config.descriptor_cache_ttl,
        )?;
        let fetcher = Arc::new(ArchiveFetcher::new(
            config.archive_max_bytes,
            config.cache_enabled,
            archive_cache,
        )?);

        Ok(Self {
            config,
            catalog,
            fetcher,
        })
    }

    /// Execute one search request end-to-end (spec §4.5 steps 1-8).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if validation fails, or
    /// [`Error::Internal`] in the rare case where the catalog (and its
    /// fallback) yielded zero descriptors.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();

        // Step 1: validate.
        request.validate()?;

        let global_timeout_ms = self.config.clamp_timeout_ms(request.timeout_ms);
        let global_deadline = Duration::from_millis(global_timeout_ms);

        // Step 2: resolve descriptors.
        let (descriptors, fallback_used) = self
            .catalog
            .resolve(
                &request.language,
                &request.owner,
                request.reference.as_deref(),
                request.include_helps,
                global_deadline,
            )
            .await;

        if descriptors.is_empty() {
            return Err(Error::Internal(
                "catalog and fallback both yielded zero descriptors".to_string(),
            ));
        }

        let mut failures = Vec::new();
        if fallback_used {
            failures.push(Failure {
                resource: "catalog".to_string(),
                reason: Error::CatalogUnavailable("used fallback descriptors".into()).failure_reason(),
            });
        }

        // Steps 3-4: fan out under a bounded concurrency and a global
        // deadline; abandon workers that don't finish in time.
        let per_worker_limit = request.limit.min(50).max(1);
        let cancellation = CancellationToken::new();
        let concurrency = descriptors.len().min(self.config.max_parallelism).max(1);

        // Per spec §4.5 step 3: each worker's deadline is bounded by the
        // *remaining* global deadline, not the full caller-requested
        // timeout, since catalog resolution already spent part of it.
        let remaining_ms = global_timeout_ms.saturating_sub(
            u64::try_from(started.elapsed().as_millis()).unwrap_or(global_timeout_ms),
        );
        let per_worker_deadline =
            Duration::from_millis((self.config.cpu_budget_ms * 2).min(remaining_ms.max(1)));

        let mut fan_out = stream::iter(descriptors.iter().cloned().map(|descriptor| {
            let query = request.query.clone();
            let options = WorkerOptions {
                fuzzy: request.fuzzy,
                prefix: request.prefix,
                preview_max_chars: self.config.preview_max_chars,
                per_worker_limit,
                cpu_budget_ms: self.config.cpu_budget_ms,
                deadline: per_worker_deadline,
                max_files_per_resource: self.config.max_files_per_resource,
                max_bytes_per_file: self.config.max_bytes_per_file,
            };
            let fetcher = Arc::clone(&self.fetcher);
            let cancellation = cancellation.clone();
            let resource_id = descriptor.resource_id.clone();
            async move {
                let outcome = run_worker(&descriptor, &query, &options, fetcher, cancellation).await;
                (resource_id, outcome)
            }
        }))
        .buffer_unordered(concurrency);

        // Collect completed workers as they finish rather than racing a
        // single timeout against the whole stream: a workers-still-running
        // timeout must not discard the outcomes already gathered from
        // workers that finished before the deadline (spec §4.5 step 4).
        let mut all_hits: Vec<Hit> = Vec::new();
        let mut completed: std::collections::HashSet<String> = std::collections::HashSet::new();
        let deadline_sleep = tokio::time::sleep(global_deadline);
        tokio::pin!(deadline_sleep);
        let mut deadline_hit = false;
        loop {
            tokio::select! {
                next = fan_out.next() => {
                    match next {
                        Some((resource_id, outcome)) => {
                            completed.insert(resource_id);
                            all_hits.extend(outcome.hits);
                            if let Some(diagnostic) = outcome.diagnostic {
                                failures.push(diagnostic);
                            }
                        }
                        None => break,
                    }
                }
                () = &mut deadline_sleep => {
                    warn!("global deadline reached before all workers completed");
                    cancellation.cancel();
                    deadline_hit = true;
                    break;
                }
            }
        }

        if deadline_hit {
            for descriptor in &descriptors {
                if !completed.contains(&descriptor.resource_id) {
                    failures.push(Failure {
                        resource: descriptor.resource_id.clone(),
                        reason: Error::WorkerTimeout.failure_reason(),
                    });
                }
            }
        }

        // Step 5-6: merge, rerank, truncate, deterministic tie-break.
        // Cross-worker scores are left un-normalized: each worker's BM25
        // is computed over its own small corpus, which the spec permits
        // as option (a) (see DESIGN.md for the tradeoff).
        sort_hits(&mut all_hits);
        all_hits.truncate(request.limit);

        let resource_count = descriptors.len();
        let response = SearchResponse {
            took_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            query: request.query.clone(),
            language: request.language.clone(),
            owner: request.owner.clone(),
            resource_count,
            hits: all_hits,
            failures,
        };

        info!(
            query = request.query,
            hits = response.hits.len(),
            failures = response.failures.len(),
            took_ms = response.took_ms,
            "search completed"
        );

        Ok(response)
    }
}

/// Sort by score descending, ties broken by `resourceKind` priority then
/// `path` lexicographic (spec §3).
fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.resource_kind.tie_break_priority().cmp(&b.resource_kind.tie_break_priority()))
            .then_with(|| a.path.cmp(&b.path))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceKind;

    fn hit(score: f32, kind: ResourceKind, path: &str) -> Hit {
        Hit {
            resource_id: "r".into(),
            resource_kind: kind,
            path: path.into(),
            score,
            preview: String::new(),
        }
    }

    #[test]
    fn sort_hits_orders_by_score_then_kind_then_path() {
        let mut hits = vec![
            hit(1.0, ResourceKind::Notes, "b.md"),
            hit(1.0, ResourceKind::Bible, "a.usfm"),
            hit(2.0, ResourceKind::Obs, "z.md"),
        ];
        sort_hits(&mut hits);
        assert_eq!(hits[0].path, "z.md");
        assert_eq!(hits[1].path, "a.usfm");
        assert_eq!(hits[2].path, "b.md");
    }
}
