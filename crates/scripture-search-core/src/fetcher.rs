//! Archive fetching: HTTP GET with a byte cap and a cache-through path.
//!
//! Grounded on the teacher's `Fetcher` (client construction: gzip/brotli,
//! custom user-agent, explicit timeout), with the conditional-request
//! (`ETag`/`If-Modified-Since`) logic dropped — archive URLs are
//! content-immutable per tag (spec §6), so a content-addressed cache keyed
//! by a hash of the URL is sufficient and simpler than revalidation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cache::ContentCache;
use crate::{Error, Result};

/// Fetches archive bytes over HTTP, reading through a content-addressed
/// cache first.
pub struct ArchiveFetcher {
    client: Client,
    cache: Arc<ContentCache<Bytes>>,
    max_bytes: u64,
    cache_enabled: bool,
}

impl ArchiveFetcher {
    /// Build a fetcher with the given byte cap and shared cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the underlying HTTP client fails to
    /// build.
    pub fn new(max_bytes: u64, cache_enabled: bool, cache: Arc<ContentCache<Bytes>>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                "scripture-search-engine/",
                env!("CARGO_PKG_VERSION")
            ))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            cache,
            max_bytes,
            cache_enabled,
        })
    }

    /// Fetch the archive at `url`, honoring `timeout`, reading through the
    /// content-addressed cache first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchTimeout`], [`Error::FetchNotFound`],
    /// [`Error::FetchTransient`], or [`Error::FetchTooLarge`].
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<Bytes> {
        let key = cache_key(url);

        if self.cache_enabled {
            if let Some(bytes) = self.cache.get(&key).await {
                debug!(url, "archive cache hit");
                return Ok(bytes);
            }
        }

        debug!(url, "fetching archive");
        let bytes = tokio::time::timeout(timeout, self.fetch_uncached(url))
            .await
            .map_err(|_| Error::FetchTimeout {
                elapsed_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        if self.cache_enabled {
            // Cache writes are best-effort and never block the response path.
            self.cache
                .put(key, bytes.clone(), Duration::from_secs(300))
                .await;
        }

        Ok(bytes)
    }

    async fn fetch_uncached(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transient_or_timeout(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::FetchNotFound { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(Error::FetchTransient {
                url: url.to_string(),
                reason: format!("upstream returned {status}"),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(Error::FetchTooLarge {
                    url: url.to_string(),
                    limit_bytes: self.max_bytes,
                });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transient_or_timeout(url, e))?;

        if bytes.len() as u64 > self.max_bytes {
            warn!(url, bytes = bytes.len(), "archive exceeded byte cap after download");
            return Err(Error::FetchTooLarge {
                url: url.to_string(),
                limit_bytes: self.max_bytes,
            });
        }

        info!(url, bytes = bytes.len(), "archive fetched");
        Ok(bytes)
    }
}

fn transient_or_timeout(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout { elapsed_ms: 0 }
    } else {
        Error::FetchTransient {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Strong hash of the URL, used as the cache key (content is addressed by
/// URL, not by bytes — URLs are authoritative per descriptor, spec §4.2).
#[must_use]
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("archive:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/archive.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3, 4]))
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(ContentCache::new(16));
        let fetcher = ArchiveFetcher::new(1024, true, cache).unwrap();
        let url = format!("{}/archive.zip", server.uri());

        let first = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(first.as_ref(), &[1, 2, 3, 4]);

        // Second fetch must hit the cache, not the mock (expect(1) above).
        let second = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(second.as_ref(), &[1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn not_found_maps_to_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.zip"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = Arc::new(ContentCache::new(16));
        let fetcher = ArchiveFetcher::new(1024, true, cache).unwrap();
        let url = format!("{}/missing.zip", server.uri());

        let err = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, Error::FetchNotFound { .. }));
    }

    #[tokio::test]
    async fn content_length_over_cap_is_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.zip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 64])
                    .insert_header("content-length", "64"),
            )
            .mount(&server)
            .await;

        let cache = Arc::new(ContentCache::new(16));
        let fetcher = ArchiveFetcher::new(8, true, cache).unwrap();
        let url = format!("{}/big.zip", server.uri());

        let err = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, Error::FetchTooLarge { .. }));
    }

    #[test]
    fn cache_key_is_stable_per_url() {
        assert_eq!(cache_key("https://a.example/x.zip"), cache_key("https://a.example/x.zip"));
        assert_ne!(cache_key("https://a.example/x.zip"), cache_key("https://a.example/y.zip"));
    }
}
