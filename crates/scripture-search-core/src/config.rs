//! Engine configuration.
//!
//! Unlike a crawler or cache system with per-source settings persisted to
//! disk, this engine holds no state between requests, so configuration is a
//! flat set of tunables read once at startup from environment variables
//! (spec §6) with sensible defaults. `EngineConfig::from_env` layers
//! environment overrides on top of [`EngineConfig::default`].

use std::time::Duration;

/// Global tunables for the search engine, sourced from environment
/// variables with fallback to the recommended defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of workers dispatched concurrently per request.
    pub max_parallelism: usize,
    /// Default request timeout when the caller does not specify one, in ms.
    pub timeout_ms_default: u64,
    /// Hard ceiling on a caller-specified `timeoutMs`, in ms.
    pub timeout_ms_ceiling: u64,
    /// Maximum archive size accepted by the fetcher, in bytes.
    pub archive_max_bytes: u64,
    /// Maximum number of matching entries read from one archive.
    pub max_files_per_resource: usize,
    /// Maximum bytes read from a single archive entry before it is dropped.
    pub max_bytes_per_file: u64,
    /// Maximum characters returned in a hit's preview window.
    pub preview_max_chars: usize,
    /// Per-worker CPU budget before indexing stops early, in ms.
    pub cpu_budget_ms: u64,
    /// Whether the content-addressed archive cache and descriptor memo are
    /// consulted. The engine must behave correctly with this `false`.
    pub cache_enabled: bool,
    /// TTL for memoized catalog descriptor lists.
    pub descriptor_cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 16,
            timeout_ms_default: 2500,
            timeout_ms_ceiling: 5000,
            archive_max_bytes: 8 * 1024 * 1024,
            max_files_per_resource: 500,
            max_bytes_per_file: 1024 * 1024,
            preview_max_chars: 280,
            cpu_budget_ms: 400,
            cache_enabled: true,
            descriptor_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    /// Build a config from defaults overridden by environment variables.
    ///
    /// Malformed values fall back to the default for that field rather than
    /// failing startup — this engine's configuration is an accelerator/tuning
    /// surface, not a correctness dependency.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_parallelism: env_usize("SEARCH_MAX_PARALLELISM", defaults.max_parallelism),
            timeout_ms_default: env_u64(
                "SEARCH_TIMEOUT_MS_DEFAULT",
                defaults.timeout_ms_default,
            ),
            archive_max_bytes: env_u64("SEARCH_ARCHIVE_MAX_BYTES", defaults.archive_max_bytes),
            max_files_per_resource: env_usize(
                "SEARCH_MAX_FILES_PER_RESOURCE",
                defaults.max_files_per_resource,
            ),
            preview_max_chars: env_usize(
                "SEARCH_PREVIEW_MAX_CHARS",
                defaults.preview_max_chars,
            ),
            cache_enabled: env_bool("SEARCH_CACHE_ENABLED", defaults.cache_enabled),
            ..defaults
        }
    }

    /// Clamp a caller-supplied `timeoutMs` to `(0, timeout_ms_ceiling]`.
    #[must_use]
    pub const fn clamp_timeout_ms(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(ms) if ms > self.timeout_ms_ceiling => self.timeout_ms_ceiling,
            Some(ms) => ms,
            None => self.timeout_ms_default,
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_recommendations() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_parallelism, 16);
        assert_eq!(cfg.timeout_ms_default, 2500);
        assert_eq!(cfg.timeout_ms_ceiling, 5000);
        assert_eq!(cfg.archive_max_bytes, 8 * 1024 * 1024);
        assert_eq!(cfg.max_files_per_resource, 500);
        assert_eq!(cfg.max_bytes_per_file, 1024 * 1024);
        assert_eq!(cfg.cpu_budget_ms, 400);
    }

    #[test]
    fn clamp_timeout_caps_at_ceiling() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.clamp_timeout_ms(Some(100_000)), 5000);
        assert_eq!(cfg.clamp_timeout_ms(Some(1200)), 1200);
        assert_eq!(cfg.clamp_timeout_ms(None), 2500);
    }
}
