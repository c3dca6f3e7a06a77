//! Core data structures shared across the engine: resource descriptors,
//! archive entries, documents, hits, and the request/response envelope.
//!
//! ## Example
//!
//! ```rust
//! use scripture_search_core::types::{ResourceDescriptor, ResourceKind};
//!
//! let descriptor = ResourceDescriptor {
//!     owner: "unfoldingWord".to_string(),
//!     language: "en".to_string(),
//!     resource_id: "en_ult".to_string(),
//!     kind: ResourceKind::Bible,
//!     archive_url: "https://git.door43.org/unfoldingWord/en_ult/archive/master.zip".to_string(),
//!     default_branch: Some("master".to_string()),
//!     book_filter: None,
//! };
//! assert_eq!(descriptor.kind.allowed_extensions(), &["usfm", "usfm3"]);
//! ```

use serde::{Deserialize, Serialize};

/// The kind of resource a descriptor identifies. Determines the permitted
/// file extensions and the snippet-preview strategy (spec §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Scripture text (ULT/UST/etc.), stored as USFM.
    Bible,
    /// Translation notes, TSV.
    Notes,
    /// Translation questions, TSV.
    Questions,
    /// Translation word links, TSV.
    WordLinks,
    /// Translation words, Markdown.
    Words,
    /// Translation academy articles, Markdown.
    Academy,
    /// Open Bible Stories, Markdown.
    Obs,
}

impl ResourceKind {
    /// File extensions (without the leading dot) eligible for this kind.
    #[must_use]
    pub const fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Bible => &["usfm", "usfm3"],
            Self::Notes | Self::Questions | Self::WordLinks => &["tsv", "md"],
            Self::Words | Self::Academy | Self::Obs => &["md"],
        }
    }

    /// Relative priority used to break score ties deterministically
    /// (spec §3: ties broken by `resourceKind` priority then path).
    /// Lower value sorts first.
    #[must_use]
    pub const fn tie_break_priority(self) -> u8 {
        match self {
            Self::Bible => 0,
            Self::Notes => 1,
            Self::Questions => 2,
            Self::WordLinks => 3,
            Self::Words => 4,
            Self::Academy => 5,
            Self::Obs => 6,
        }
    }

    /// Wire string used in request/response JSON and upstream catalog
    /// subject mapping.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bible => "bible",
            Self::Notes => "notes",
            Self::Questions => "questions",
            Self::WordLinks => "word-links",
            Self::Words => "words",
            Self::Academy => "academy",
            Self::Obs => "obs",
        }
    }
}

/// Identifies one searchable archive (spec §3 Resource Descriptor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// The organization or user that owns the resource.
    pub owner: String,
    /// BCP-47-like language code.
    pub language: String,
    /// Stable resource identifier, e.g. `en_ult`.
    pub resource_id: String,
    /// What kind of resource this is; determines extension whitelist.
    pub kind: ResourceKind,
    /// URL of the resource's compressed archive.
    pub archive_url: String,
    /// The branch the archive was resolved from, if known.
    pub default_branch: Option<String>,
    /// Canonical book code to filter entries by, if a reference was given.
    pub book_filter: Option<String>,
}

/// A lazily-readable file within an archive (spec §3 Archive Entry).
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path of the entry within the archive.
    pub path: String,
    /// Size in bytes, known once the central directory entry is read.
    pub size_bytes: u64,
    /// The resource kind this entry was read under (drives decoding rules).
    pub kind: ResourceKind,
}

/// The unit indexed for BM25 (spec §3 Document).
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable id within a request: `{resourceId}::{path}`.
    pub doc_id: String,
    /// Decoded UTF-8 text content.
    pub content: String,
    /// Resource kind this document belongs to.
    pub kind: ResourceKind,
    /// Owning resource id.
    pub resource_id: String,
    /// Path within the archive.
    pub path: String,
}

impl Document {
    /// Build the stable doc id for a resource/path pair.
    #[must_use]
    pub fn make_doc_id(resource_id: &str, path: &str) -> String {
        format!("{resource_id}::{path}")
    }
}

/// One ranked search result (spec §3 Hit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    /// Id of the resource this hit came from.
    pub resource_id: String,
    /// Kind of the resource this hit came from.
    pub resource_kind: ResourceKind,
    /// Path of the matched document within the archive.
    pub path: String,
    /// BM25-like score; strictly positive.
    pub score: f32,
    /// Contextual preview window around the match.
    pub preview: String,
}

/// A diagnostic entry describing a non-fatal failure (spec §3/§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    /// The resource id the failure pertains to (or `"catalog"` for
    /// catalog-level fallbacks).
    pub resource: String,
    /// Stable, machine-matchable reason string (see `Error::failure_reason`).
    pub reason: String,
}

/// Caller input to the orchestrator (spec §3 Search Request).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// The search query text, non-empty, at most 512 chars.
    pub query: String,
    /// BCP-47-like language code.
    pub language: String,
    /// Owner/organization to search within.
    pub owner: String,
    /// Optional book/chapter reference filter, e.g. `"John 3:16"`.
    #[serde(default)]
    pub reference: Option<String>,
    /// Maximum hits to return; default 50, max 200.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Whether to include non-scripture helps resources. Default true.
    #[serde(default = "default_true")]
    pub include_helps: bool,
    /// Fuzzy-match tolerance (0.0-1.0), default 0.2.
    #[serde(default = "default_fuzzy")]
    pub fuzzy: f32,
    /// Whether prefix matches contribute a bonus. Default true.
    #[serde(default = "default_true")]
    pub prefix: bool,
    /// Caller-requested timeout in ms, clamped to the configured ceiling.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

const fn default_limit() -> usize {
    50
}

const fn default_true() -> bool {
    true
}

const fn default_fuzzy() -> f32 {
    0.2
}

impl SearchRequest {
    /// Validate the request per spec §4.5 step 1.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRequest`] if the query is empty/too
    /// long or any bounded option is out of range.
    pub fn validate(&self) -> crate::Result<()> {
        if self.query.trim().is_empty() {
            return Err(crate::Error::InvalidRequest("query must not be empty".into()));
        }
        if self.query.chars().count() > 512 {
            return Err(crate::Error::InvalidRequest(
                "query must be at most 512 characters".into(),
            ));
        }
        if self.limit > 200 {
            return Err(crate::Error::InvalidRequest(
                "limit must be at most 200".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fuzzy) {
            return Err(crate::Error::InvalidRequest(
                "fuzzy must be between 0.0 and 1.0".into(),
            ));
        }
        if let Some(ms) = self.timeout_ms {
            if ms == 0 {
                return Err(crate::Error::InvalidRequest(
                    "timeoutMs must be greater than zero".into(),
                ));
            }
        }
        if self.language.trim().is_empty() {
            return Err(crate::Error::InvalidRequest("language must not be empty".into()));
        }
        if self.owner.trim().is_empty() {
            return Err(crate::Error::InvalidRequest("owner must not be empty".into()));
        }
        Ok(())
    }
}

/// Result returned to the caller (spec §3 Search Response).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Wall-clock milliseconds from receipt to just before serialization.
    pub took_ms: u64,
    /// The query, echoed back.
    pub query: String,
    /// The language, echoed back.
    pub language: String,
    /// The owner, echoed back.
    pub owner: String,
    /// Number of resources the orchestrator attempted to search.
    pub resource_count: usize,
    /// Ranked hits, at most `limit`, sorted by score descending.
    pub hits: Vec<Hit>,
    /// Diagnostic entries for resources/catalog calls that did not succeed
    /// cleanly.
    pub failures: Vec<Failure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_query() {
        let req = SearchRequest {
            query: "   ".into(),
            language: "en".into(),
            owner: "unfoldingWord".into(),
            reference: None,
            limit: 50,
            include_helps: true,
            fuzzy: 0.2,
            prefix: true,
            timeout_ms: None,
        };
        assert!(matches!(req.validate(), Err(crate::Error::InvalidRequest(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_fuzzy() {
        let mut req = SearchRequest {
            query: "grace".into(),
            language: "en".into(),
            owner: "unfoldingWord".into(),
            reference: None,
            limit: 50,
            include_helps: true,
            fuzzy: 1.5,
            prefix: true,
            timeout_ms: None,
        };
        assert!(req.validate().is_err());
        req.fuzzy = 0.5;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validate_accepts_zero_limit() {
        let req = SearchRequest {
            query: "grace".into(),
            language: "en".into(),
            owner: "unfoldingWord".into(),
            reference: None,
            limit: 0,
            include_helps: true,
            fuzzy: 0.2,
            prefix: true,
            timeout_ms: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn tie_break_priority_orders_bible_first() {
        assert!(ResourceKind::Bible.tie_break_priority() < ResourceKind::Notes.tie_break_priority());
        assert!(ResourceKind::Words.tie_break_priority() < ResourceKind::Obs.tie_break_priority());
    }

    #[test]
    fn doc_id_is_stable() {
        assert_eq!(
            Document::make_doc_id("en_tw", "bible/kt/grace.md"),
            "en_tw::bible/kt/grace.md"
        );
    }
}
