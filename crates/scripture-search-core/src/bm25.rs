//! Tokenization, in-memory inverted index, and BM25-style scoring.
//!
//! Pulled out as its own module (spec.md's Implementation budget table
//! allocates 20% of the engine to a distinct "BM25 Indexer") so
//! tokenization and scoring can be unit-tested independently of
//! fetch/read/preview concerns — mirroring the teacher's
//! one-module-per-concern layout (`blz-core::index`, Tantivy-backed there,
//! hand-rolled in-memory here since no persistent index is allowed).
//!
//! Fuzzy matching uses `strsim`'s normalized Levenshtein similarity
//! (seeded from the retrieval pack's other examples — the teacher's own
//! `fuzzy-matcher`/Skim algorithm is tuned for registry-name lookup, not
//! per-token search-result fuzziness).

use std::collections::HashMap;

use crate::types::Document;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// A single term occurrence location within a document, used to seed
/// preview extraction.
#[derive(Debug, Clone, Copy)]
pub struct TermHit {
    /// Byte offset of the match start within the document content.
    pub byte_offset: usize,
    /// Whether this was an exact token match (vs. fuzzy/prefix).
    pub exact: bool,
}

/// Per-document scoring result.
#[derive(Debug, Clone)]
pub struct ScoredDocument<'a> {
    /// The scored document.
    pub document: &'a Document,
    /// Strictly positive BM25-like score.
    pub score: f32,
    /// Earliest matching term location, used for preview extraction.
    pub first_hit: TermHit,
}

struct Posting {
    doc_index: usize,
    term_frequency: u32,
    first_byte_offset: usize,
    exact: bool,
}

/// An ephemeral, worker-local inverted index built over one resource's
/// documents for the lifetime of a single request.
pub struct Index<'a> {
    documents: &'a [Document],
    doc_lengths: Vec<usize>,
    avg_doc_length: f32,
    postings: HashMap<String, Vec<Posting>>,
}

impl<'a> Index<'a> {
    /// Build an index over `documents`, tokenizing each once.
    #[must_use]
    pub fn build(documents: &'a [Document]) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(documents.len());

        for (doc_index, document) in documents.iter().enumerate() {
            let tokens = tokenize(&document.content);
            doc_lengths.push(tokens.len());

            let mut per_doc: HashMap<&str, (u32, usize)> = HashMap::new();
            for token in &tokens {
                per_doc
                    .entry(token.text.as_str())
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, token.byte_offset));
            }

            for (term, (count, first_offset)) in per_doc {
                postings
                    .entry(term.to_string())
                    .or_default()
                    .push(Posting {
                        doc_index,
                        term_frequency: count,
                        first_byte_offset: first_offset,
                        exact: true,
                    });
            }
        }

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().sum::<usize>() as f32 / doc_lengths.len() as f32
        };

        Self {
            documents,
            doc_lengths,
            avg_doc_length,
            postings,
        }
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Score `query` as a disjunction of term matches over the corpus,
    /// returning documents with strictly positive scores, best first.
    ///
    /// Multi-term queries sum per-term contributions (spec §4.4). Fuzzy
    /// candidates (normalized edit distance ≤ `fuzzy`) contribute with a
    /// penalty proportional to the distance; prefix matches (if `prefix`)
    /// contribute a small bonus. Ties are broken by (shorter path,
    /// lexicographic path) for determinism.
    #[must_use]
    pub fn query(&self, query: &str, fuzzy: f32, prefix: bool) -> Vec<ScoredDocument<'a>> {
        let query_terms: Vec<String> = tokenize(query).into_iter().map(|t| t.text).collect();
        if query_terms.is_empty() || self.documents.is_empty() {
            return Vec::new();
        }

        let n = self.documents.len() as f32;
        let mut scores: HashMap<usize, f32> = HashMap::new();
        let mut first_hits: HashMap<usize, TermHit> = HashMap::new();

        for query_term in &query_terms {
            for (term, weight, is_exact) in self.matching_terms(query_term, fuzzy, prefix) {
                let Some(postings) = self.postings.get(&term) else {
                    continue;
                };
                let df = postings.len() as f32;
                // BM25 idf with the +1 floor so never-negative for common terms.
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

                for posting in postings {
                    let doc_len = self.doc_lengths[posting.doc_index] as f32;
                    let tf = posting.term_frequency as f32;
                    let denom = tf + K1 * (1.0 - B + B * doc_len / self.avg_doc_length.max(1.0));
                    let term_score = idf * (tf * (K1 + 1.0)) / denom.max(f32::EPSILON) * weight;

                    *scores.entry(posting.doc_index).or_insert(0.0) += term_score;

                    first_hits
                        .entry(posting.doc_index)
                        .and_modify(|existing| {
                            if posting.first_byte_offset < existing.byte_offset {
                                *existing = TermHit {
                                    byte_offset: posting.first_byte_offset,
                                    exact: is_exact,
                                };
                            }
                        })
                        .or_insert(TermHit {
                            byte_offset: posting.first_byte_offset,
                            exact: is_exact,
                        });
                }
            }
        }

        let mut results: Vec<ScoredDocument<'a>> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc_index, score)| ScoredDocument {
                document: &self.documents[doc_index],
                score,
                first_hit: first_hits[&doc_index],
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.path.len().cmp(&b.document.path.len()))
                .then_with(|| a.document.path.cmp(&b.document.path))
        });

        results
    }

    /// Terms in the index matching `query_term` exactly, fuzzily, or by
    /// prefix, each with a scoring weight.
    fn matching_terms(&self, query_term: &str, fuzzy: f32, prefix: bool) -> Vec<(String, f32, bool)> {
        let mut matches = Vec::new();

        if self.postings.contains_key(query_term) {
            matches.push((query_term.to_string(), 1.0, true));
        }

        for term in self.postings.keys() {
            if term == query_term {
                continue;
            }
            if prefix && term.starts_with(query_term) {
                matches.push((term.clone(), 1.1, false));
                continue;
            }
            if fuzzy > 0.0 {
                let similarity = strsim::normalized_levenshtein(query_term, term) as f32;
                let distance = 1.0 - similarity;
                if distance <= fuzzy && distance > 0.0 {
                    let penalty = (1.0 - distance).max(0.05);
                    matches.push((term.clone(), penalty, false));
                }
            }
        }

        matches
    }
}

struct Token {
    text: String,
    byte_offset: usize,
}

/// Unicode-aware word splitter: lowercase folding, punctuation stripped
/// outside tokens, numeric tokens retained (spec §4.4).
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_start: Option<usize> = None;

    for (byte_offset, ch) in text.char_indices() {
        if ch.is_alphanumeric() {
            if current.is_empty() {
                current_start = Some(byte_offset);
            }
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(Token {
                text: std::mem::take(&mut current),
                byte_offset: current_start.take().unwrap_or(byte_offset),
            });
        }
    }
    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            byte_offset: current_start.unwrap_or(0),
        });
    }

    tokens
}
