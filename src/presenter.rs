//! Presenter - turns ranked hits into human-readable records
//!
//! Pure transformation, no I/O. Fallback rules:
//! - missing title → [`UNTITLED`]
//! - missing phase / estimated time → [`NOT_AVAILABLE`]
//! - missing description → [`PresentationError::MissingDescription`]
//! - empty or absent dependency list → dependency line omitted

use crate::types::SearchHit;
use serde::Serialize;
use std::fmt::{self, Write as _};

/// Maximum description length in characters before truncation
pub const DESCRIPTION_LIMIT: usize = 100;

/// Appended to descriptions cut at [`DESCRIPTION_LIMIT`]
pub const TRUNCATION_MARKER: &str = "...";

/// Title shown when a step has no name
pub const UNTITLED: &str = "Untitled step";

/// Shown for absent phase / estimated time
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, thiserror::Error)]
pub enum PresentationError {
    #[error("hit at rank {rank} (id {id}) has no description")]
    MissingDescription { rank: usize, id: String },
}

/// One formatted search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    /// 1-based position in the ranked list
    pub rank: usize,
    pub title: String,
    /// Similarity score with three decimals, e.g. `0.910`
    pub score: String,
    pub phase: String,
    pub description: String,
    pub estimated_time: String,
    /// Comma-joined dependency ids; `None` when there are none
    pub dependencies: Option<String>,
}

impl fmt::Display for DisplayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}. {}", self.rank, self.title)?;
        writeln!(f, "   Score: {}", self.score)?;
        writeln!(f, "   Phase: {}", self.phase)?;
        writeln!(f, "   Description: {}", self.description)?;
        write!(f, "   Estimated time: {}", self.estimated_time)?;
        if let Some(deps) = &self.dependencies {
            write!(f, "\n   Dependencies: {deps}")?;
        }
        Ok(())
    }
}

/// Format every hit, in order. Fails on the first hit without a description.
pub fn present(hits: &[SearchHit]) -> Result<Vec<DisplayRecord>, PresentationError> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| present_hit(i + 1, hit))
        .collect()
}

fn present_hit(rank: usize, hit: &SearchHit) -> Result<DisplayRecord, PresentationError> {
    let p = &hit.payload;
    let description = p
        .description
        .as_deref()
        .ok_or_else(|| PresentationError::MissingDescription {
            rank,
            id: hit.id.to_string(),
        })?;

    Ok(DisplayRecord {
        rank,
        title: p.name.clone().unwrap_or_else(|| UNTITLED.to_string()),
        score: format!("{:.3}", hit.score),
        phase: p.phase.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        description: truncate_description(description),
        estimated_time: p
            .estimated_time
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        dependencies: p
            .dependencies
            .as_ref()
            .filter(|deps| !deps.is_empty())
            .map(|deps| deps.join(", ")),
    })
}

/// Cut to [`DESCRIPTION_LIMIT`] characters plus the marker; shorter text is untouched.
pub fn truncate_description(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Full CLI listing for one query.
pub fn render_report(query: &str, namespace: &str, records: &[DisplayRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query: \"{query}\"");
    let _ = writeln!(out, "Namespace: {namespace}");

    if records.is_empty() {
        let _ = writeln!(out, "No matching steps found.");
        return out;
    }

    let noun = if records.len() == 1 { "step" } else { "steps" };
    let _ = writeln!(out, "Found {} matching {noun}:", records.len());
    for record in records {
        let _ = writeln!(out);
        let _ = writeln!(out, "{record}");
    }
    out
}
