use std::collections::HashSet;

use crate::error::{CaptaError, Result};
use crate::models::{field_by_key, TargetField, TARGET_FIELDS};

/// Minimum score at which a proposed match is auto-selected.
pub const AUTO_ACCEPT_THRESHOLD: f64 = 0.75;

/// One source column and its (proposed or operator-chosen) target field.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub source: String,
    pub source_index: usize,
    pub target: Option<&'static TargetField>,
    pub score: Option<f64>,
    pub is_selected: bool,
}

// ---------------------------------------------------------------------------
// Header normalization
// ---------------------------------------------------------------------------

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Diacritics stripped, lowercased, every non-alphanumeric run removed:
/// `"Data Captação"` → `"datacaptacao"`.
pub fn squash(s: &str) -> String {
    s.chars()
        .map(fold_char)
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Lowercased, diacritics-stripped tokens split on non-alphanumeric
/// boundaries: `"Cod. do Assessor"` → `["cod", "do", "assessor"]`.
pub fn tokens(s: &str) -> Vec<String> {
    let folded: String = s.chars().map(fold_char).map(|c| c.to_ascii_lowercase()).collect();
    folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn overlap_score(source: &[String], field: &[String]) -> Option<f64> {
    let src: HashSet<&str> = source.iter().map(String::as_str).collect();
    let fld: HashSet<&str> = field.iter().map(String::as_str).collect();
    let common = src.intersection(&fld).count();
    let ratio = common as f64 / std::cmp::max(1, std::cmp::max(src.len(), fld.len())) as f64;
    if ratio >= 0.6 {
        Some(0.85)
    } else if common >= 1 {
        Some(0.75)
    } else {
        None
    }
}

/// Score a source header against one target field. Highest rule wins:
/// key equality 1.0, label equality 0.98, substring containment 0.9,
/// strong token overlap 0.85, any token overlap 0.75. None when the two
/// share nothing.
pub fn score_match(header: &str, field: &TargetField) -> Option<f64> {
    let h = squash(header);
    if h.is_empty() {
        return None;
    }
    let key = squash(field.key);
    let label = squash(field.label);
    if h == key {
        return Some(1.0);
    }
    if h == label {
        return Some(0.98);
    }
    if contains_either(&h, &key) || contains_either(&h, &label) {
        return Some(0.9);
    }
    let src_tokens = tokens(header);
    let by_key = overlap_score(&src_tokens, &tokens(field.key));
    let by_label = overlap_score(&src_tokens, &tokens(field.label));
    match (by_key, by_label) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

// ---------------------------------------------------------------------------
// Proposal and operator overrides
// ---------------------------------------------------------------------------

/// Propose a mapping for every source header. Columns are processed in
/// file order and each claimed field leaves the candidate pool, so the
/// result is one-to-one and deterministic for a given header list.
pub fn propose_mappings(headers: &[String]) -> Vec<ColumnMapping> {
    let mut claimed = vec![false; TARGET_FIELDS.len()];
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let mut best: Option<(usize, f64)> = None;
            for (fi, field) in TARGET_FIELDS.iter().enumerate() {
                if claimed[fi] {
                    continue;
                }
                if let Some(score) = score_match(header, field) {
                    // strict > keeps the earliest field on ties
                    if best.map_or(true, |(_, b)| score > b) {
                        best = Some((fi, score));
                    }
                }
            }
            match best {
                Some((fi, score)) if score >= AUTO_ACCEPT_THRESHOLD => {
                    claimed[fi] = true;
                    ColumnMapping {
                        source: header.clone(),
                        source_index: i,
                        target: Some(&TARGET_FIELDS[fi]),
                        score: Some(score),
                        is_selected: true,
                    }
                }
                _ => ColumnMapping {
                    source: header.clone(),
                    source_index: i,
                    target: None,
                    score: None,
                    is_selected: false,
                },
            }
        })
        .collect()
}

/// Target fields still assignable to the column at `index`: everything
/// not claimed by another *selected* mapping. Unselected mappings do not
/// block reuse of their field.
pub fn available_targets(mappings: &[ColumnMapping], index: usize) -> Vec<&'static TargetField> {
    TARGET_FIELDS
        .iter()
        .filter(|f| {
            !mappings.iter().any(|m| {
                m.source_index != index && m.is_selected && m.target.map(|t| t.key) == Some(f.key)
            })
        })
        .collect()
}

/// Bind a source column to a target field by key. A previous holder of
/// the field is deselected so the one-to-one invariant keeps holding.
pub fn assign(mappings: &mut [ColumnMapping], source: &str, key: &str) -> Result<()> {
    let field = field_by_key(key).ok_or_else(|| CaptaError::UnknownField(key.to_string()))?;
    let index = mappings
        .iter()
        .position(|m| m.source == source.trim())
        .ok_or_else(|| CaptaError::UnknownColumn(source.to_string()))?;
    for m in mappings.iter_mut() {
        if m.is_selected && m.target.map(|t| t.key) == Some(field.key) {
            m.is_selected = false;
        }
    }
    mappings[index].target = Some(field);
    mappings[index].score = None;
    mappings[index].is_selected = true;
    Ok(())
}

/// Deselect the mapping for a source column. The proposed target is kept
/// for display but no longer claims the field.
pub fn unassign(mappings: &mut [ColumnMapping], source: &str) -> Result<()> {
    let index = mappings
        .iter()
        .position(|m| m.source == source.trim())
        .ok_or_else(|| CaptaError::UnknownColumn(source.to_string()))?;
    mappings[index].is_selected = false;
    Ok(())
}

/// Commit gate: every required field must be claimed by exactly one
/// selected mapping.
pub fn validate_mappings(mappings: &[ColumnMapping]) -> Result<()> {
    let missing: Vec<String> = TARGET_FIELDS
        .iter()
        .filter(|f| f.required)
        .filter(|f| {
            !mappings
                .iter()
                .any(|m| m.is_selected && m.target.map(|t| t.key) == Some(f.key))
        })
        .map(|f| f.key.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CaptaError::MappingIncomplete(missing))
    }
}
