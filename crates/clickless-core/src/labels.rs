//! Deterministic label assignment for snapshot indices.
//!
//! Every element in a snapshot is addressed by a short alphabetic label
//! derived from its index. The mapping is a pure function of the index and
//! is ordered by typing ergonomics: single left-hand home-row letters come
//! first, then curated left-hand pairs, then right-hand pairs, then mixed
//! combinations. Labels are never stored; they are recomputed on demand.
//!
//! # Label blocks (in order)
//!
//! | Indices | Labels |
//! |---------|--------|
//! | 0..26 | single letters, ergonomic priority order |
//! | 26..136 | curated left-hand pairs |
//! | 136..257 | right-hand x right-hand cross product |
//! | 257..422 | left x right cross product |
//! | 422..702 | remaining two-letter combinations |
//!
//! With a 26-letter alphabet and labels capped at two characters there are
//! 702 distinct labels, well above the per-snapshot element cap. Indices
//! past the distinct range wrap back into the two-letter region so the
//! function stays total.

use std::sync::OnceLock;

/// Single-letter labels in ergonomic priority order: left-hand home row,
/// then left top and bottom rows, then the right hand.
const SINGLE: [char; 26] = [
    'A', 'S', 'D', 'F', 'G', 'Q', 'W', 'E', 'R', 'T', 'Z', 'C', 'X', 'V', 'B', 'H', 'J', 'K',
    'L', 'Y', 'U', 'I', 'O', 'P', 'N', 'M',
];

/// Left-hand letters in priority order, used for the mixed cross product.
const LEFT: [char; 15] = [
    'A', 'S', 'D', 'F', 'G', 'Q', 'W', 'E', 'R', 'T', 'Z', 'C', 'X', 'V', 'B',
];

/// Right-hand letter set for the right-hand cross product block.
const RIGHT: [char; 11] = ['H', 'J', 'K', 'L', 'Y', 'U', 'I', 'O', 'P', 'N', 'M'];

/// Curated left-hand two-letter codes, ordered by ergonomic ease.
///
/// The list is fixed, not generated: home-row pairs, then home+top,
/// home+bottom, top-row pairs, and bottom-row pairs.
const CURATED_PAIRS: [&str; 110] = [
    // home-row pairs
    "AS", "AD", "AF", "AG", "SA", "SD", "SF", "SG", "DA", "DS", "DF", "DG", "FA", "FS", "FD",
    "FG", "GA", "GS", "GD", "GF",
    // home + top row
    "AQ", "AW", "AE", "AR", "AT", "SQ", "SW", "SE", "SR", "ST", "DQ", "DW", "DE", "DR", "DT",
    "FQ", "FW", "FE", "FR", "FT", "GQ", "GW", "GE", "GR", "GT",
    // home + bottom row
    "AZ", "AX", "AC", "AV", "AB", "SZ", "SX", "SC", "SV", "SB", "DZ", "DX", "DC", "DV", "DB",
    "FZ", "FX", "FC", "FV", "FB", "GZ", "GX", "GC", "GV", "GB",
    // top-row pairs
    "QW", "QE", "QR", "QT", "WQ", "WE", "WR", "WT", "EQ", "EW", "ER", "ET", "RQ", "RW", "RE",
    "RT", "TQ", "TW", "TE", "TR",
    // bottom-row pairs
    "ZX", "ZC", "ZV", "ZB", "XZ", "XC", "XV", "XB", "CZ", "CX", "CV", "CB", "VZ", "VX", "VC",
    "VB", "BZ", "BX", "BC", "BV",
];

/// Number of distinct labels the two-character alphabet can express.
pub const DISTINCT_LABELS: usize = 26 + 26 * 26;

/// Full label sequence, built once and indexed thereafter.
fn sequence() -> &'static [String] {
    static SEQUENCE: OnceLock<Vec<String>> = OnceLock::new();
    SEQUENCE.get_or_init(build_sequence)
}

fn build_sequence() -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(DISTINCT_LABELS);

    for ch in SINGLE {
        labels.push(ch.to_string());
    }
    for pair in CURATED_PAIRS {
        labels.push(pair.to_string());
    }
    for a in RIGHT {
        for b in RIGHT {
            labels.push(format!("{a}{b}"));
        }
    }
    for a in LEFT {
        for b in RIGHT {
            labels.push(format!("{a}{b}"));
        }
    }

    // Exhaustive fallback: every remaining two-letter combination over the
    // priority alphabet, skipping codes already emitted by earlier blocks.
    let emitted: std::collections::HashSet<&str> =
        labels.iter().map(String::as_str).collect();
    let mut remainder = Vec::new();
    for a in SINGLE {
        for b in SINGLE {
            let code = format!("{a}{b}");
            if !emitted.contains(code.as_str()) {
                remainder.push(code);
            }
        }
    }
    labels.extend(remainder);

    debug_assert_eq!(labels.len(), DISTINCT_LABELS);
    labels
}

/// Map a snapshot index to its label.
///
/// Pure and total: identical indices always yield identical labels, and any
/// index is accepted. Labels are one character for indices below 26 and two
/// characters otherwise. Indices beyond [`DISTINCT_LABELS`] wrap into the
/// two-letter region (snapshots are capped far below that point).
#[must_use]
pub fn label(index: usize) -> String {
    let seq = sequence();
    if index < seq.len() {
        return seq[index].clone();
    }
    let two_letter = seq.len() - SINGLE.len();
    seq[SINGLE.len() + (index - SINGLE.len()) % two_letter].clone()
}
