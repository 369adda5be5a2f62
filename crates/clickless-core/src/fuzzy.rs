//! Fuzzy matching for element display names.
//!
//! Labels drive selection; the fuzzy matcher only ranks candidates when the
//! overlay filters by element text. Matching is a case-insensitive in-order
//! subsequence check; scoring rewards consecutive runs, word-boundary hits,
//! and exact case, and penalizes long targets so short matches rank first.

/// Sentinel score for a query that is not a subsequence of the target.
pub const NO_MATCH_SCORE: i32 = -1000;

/// Bonus for a full case-insensitive match.
const EQUALITY_BONUS: i32 = 100;

/// Bonus for a match at the start of the target or right after a boundary.
const BOUNDARY_BONUS: i32 = 5;

/// Per-streak-length multiplier for consecutive matches.
const STREAK_BONUS: i32 = 3;

/// Characters that start a new word within a target.
fn is_boundary(c: char) -> bool {
    matches!(c, ' ' | '_' | '-' | '.' | '/')
}

fn chars_eq_ci(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// True iff every character of `query`, in order, appears in `target`.
///
/// The empty query matches everything; a non-empty query never matches an
/// empty target. Comparison is case-insensitive.
#[must_use]
pub fn is_subsequence(query: &str, target: &str) -> bool {
    let mut targets = target.chars();
    query
        .chars()
        .all(|qc| targets.any(|tc| chars_eq_ci(qc, tc)))
}

/// Rank `target` against `query`.
///
/// Returns [`NO_MATCH_SCORE`] when `query` is not a subsequence of `target`.
/// Otherwise accumulates, over a greedy in-order match:
/// - +1 per matched character, +1 extra when the case matches exactly;
/// - a consecutive-run bonus that grows with the run length;
/// - a boundary bonus when a match lands at the start of the target or
///   immediately after a space, underscore, hyphen, period, or slash;
/// - +100 when the full strings are case-insensitively equal;
/// - minus `len(target) / 4`, so shorter equally-good matches rank higher.
#[must_use]
pub fn score(query: &str, target: &str) -> i32 {
    let q: Vec<char> = query.chars().collect();
    let t: Vec<char> = target.chars().collect();

    let mut total = 0i32;
    let mut qi = 0usize;
    let mut streak = 0i32;
    let mut prev_match: Option<usize> = None;

    for (ti, &tc) in t.iter().enumerate() {
        if qi >= q.len() {
            break;
        }
        if !chars_eq_ci(q[qi], tc) {
            continue;
        }
        total += 1;
        if q[qi] == tc {
            total += 1;
        }
        if ti == 0 || is_boundary(t[ti - 1]) {
            total += BOUNDARY_BONUS;
        }
        if prev_match == Some(ti.wrapping_sub(1)) {
            streak += 1;
            total += STREAK_BONUS * streak;
        } else {
            streak = 1;
        }
        prev_match = Some(ti);
        qi += 1;
    }

    if qi < q.len() {
        return NO_MATCH_SCORE;
    }
    if !query.is_empty() && query.to_lowercase() == target.to_lowercase() {
        total += EQUALITY_BONUS;
    }
    total - (t.len() / 4) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_matches_everything() {
        assert!(is_subsequence("", ""));
        assert!(is_subsequence("", "anything"));
    }

    #[test]
    fn nonempty_query_never_matches_empty_target() {
        assert!(!is_subsequence("a", ""));
        assert!(!is_subsequence("save", ""));
    }

    #[test]
    fn subsequence_respects_order() {
        assert!(is_subsequence("sv", "save"));
        assert!(!is_subsequence("vs", "save"));
    }

    #[test]
    fn subsequence_is_case_insensitive() {
        assert!(is_subsequence("SAVE", "save"));
        assert!(is_subsequence("save", "SaVe"));
    }

    #[test]
    fn non_subsequence_scores_sentinel() {
        assert_eq!(score("xyz", "save"), NO_MATCH_SCORE);
        assert_eq!(score("a", ""), NO_MATCH_SCORE);
    }

    #[test]
    fn exact_match_beats_prefix_beats_scattered() {
        let exact = score("save", "save");
        let prefix = score("save", "save as");
        let scattered = score("save", "sXXaXXvXXe");
        assert!(exact > prefix, "{exact} vs {prefix}");
        assert!(prefix > scattered, "{prefix} vs {scattered}");
    }

    #[test]
    fn boundary_matches_outrank_interior_matches() {
        // "o" at the start of "open" hits the boundary bonus; the "o" inside
        // "stop" does not.
        assert!(score("o", "open") > score("o", "stop"));
    }

    #[test]
    fn shorter_target_wins_among_equal_matches() {
        assert!(score("cut", "cut") > score("cut", "cut selection here"));
    }

    #[test]
    fn exact_case_scores_higher() {
        assert!(score("Save", "Save") > score("save", "Save"));
    }

    #[test]
    fn empty_query_scores_only_length_penalty() {
        assert_eq!(score("", "abcdefgh"), -2);
        assert_eq!(score("", ""), 0);
    }
}
