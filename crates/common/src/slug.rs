//! URL slug derivation.
//!
//! Slugs are derived from post titles and must stay unique per post. The
//! caller resolves collisions by asking for successive candidates
//! (`my-title`, `my-title-2`, `my-title-3`, ...) until an insert succeeds.

/// Maximum length of a stored slug column.
pub const SLUG_MAX_LEN: usize = 220;

/// Maximum length of the derived base before any suffix is applied.
const SLUG_BASE_MAX: usize = 200;

/// Derive a slug base from free text.
///
/// Lowercases, keeps ASCII alphanumerics and underscores, collapses
/// whitespace and hyphen runs into single hyphens, and trims. Falls back
/// to `"post"` when nothing survives, so the result is never empty.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_sep = true;
        }
        // Everything else is dropped without acting as a separator,
        // so "don't" becomes "dont" rather than "don-t".
    }

    let out = truncate_ascii(&out, SLUG_BASE_MAX);
    if out.is_empty() {
        "post".to_string()
    } else {
        out.to_string()
    }
}

/// Build the `attempt`-th slug candidate for a base.
///
/// Attempt 1 is the base itself; attempt `n` appends `-n`, shortening the
/// base so the candidate never exceeds [`SLUG_BASE_MAX`].
#[must_use]
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return base.to_string();
    }
    let suffix = attempt.to_string();
    let budget = SLUG_BASE_MAX.saturating_sub(suffix.len() + 1);
    format!("{}-{}", truncate_ascii(base, budget), suffix)
}

// Slugified text is pure ASCII, but stay boundary-safe anyway.
fn truncate_ascii(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Zelda Rumors"), "zelda-rumors");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
    }

    #[test]
    fn test_slugify_keeps_underscores_and_digits() {
        assert_eq!(slugify("patch_notes 1.2"), "patch_notes-12");
    }

    #[test]
    fn test_slugify_drops_punctuation_without_splitting() {
        assert_eq!(slugify("don't panic"), "dont-panic");
    }

    #[test]
    fn test_slugify_collapses_hyphen_runs() {
        assert_eq!(slugify("a -- b---c"), "a-b-c");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "post");
        assert_eq!(slugify("???"), "post");
        assert_eq!(slugify("日本語"), "post");
    }

    #[test]
    fn test_slugify_truncates_long_titles() {
        let long = "a".repeat(500);
        assert_eq!(slugify(&long).len(), 200);
    }

    #[test]
    fn test_candidate_sequence() {
        assert_eq!(slug_candidate("zelda-rumors", 1), "zelda-rumors");
        assert_eq!(slug_candidate("zelda-rumors", 2), "zelda-rumors-2");
        assert_eq!(slug_candidate("zelda-rumors", 11), "zelda-rumors-11");
    }

    #[test]
    fn test_candidate_stays_within_bounds() {
        let base = slugify(&"b".repeat(500));
        for attempt in [2_u32, 9, 10, 99, 100, 12_345] {
            let candidate = slug_candidate(&base, attempt);
            assert!(candidate.len() <= 200);
            assert!(candidate.len() <= SLUG_MAX_LEN);
            assert!(candidate.ends_with(&format!("-{attempt}")));
        }
    }
}
