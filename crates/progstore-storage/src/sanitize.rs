//! Normalization of human-entered names into safe path segments.

/// Characters that are replaced with `_`.
const FORBIDDEN: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum segment length in bytes.
pub const MAX_SEGMENT_BYTES: usize = 255;

/// Segment used when nothing survives sanitization.
pub const UNNAMED: &str = "unnamed";

/// Turn an arbitrary string into a filesystem-safe path segment.
///
/// Forbidden characters become `_`, leading and trailing spaces and dots
/// are trimmed, the result is cut to 255 bytes on a character boundary,
/// and an empty result becomes `unnamed`. Idempotent.
pub fn sanitize(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();

    let trimmed = trim_segment(&replaced);
    let truncated = trim_segment(truncate_bytes(trimmed, MAX_SEGMENT_BYTES));

    if truncated.is_empty() {
        UNNAMED.to_string()
    } else {
        truncated.to_string()
    }
}

fn trim_segment(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '.')
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sane(input: &str) {
        let out = sanitize(input);
        assert!(!out.is_empty(), "empty for {input:?}");
        assert!(out.len() <= MAX_SEGMENT_BYTES, "too long for {input:?}");
        assert!(
            !out.chars().any(|c| FORBIDDEN.contains(&c)),
            "forbidden char in {out:?}"
        );
        assert_eq!(sanitize(&out), out, "not idempotent for {input:?}");
    }

    #[test]
    fn test_replaces_forbidden_characters() {
        assert_eq!(sanitize(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_trims_spaces_and_dots() {
        assert_eq!(sanitize("  ..Line A.. "), "Line A");
        assert_eq!(sanitize("v1.0"), "v1.0");
    }

    #[test]
    fn test_empty_becomes_unnamed() {
        assert_eq!(sanitize(""), UNNAMED);
        assert_eq!(sanitize(" . . "), UNNAMED);
        assert_eq!(sanitize(".."), UNNAMED);
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize(&long);
        assert!(out.len() <= MAX_SEGMENT_BYTES);
        assert_eq!(out.len() % 2, 0);
    }

    #[test]
    fn test_truncation_does_not_leave_trailing_dots() {
        let mut input = "a".repeat(254);
        input.push_str(". tail");
        let out = sanitize(&input);
        assert_eq!(out, "a".repeat(254));
    }

    #[test]
    fn test_properties_over_assorted_inputs() {
        let inputs = [
            "",
            " ",
            "...",
            "QC25",
            "Line/A",
            "../../etc/passwd",
            "名前 テスト",
            "*?*?*?",
            " .x. ",
            "trailing dot.",
            &"x".repeat(300),
            &format!("{}.", "y".repeat(255)),
            &format!(" {}", "é".repeat(130)),
        ];
        for input in inputs {
            assert_sane(input);
        }
    }
}
