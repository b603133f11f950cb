// Input validation for a batch run. A raw list of strings comes in; an
// ordered list of analyzable items and a list of human-readable warnings
// (one per rejected or modified item) come out.

/// Minimum length for a non-URL text item, in characters.
pub const MIN_TEXT_CHARS: usize = 10;

/// Maximum length for a non-URL text item, in characters. Longer items are
/// truncated, not rejected.
pub const MAX_TEXT_CHARS: usize = 50_000;

/// The outcome of validating a raw input list.
///
/// Invariant: `valid` preserves the relative order of the input, and every
/// item in it is either URL-shaped or has a length in
/// [`MIN_TEXT_CHARS`, `MAX_TEXT_CHARS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub valid: Vec<String>,
    pub warnings: Vec<String>,
}

/// Returns true for items that should be treated as web page URLs.
pub fn is_url(item: &str) -> bool {
    item.starts_with("http://") || item.starts_with("https://")
}

/// Validates and cleans a raw input list.
///
/// Rules, applied per item in input order:
/// - empty or whitespace-only items are skipped;
/// - URL-shaped items are accepted unmodified regardless of length;
/// - texts shorter than [`MIN_TEXT_CHARS`] are rejected;
/// - texts longer than [`MAX_TEXT_CHARS`] are truncated with a warning.
///
/// Warning messages use 1-based item numbers over the *original* list, so
/// a warning for item 3 always refers to the third submitted string.
pub fn validate_inputs(inputs: &[String]) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for (i, text) in inputs.iter().enumerate() {
        let n = i + 1;

        if text.trim().is_empty() {
            outcome.warnings.push(format!("Item {}: Empty input skipped", n));
            continue;
        }

        if is_url(text) {
            outcome.valid.push(text.clone());
            continue;
        }

        let chars = text.chars().count();
        if chars < MIN_TEXT_CHARS {
            outcome.warnings.push(format!(
                "Item {}: Text too short (min {} characters)",
                n, MIN_TEXT_CHARS
            ));
        } else if chars > MAX_TEXT_CHARS {
            outcome.warnings.push(format!(
                "Item {}: Text truncated (max {} characters)",
                n, MAX_TEXT_CHARS
            ));
            outcome
                .valid
                .push(text.chars().take(MAX_TEXT_CHARS).collect());
        } else {
            outcome.valid.push(text.clone());
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_input_skipped() {
        let outcome = validate_inputs(&items(&["", "   ", "\t\n"]));

        assert!(outcome.valid.is_empty());
        assert_eq!(
            outcome.warnings,
            vec![
                "Item 1: Empty input skipped",
                "Item 2: Empty input skipped",
                "Item 3: Empty input skipped",
            ]
        );
    }

    #[test]
    fn test_length_boundaries() {
        // 9 chars rejected, 10 chars accepted unmodified.
        let nine = "a".repeat(9);
        let ten = "a".repeat(10);
        let outcome = validate_inputs(&items(&[&nine, &ten]));

        assert_eq!(outcome.valid, vec![ten]);
        assert_eq!(
            outcome.warnings,
            vec!["Item 1: Text too short (min 10 characters)"]
        );
    }

    #[test]
    fn test_over_limit_truncated_with_warning() {
        let long = "x".repeat(MAX_TEXT_CHARS + 1);
        let outcome = validate_inputs(&items(&[&long]));

        assert_eq!(outcome.valid.len(), 1);
        assert_eq!(outcome.valid[0].chars().count(), MAX_TEXT_CHARS);
        assert_eq!(
            outcome.warnings,
            vec!["Item 1: Text truncated (max 50000 characters)"]
        );
    }

    #[test]
    fn test_urls_bypass_length_checks() {
        // Even a 5-character "URL" prefix test: shorter than MIN_TEXT_CHARS
        // but URL-shaped strings are accepted as-is.
        let outcome = validate_inputs(&items(&["http://a", "https://example.com/review"]));

        assert_eq!(outcome.valid.len(), 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_every_item_accounted_for_in_order() {
        let inputs = items(&[
            "",
            "short",
            "https://example.com",
            "a perfectly reasonable review text",
        ]);
        let outcome = validate_inputs(&inputs);

        // accepted + warned == input length
        assert_eq!(
            outcome.valid.len() + outcome.warnings.len(),
            inputs.len()
        );
        // relative order of accepted items matches input order
        assert_eq!(
            outcome.valid,
            vec![
                "https://example.com".to_string(),
                "a perfectly reasonable review text".to_string(),
            ]
        );
        // warnings reference the original 1-based positions
        assert!(outcome.warnings[0].starts_with("Item 1:"));
        assert!(outcome.warnings[1].starts_with("Item 2:"));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example.com"));
        assert!(is_url("https://example.com"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("example.com"));
    }
}
