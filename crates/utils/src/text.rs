//! Small helpers for cleaning up user input and model output.

/// Trim a value, returning `None` when nothing is left.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Trim every entry, dropping blanks and later duplicates while keeping order.
pub fn dedupe_trimmed<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

/// Truncate to at most `max` characters.
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank(Some("  EURUSD ")), Some("EURUSD"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let out = dedupe_trimmed(["EURUSD", " GBPUSD", "", "EURUSD", "XAUUSD "]);
        assert_eq!(out, vec!["EURUSD", "GBPUSD", "XAUUSD"]);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
