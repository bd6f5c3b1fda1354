//! String helpers shared by progress lines, prompts and error messages.

/// Shorten `s` to at most `max_len` bytes, ending with `...` when cut.
///
/// The cut always lands on a char boundary, so agent output in any script
/// can be shortened safely.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        assert_eq!(truncate("Rayleigh scattering", 40), "Rayleigh scattering");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn test_long_text_gets_ellipsis() {
        assert_eq!(truncate("connection refused by host", 13), "connection...");
    }

    #[test]
    fn test_cut_respects_char_boundaries() {
        // "é" is two bytes; target 4 would split it
        assert_eq!(truncate("caféé au lait", 7), "caf...");
        assert_eq!(truncate("über alles", 6), "üb...");
    }

    #[test]
    fn test_tiny_limit() {
        assert_eq!(truncate("abcdef", 2), "...");
    }
}
