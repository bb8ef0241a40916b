//! Input sanitisation for player names and chat text

use rand::Rng;

/// Maximum accepted player-name length
pub const MAX_NAME_LEN: usize = 20;

/// Maximum accepted chat-message length in characters
pub const MAX_CHAT_LEN: usize = 500;

/// Sanitise a requested player name.
///
/// Names must be alphanumeric, start with a letter, and fit in
/// [`MAX_NAME_LEN`]. Anything else falls back to a random callsign.
pub fn sanitize_name<R: Rng>(raw: &str, rng: &mut R) -> String {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_NAME_LEN
        && trimmed.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && trimmed.chars().all(|c| c.is_ascii_alphanumeric());

    if valid {
        trimmed.to_string()
    } else {
        format!("Pilot{:04}", rng.gen_range(0..10_000))
    }
}

/// Escape HTML-significant characters and cap length.
///
/// Chat text is relayed to browser clients verbatim, so the server strips
/// injection vectors before the text ever reaches the hub.
pub fn sanitize_chat(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_CHAT_LEN));
    for c in raw.chars().take(MAX_CHAT_LEN) {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_valid_name_kept() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(sanitize_name("Kirk7", &mut rng), "Kirk7");
        assert_eq!(sanitize_name("  Spock  ", &mut rng), "Spock");
    }

    #[test]
    fn test_invalid_name_replaced() {
        let mut rng = SmallRng::seed_from_u64(1);
        for bad in ["", "7of9", "a b", "<script>", &"x".repeat(21)] {
            let name = sanitize_name(bad, &mut rng);
            assert!(name.starts_with("Pilot"), "{bad:?} gave {name:?}");
        }
    }

    #[test]
    fn test_chat_escapes_html() {
        assert_eq!(
            sanitize_chat("<b>hi</b> & 'bye'"),
            "&lt;b&gt;hi&lt;/b&gt; &amp; &#39;bye&#39;"
        );
    }

    #[test]
    fn test_chat_caps_length() {
        let long = "a".repeat(2 * MAX_CHAT_LEN);
        assert_eq!(sanitize_chat(&long).len(), MAX_CHAT_LEN);
    }
}
