//! Text helpers shared by the serializer and plugins.

/// Anchor-safe form of a heading or footnote label: lowercase alphanumeric
/// words joined by single dashes. Non-ASCII letters are kept.
#[must_use]
pub fn slugify(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match entity(c) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

fn entity(c: char) -> Option<&'static str> {
    Some(match c {
        '&' => "&amp;",
        '<' => "&lt;",
        '>' => "&gt;",
        '"' => "&quot;",
        '\'' => "&#x27;",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_headings() {
        assert_eq!(slugify("Release Notes"), "release-notes");
        assert_eq!(slugify("Why Lovpen?"), "why-lovpen");
        assert_eq!(slugify("  -- padded __ "), "padded");
        assert_eq!(slugify("step_1 - intro"), "step-1-intro");
        assert_eq!(slugify("排版 技巧"), "排版-技巧");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<img alt="it's">&"#),
            "&lt;img alt=&quot;it&#x27;s&quot;&gt;&amp;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
