//! Plain-text sanitizing for user queries
//!
//! Follows the rules content management systems apply to single-line text
//! fields. Markup is removed and a `<` that never closes is HTML-escaped
//! together with the text after it. Whitespace runs collapse to one space and
//! percent-encoded octets are dropped.

use regex_lite::Regex;
use std::sync::OnceLock;

fn script_blocks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*?>.*?</script\s*>").unwrap())
}

fn style_blocks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style[^>]*?>.*?</style\s*>").unwrap())
}

fn tags() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn entity() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);").unwrap())
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n\t ]+").unwrap())
}

fn percent_octet() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%[a-fA-F0-9]{2}").unwrap())
}

fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" +").unwrap())
}

/// Reduce raw user input to a single line of plain text.
pub fn sanitize_text(raw: &str) -> String {
    let mut text = if raw.contains('<') {
        let escaped = escape_unclosed_tags(raw);
        let without_blocks = script_blocks().replace_all(&escaped, "");
        let without_blocks = style_blocks().replace_all(&without_blocks, "");
        tags().replace_all(&without_blocks, "").into_owned()
    } else {
        raw.to_string()
    };

    text = whitespace_runs().replace_all(&text, " ").into_owned();

    // Removing one octet can expose another ("%%4141"), so repeat until stable
    let mut found_octets = false;
    while percent_octet().is_match(&text) {
        text = percent_octet().replace_all(&text, "").into_owned();
        found_octets = true;
    }
    if found_octets {
        text = space_runs().replace_all(text.trim(), " ").into_owned();
    }

    text.trim().to_string()
}

/// Escape every `<` run that reaches the next `<` or the end of input
/// without a `>`. Closed tags are left for tag stripping.
fn escape_unclosed_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let run = &rest[open..];

        match run[1..].find(|c| c == '<' || c == '>').map(|i| i + 1) {
            Some(end) if run.as_bytes()[end] == b'>' => {
                out.push_str(&run[..=end]);
                rest = &run[end + 1..];
            }
            Some(end) => {
                out.push_str(&escape_html(&run[..end]));
                rest = &run[end..];
            }
            None => {
                out.push_str(&escape_html(run));
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// HTML-escape `& < > " '`, leaving existing entities intact.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' if entity().is_match(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_collapses_whitespace() {
        assert_eq!(sanitize_text("  What   is\tRAG?\r\n "), "What is RAG?");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(sanitize_text("What is RAG?"), "What is RAG?");
    }

    #[test]
    fn test_strips_tags() {
        assert_eq!(sanitize_text("<b>bold</b> move"), "bold move");
        assert_eq!(sanitize_text("<a href=\"x\">link</a>"), "link");
    }

    #[test]
    fn test_drops_script_and_style_content() {
        assert_eq!(
            sanitize_text("hi <script>alert('x')</script>there"),
            "hi there"
        );
        assert_eq!(sanitize_text("<STYLE>p { color: red }</STYLE>ok"), "ok");
    }

    #[test]
    fn test_escapes_lone_angle_bracket() {
        assert_eq!(sanitize_text("1 < 2"), "1 &lt; 2");
        assert_eq!(sanitize_text("a < b <i>c</i>"), "a &lt; b c");
    }

    #[test]
    fn test_escapes_whole_unclosed_run() {
        assert_eq!(sanitize_text("a < b & c's"), "a &lt; b &amp; c&#039;s");
        assert_eq!(sanitize_text("x < \"y\" <b>z</b>"), "x &lt; &quot;y&quot; z");
    }

    #[test]
    fn test_text_outside_unclosed_run_untouched() {
        assert_eq!(sanitize_text("Q&A: <b>why</b>?"), "Q&A: why?");
        assert_eq!(sanitize_text("it's <i>fine</i> & done"), "it's fine & done");
    }

    #[test]
    fn test_existing_entities_not_double_escaped() {
        assert_eq!(sanitize_text("1 < 2 &amp; 3"), "1 &lt; 2 &amp; 3");
        assert_eq!(sanitize_text("a < &#8212; b"), "a &lt; &#8212; b");
    }

    #[test]
    fn test_removes_percent_octets() {
        assert_eq!(sanitize_text("50%20off"), "50off");
        assert_eq!(sanitize_text("a %41 b"), "a b");
        assert_eq!(sanitize_text("%%4141"), "");
    }

    #[test]
    fn test_keeps_non_octet_percent() {
        assert_eq!(sanitize_text("100% sure"), "100% sure");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_text(""), "");
        assert_eq!(sanitize_text(" \n\t "), "");
    }
}
