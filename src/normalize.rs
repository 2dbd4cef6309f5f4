//! Body normalization: transport decoding, Markdown conversion, HTML parsing.

use pulldown_cmark::{Options, Parser, html};
use quoted_printable::ParseMode;
use scraper::Html;

use crate::error::RenderError;

/// Decode and parse a raw body into a traversable document.
///
/// Quoted-printable decoding is attempted first and silently skipped when the
/// input is not valid quoted-printable; the Markdown pass leaves embedded raw
/// HTML untouched, so already-HTML bodies survive unchanged.
pub(crate) fn normalize(raw_body: &str) -> Result<Html, RenderError> {
    let decoded =
        decode_quoted_printable(raw_body).unwrap_or_else(|| raw_body.to_string());

    let html_body = markdown_to_html(&decoded);

    let doc = Html::parse_document(&html_body);
    if !doc.tree.root().children().any(|node| node.value().is_element()) {
        return Err(RenderError::Parse("document has no root element".into()));
    }
    Ok(doc)
}

/// Strict quoted-printable decode. Returns `None` on any violation so plain
/// text containing stray `=` signs passes through untouched.
pub(crate) fn decode_quoted_printable(input: &str) -> Option<String> {
    let bytes = quoted_printable::decode(input.as_bytes(), ParseMode::Strict).ok()?;
    String::from_utf8(bytes).ok()
}

/// Markdown to HTML with raw-HTML passthrough (CommonMark default), so a body
/// that is already HTML is preserved rather than escaped.
pub(crate) fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_quoted_printable() {
        assert_eq!(
            decode_quoted_printable("Hello=2C world=21").as_deref(),
            Some("Hello, world!")
        );
        assert_eq!(
            decode_quoted_printable(
                "This is a long line that gets wrapped=\r\n and continues here."
            )
            .as_deref(),
            Some("This is a long line that gets wrapped and continues here.")
        );
        assert_eq!(
            decode_quoted_printable("Just a plain string.").as_deref(),
            Some("Just a plain string.")
        );
    }

    #[test]
    fn test_decode_invalid_falls_back() {
        // "=xy" is not a hex octet; normalize() keeps the raw input.
        assert_eq!(decode_quoted_printable("broken =xy escape"), None);
        let doc = normalize("broken =xy escape").unwrap();
        let text: String = doc.root_element().text().collect();
        assert!(text.contains("broken =xy escape"));
    }

    #[test]
    fn test_markdown_to_html() {
        assert_eq!(markdown_to_html("# Hello").trim(), "<h1>Hello</h1>");
        assert_eq!(
            markdown_to_html("**bold text**").trim(),
            "<p><strong>bold text</strong></p>"
        );
        assert_eq!(
            markdown_to_html("[link](http://example.com)").trim(),
            r#"<p><a href="http://example.com">link</a></p>"#
        );
    }

    #[test]
    fn test_markdown_passes_raw_html_through() {
        let out = markdown_to_html("<p>Hello, <strong>world</strong>!</p>");
        assert!(out.contains("<strong>world</strong>"));
        assert!(!out.contains("&lt;p&gt;"));
    }
}
