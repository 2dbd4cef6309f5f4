//! Document tree transformation.
//!
//! Walks the parsed document once and emits a flat sequence of [`Segment`]s:
//! literal text runs, quote references and image-row markers. Quotes and
//! image spacing are tagged variants, not marker strings in the text, so
//! the finalizer's newline collapsing cannot corrupt them.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{Html, Node};

use crate::debug::proto_debug;
use crate::finalize::display_date;
use crate::imgproto;
use crate::style::StyleSpec;
use crate::term::caps::TermCaps;
use crate::term::cell::CellProbe;

/// One piece of transformed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Literal text, subject to the finalizer's newline collapsing.
    Text(String),
    /// Reference into the quote record list, resolved in the finalizer.
    Quote(usize),
    /// Vertical space covered by an inline image, expanded to newlines last.
    ImageRows(usize),
}

/// A quoted reply captured from a `<blockquote>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct QuoteRecord {
    pub from: String,
    pub date: String,
    pub content: String,
}

/// "On DATE, SENDER wrote:". DATE is greedy so dates containing commas
/// ("Jan 2, 2006 at 3:04 PM") split at the last field, not the first.
static RE_ON_WROTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"On\s+(.+),\s+(.+?)\s+wrote:").unwrap());

/// Output range and plain text of the previously processed sibling element.
/// Needed to un-emit an "On DATE, X wrote:" line that belongs to the
/// blockquote following it.
struct PrevElement {
    start: usize,
    end: usize,
    text: String,
}

pub(crate) struct Transformer<'a> {
    caps: &'a TermCaps,
    styles: &'a StyleSpec,
    inline: Option<&'a HashMap<String, String>>,
    disable_images: bool,
    probe: &'a dyn CellProbe,
    segments: Vec<Segment>,
    quotes: Vec<QuoteRecord>,
}

/// Rewrite the document into segments plus the quote records they reference.
pub(crate) fn transform(
    doc: &Html,
    caps: &TermCaps,
    styles: &StyleSpec,
    inline: Option<&HashMap<String, String>>,
    disable_images: bool,
    probe: &dyn CellProbe,
) -> (Vec<Segment>, Vec<QuoteRecord>) {
    let mut transformer = Transformer {
        caps,
        styles,
        inline,
        disable_images,
        probe,
        segments: Vec::new(),
        quotes: Vec::new(),
    };
    transformer.walk_children(doc.tree.root());
    (transformer.segments, transformer.quotes)
}

impl Transformer<'_> {
    fn walk_children(&mut self, node: NodeRef<'_, Node>) {
        let mut prev_elem: Option<PrevElement> = None;
        for child in node.children() {
            match child.value() {
                Node::Text(text) => self.push_text(&text.text),
                Node::Element(el) if el.name() == "blockquote" => {
                    self.blockquote(child, &el, prev_elem.take());
                }
                Node::Element(el) => {
                    let start = self.segments.len();
                    self.element(child, &el);
                    prev_elem = Some(PrevElement {
                        start,
                        end: self.segments.len(),
                        text: plain_text(child),
                    });
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, node: NodeRef<'_, Node>, el: &Element) {
        match el.name() {
            // Never rendered, never inspected.
            "style" | "script" => {}
            "h1" => {
                let styled = self.styles.h1.apply(plain_text(node)).to_string();
                self.push_text(&styled);
                self.push_text("\n\n");
            }
            "h2" => {
                let styled = self.styles.h2.apply(plain_text(node)).to_string();
                self.push_text(&styled);
                self.push_text("\n\n");
            }
            "p" | "div" => {
                self.walk_children(node);
                self.push_text("\n\n");
            }
            "br" => self.push_text("\n"),
            "a" => self.anchor(node, el),
            "img" => self.image(el),
            _ => self.walk_children(node),
        }
    }

    fn anchor(&mut self, node: NodeRef<'_, Node>, el: &Element) {
        let Some(href) = el.attr("href") else {
            self.walk_children(node);
            return;
        };
        let text = plain_text(node);
        let link = hyperlink(href, &text, self.caps.hyperlinks);
        self.push_text(&link);
    }

    fn blockquote(&mut self, node: NodeRef<'_, Node>, el: &Element, prev: Option<PrevElement>) {
        let content = quote_text(node);

        let mut from = String::new();
        let mut date = String::new();
        let matched_prev = prev
            .as_ref()
            .and_then(|p| RE_ON_WROTE.captures(p.text.trim()).map(|c| (c, p)));
        if let Some((caps, p)) = matched_prev {
            date = display_date(caps.get(1).map_or("", |m| m.as_str()));
            from = caps.get(2).map_or("", |m| m.as_str()).to_string();
            // The attribution line becomes the quote box header; drop the
            // element that carried it so it isn't shown twice.
            let (start, end) = (p.start, p.end);
            self.segments.drain(start..end);
        } else if let Some(caps) = el.attr("cite").and_then(|c| RE_ON_WROTE.captures(c)) {
            date = display_date(caps.get(1).map_or("", |m| m.as_str()));
            from = caps.get(2).map_or("", |m| m.as_str()).to_string();
        }

        let index = self.quotes.len();
        self.quotes.push(QuoteRecord {
            from,
            date,
            content,
        });
        self.push_text("\n");
        self.segments.push(Segment::Quote(index));
        self.push_text("\n");
    }

    fn image(&mut self, el: &Element) {
        let Some(src) = el.attr("src") else {
            return;
        };
        let alt = match el.attr("alt") {
            Some(alt) if !alt.is_empty() => alt,
            _ => "Does not contain alt text",
        };

        if !self.disable_images && self.caps.supports_images() {
            let payload = imgproto::resolve_payload(src, self.inline);
            if !payload.is_empty() {
                if let Some((escape, rows)) = imgproto::render_inline(&payload, self.caps, self.probe)
                {
                    proto_debug!(
                        "rendered inline image src={src} len={} rows={rows}",
                        payload.len()
                    );
                    self.push_text(&format!("\n{escape}\n"));
                    self.segments.push(Segment::ImageRows(rows));
                    self.push_text("\n\n");
                    return;
                }
                proto_debug!(
                    "payload present but renderer returned empty src={src} len={}",
                    payload.len()
                );
            } else {
                proto_debug!("no payload for src={src}");
            }
        } else {
            proto_debug!("image protocol not supported for src={src} caps={:?}", self.caps);
        }

        if self.caps.hyperlinks {
            let link = hyperlink(
                src,
                &format!("\n [Click here to view image: {alt}] \n"),
                true,
            );
            self.push_text(&link);
        } else {
            self.push_text(&format!("\n [Image: {alt}, {src}] \n"));
        }
    }

    fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.segments.push(Segment::Text(text.to_string()));
        }
    }
}

/// Format a link as an OSC 8 hyperlink, or fall back to `text <url>`
/// (collapsed to just `<url>` when the text is the url).
pub(crate) fn hyperlink(url: &str, text: &str, supported: bool) -> String {
    let text = if text.is_empty() { url } else { text };
    if supported {
        format!("\x1b]8;;{url}\x07{text}\x1b]8;;\x07")
    } else if text == url {
        format!("<{url}>")
    } else {
        format!("{text} <{url}>")
    }
}

/// Concatenated descendant text, skipping `<style>`/`<script>` subtrees.
fn plain_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    collect_plain(node, &mut out);
    out
}

fn collect_plain(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(el) if matches!(el.name(), "style" | "script") => {}
            Node::Element(_) => collect_plain(child, out),
            _ => {}
        }
    }
}

/// Blockquote content with line structure preserved: `<br>` becomes a
/// newline and block elements keep their paragraph gap.
fn quote_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    collect_quote(node, &mut out);
    out.trim().to_string()
}

fn collect_quote(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(el) => match el.name() {
                "style" | "script" => {}
                "br" => out.push('\n'),
                "p" | "div" | "h1" | "h2" => {
                    collect_quote(child, out);
                    out.push_str("\n\n");
                }
                _ => collect_quote(child, out),
            },
            _ => {}
        }
    }
}
