//! Final text assembly.
//!
//! Collapses excess blank lines, expands image-row markers into real
//! newlines, renders quote records as bordered boxes, and runs a second
//! quote-detection pass over the linear text for `>`-prefixed blocks that
//! never sat inside a `<blockquote>`.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use unicode_width::UnicodeWidthStr;

use crate::style::muted;
use crate::transform::{QuoteRecord, Segment};

static RE_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Line-anchored "On DATE, SENDER wrote:" header. DATE is greedy, see the
/// transformer's variant.
static RE_ON_WROTE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^On\s+(.+),\s+(.+?)\s+wrote:$").unwrap());

/// Assemble the final text from the transformed segments.
///
/// Order matters: newline collapsing only ever sees text runs, so the
/// vertical space reserved for images and the interior formatting of quotes
/// cannot be eaten by it.
pub(crate) fn finalize(segments: Vec<Segment>, quotes: &[QuoteRecord]) -> String {
    let mut out = String::new();
    let mut run = String::new();

    for segment in segments {
        match segment {
            Segment::Text(text) => run.push_str(&text),
            Segment::ImageRows(rows) => {
                flush_run(&mut run, &mut out);
                out.push_str(&"\n".repeat(rows.max(1)));
            }
            Segment::Quote(index) => {
                flush_run(&mut run, &mut out);
                match quotes.get(index) {
                    Some(quote) => out.push_str(&quote_box(&quote.from, &quote.date, &quote.content)),
                    // Unresolvable references degrade to literal text.
                    None => out.push_str(&format!("[[quote:{index}]]")),
                }
            }
        }
    }
    flush_run(&mut run, &mut out);

    style_quoted_replies(&out)
}

fn flush_run(run: &mut String, out: &mut String) {
    if !run.is_empty() {
        out.push_str(&collapse_newlines(run));
        run.clear();
    }
}

/// Collapse 3+ consecutive newlines down to a single paragraph gap.
fn collapse_newlines(text: &str) -> Cow<'_, str> {
    RE_NEWLINES.replace_all(text, "\n\n")
}

/// Render a quoted section in a rounded box, header line first when the
/// sender or date is known.
fn quote_box(from: &str, date: &str, content: &str) -> String {
    let header = match (from.is_empty(), date.is_empty()) {
        (false, false) => format!("{from}  {date}"),
        (false, true) => from.to_string(),
        (true, false) => date.to_string(),
        (true, true) => String::new(),
    };

    let mut lines: Vec<String> = Vec::new();
    if !header.is_empty() {
        lines.push(header);
        lines.push(String::new());
    }
    lines.extend(content.lines().map(str::to_string));

    let width = lines
        .iter()
        .map(|line| line.as_str().width())
        .max()
        .unwrap_or(0);

    let style = muted();
    let mut out = String::new();
    out.push_str(&style.apply(format!("╭{}╮", "─".repeat(width + 2))).to_string());
    out.push('\n');
    for line in &lines {
        let pad = width - line.as_str().width();
        out.push_str(
            &style
                .apply(format!("│ {}{} │", line, " ".repeat(pad)))
                .to_string(),
        );
        out.push('\n');
    }
    out.push_str(&style.apply(format!("╰{}╯", "─".repeat(width + 2))).to_string());
    out
}

/// Detect quoted reply sections in linear text and box them.
///
/// Line state machine: an "On DATE, X wrote:" header or a `>`-prefixed line
/// enters quote mode; `>`-lines (and blank lines between them) accumulate; a
/// non-quoted, non-blank line closes and renders the block.
pub(crate) fn style_quoted_replies(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut result: Vec<String> = Vec::new();
    let mut block: Vec<String> = Vec::new();
    let mut from = String::new();
    let mut date = String::new();
    let mut in_quote = false;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if let Some(caps) = RE_ON_WROTE_LINE.captures(trimmed) {
            if in_quote && !block.is_empty() {
                result.push(quote_box(&from, &date, &block.join("\n")));
                block.clear();
            }
            date = display_date(caps.get(1).map_or("", |m| m.as_str()));
            from = caps.get(2).map_or("", |m| m.as_str()).to_string();
            in_quote = true;
            continue;
        }

        if trimmed.starts_with('>') {
            if !in_quote {
                in_quote = true;
                from.clear();
                date.clear();
            }
            let content = trimmed.trim_start_matches('>');
            let content = content.strip_prefix(' ').unwrap_or(content);
            block.push(content.to_string());
        } else if in_quote {
            let next_is_quoted = lines
                .get(i + 1)
                .is_some_and(|next| next.trim().starts_with('>'));
            if trimmed.is_empty() && next_is_quoted {
                // Blank line inside the quoted run.
                block.push(String::new());
            } else if trimmed.is_empty() && block.is_empty() {
                // Blank line between the header and the first quoted line.
            } else {
                if !block.is_empty() {
                    result.push(quote_box(&from, &date, &block.join("\n")));
                    block.clear();
                }
                in_quote = false;
                from.clear();
                date.clear();
                result.push((*line).to_string());
            }
        } else {
            result.push((*line).to_string());
        }
    }

    if in_quote && !block.is_empty() {
        result.push(quote_box(&from, &date, &block.join("\n")));
    }

    result.join("\n")
}

const QUOTE_DATE_FORMATS: &[&str] = &[
    "%b %d, %Y at %I:%M %p",
    "%d:%m:%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%B %d, %Y at %I:%M %p",
    "%b %d, %Y %I:%M %p",
];

/// Reformat an attribution date as `DD:MM:YY HH:MM`; unparseable dates pass
/// through unchanged.
pub(crate) fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    for format in QUOTE_DATE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return parsed.format("%d:%m:%y %H:%M").to_string();
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return parsed.format("%d:%m:%y %H:%M").to_string();
    }
    raw.to_string()
}
