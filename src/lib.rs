//! Terminal email body renderer.
//!
//! Takes a raw email body (HTML or Markdown, possibly quoted-printable
//! encoded) and produces a single styled string ready for terminal output:
//! ANSI-styled text, OSC 8 hyperlinks where the terminal supports them, and
//! inline images over the Kitty or iTerm2 graphics protocol where it
//! supports those. Quoted reply chains (`<blockquote>` elements and plain
//! `>`-prefixed text) are rendered as bordered boxes.
//!
//! The pipeline runs in four stages: capability detection from the
//! environment, body normalization into a document tree, a transformation
//! walk over that tree, and final text assembly. Only the parse step can
//! fail; everything else degrades to a textual fallback so a half-broken
//! email still displays.
//!
//! The renderer holds no state between calls and knows nothing about IMAP,
//! SMTP or the surrounding UI. Rendering is one-shot: always start from the
//! original raw body, never feed a rendered string back in.

mod debug;
mod error;
mod finalize;
mod imgproto;
mod normalize;
mod style;
pub mod term;
mod transform;

#[cfg(test)]
mod testenv;

use std::collections::HashMap;

pub use crossterm::style::{Attribute, Color, ContentStyle};

pub use crate::error::RenderError;
pub use crate::style::StyleSpec;
pub use crate::term::caps::{ImageProtocol, TermCaps};
pub use crate::term::cell::{CellProbe, FixedCellHeight, TtyProbe};

/// A MIME part referenced from the body by content id, already decoded and
/// base64-encoded by the mail layer.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub cid: String,
    pub base64: String,
}

/// Render a body that references no inline parts.
pub fn render_body(
    raw_body: &str,
    styles: &StyleSpec,
    disable_images: bool,
) -> Result<String, RenderError> {
    process_body(raw_body, None, styles, disable_images, &TtyProbe)
}

/// Render a body, resolving `cid:` image references against `inline`.
pub fn render_body_with_inline(
    raw_body: &str,
    inline: &[InlineImage],
    styles: &StyleSpec,
    disable_images: bool,
) -> Result<String, RenderError> {
    let map = inline_map(inline);
    process_body(raw_body, Some(&map), styles, disable_images, &TtyProbe)
}

/// Content-id lookup with angle brackets and the `cid:` prefix stripped, the
/// same normalization applied to `src` attributes at resolution time.
fn inline_map(inline: &[InlineImage]) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(inline.len());
    for image in inline {
        let cid = image
            .cid
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_start_matches("cid:");
        if cid.is_empty() || image.base64.is_empty() {
            continue;
        }
        map.insert(cid.to_string(), image.base64.clone());
    }
    map
}

fn process_body(
    raw_body: &str,
    inline: Option<&HashMap<String, String>>,
    styles: &StyleSpec,
    disable_images: bool,
    probe: &dyn CellProbe,
) -> Result<String, RenderError> {
    let caps = TermCaps::detect();
    let doc = normalize::normalize(raw_body)?;
    let (segments, quotes) = transform::transform(&doc, &caps, styles, inline, disable_images, probe);
    let text = finalize::finalize(segments, &quotes);
    Ok(styles.body.apply(text).to_string())
}
