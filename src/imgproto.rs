//! Inline image payload resolution and protocol encoding.
//!
//! Payloads are base64-encoded PNG bytes. They come from a `data:` URI, a
//! `cid:` lookup against the caller-supplied inline part map, or a bounded
//! remote fetch. Every failure on this path produces an empty payload, and
//! the transformer falls back to a textual representation instead of
//! aborting the render.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::debug::proto_debug;
use crate::term::caps::{ImageProtocol, TermCaps};
use crate::term::cell::{CellProbe, DEFAULT_CELL_HEIGHT};

const KITTY_CHUNK_SIZE: usize = 4096;
const REMOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve an `<img src>` to a base64 payload. Empty string means "no image".
pub(crate) fn resolve_payload(
    src: &str,
    inline: Option<&HashMap<String, String>>,
) -> String {
    if src.starts_with("data:image/") {
        return data_uri_base64(src);
    }
    if let Some(cid) = src.strip_prefix("cid:") {
        let cid = cid.trim_matches(|c| c == '<' || c == '>');
        return match inline {
            Some(map) => {
                let payload = map.get(cid).cloned().unwrap_or_default();
                proto_debug!(
                    "cid lookup for {cid} found={} len={}",
                    !payload.is_empty(),
                    payload.len()
                );
                payload
            }
            None => {
                proto_debug!("cid lookup skipped, no inline map for {cid}");
                String::new()
            }
        };
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return fetch_remote_base64(src);
    }
    String::new()
}

/// The base64 portion of a `data:` URI: everything after the first comma.
fn data_uri_base64(uri: &str) -> String {
    match uri.find(',') {
        Some(comma) if comma + 1 < uri.len() => uri[comma + 1..].to_string(),
        _ => String::new(),
    }
}

/// Fetch a remote image, re-encode it as PNG and return it base64-encoded.
///
/// Bounded by a 5 second timeout; there is no retry. Any network, status or
/// decode failure returns an empty payload.
fn fetch_remote_base64(url: &str) -> String {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return String::new();
    }

    let agent = ureq::AgentBuilder::new()
        .timeout(REMOTE_FETCH_TIMEOUT)
        .build();
    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(err) => {
            proto_debug!("remote fetch failed url={url} err={err}");
            return String::new();
        }
    };

    let mut data = Vec::new();
    if let Err(err) = response.into_reader().read_to_end(&mut data) {
        proto_debug!("remote fetch read error url={url} err={err}");
        return String::new();
    }

    let img = match image::load_from_memory(&data) {
        Ok(img) => img,
        Err(err) => {
            proto_debug!("remote decode failed url={url} err={err}");
            return String::new();
        }
    };

    let mut png = Vec::new();
    if let Err(err) = img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
        proto_debug!("remote png encode failed url={url} err={err}");
        return String::new();
    }

    let encoded = BASE64.encode(&png);
    proto_debug!("remote fetch ok url={url} len={}", encoded.len());
    encoded
}

/// Encode a payload for the detected terminal.
///
/// Returns the escape sequence and the number of terminal rows the image
/// covers, or `None` when the payload is empty or no protocol is supported.
pub(crate) fn render_inline(
    payload: &str,
    caps: &TermCaps,
    probe: &dyn CellProbe,
) -> Option<(String, usize)> {
    if payload.is_empty() {
        return None;
    }
    let rows = image_rows(payload, probe);
    match caps.image_protocol()? {
        ImageProtocol::Kitty => Some((kitty_escape(payload), rows)),
        ImageProtocol::Iterm2 => Some((iterm2_escape(payload), rows)),
    }
}

/// Terminal rows covered by the image: ceil(pixel height / cell height),
/// never less than one. Decode failures are a height estimate problem, not a
/// render failure, so they report a single row.
pub(crate) fn image_rows(payload: &str, probe: &dyn CellProbe) -> usize {
    let Ok(data) = BASE64.decode(payload) else {
        return 1;
    };
    let Ok(img) = image::load_from_memory(&data) else {
        return 1;
    };

    let cell = probe.cell_height_px().unwrap_or(DEFAULT_CELL_HEIGHT).max(1);
    let height = img.height();
    let rows = height.div_ceil(cell).max(1) as usize;
    proto_debug!("image height: {height} pixels, cell height: {cell} pixels, rows needed: {rows}");
    rows
}

/// Kitty graphics protocol: the payload is split into 4096-byte chunks, each
/// wrapped in its own `ESC _G ... ESC \` frame, with `m=1` on every chunk but
/// the last.
fn kitty_escape(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 64);
    let mut offset = 0;
    while offset < payload.len() {
        // Base64 is pure ASCII, so byte offsets are char boundaries.
        let end = (offset + KITTY_CHUNK_SIZE).min(payload.len());
        let more = if end < payload.len() { "1" } else { "0" };
        let chunk = &payload[offset..end];
        if offset == 0 {
            // C=1 leaves the cursor where the image was painted; the caller's
            // row marker pushes the following text below it.
            out.push_str(&format!("\x1b_Gf=100,a=T,q=2,C=1,m={more};{chunk}\x1b\\"));
        } else {
            out.push_str(&format!("\x1b_Gm={more};{chunk}\x1b\\"));
        }
        offset = end;
    }
    out
}

/// iTerm2 inline image protocol: one escape sequence, no chunking.
fn iterm2_escape(payload: &str) -> String {
    format!("\x1b]1337;File=inline=1:{payload}\x07")
}
