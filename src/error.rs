use thiserror::Error;

/// Errors surfaced by the render pipeline.
///
/// Parsing the normalized document is the only step that can fail the whole
/// render; every other problem (transport decoding, image fetches, size
/// probes) degrades to a fallback so a broken email still displays something.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not parse email body: {0}")]
    Parse(String),
}
