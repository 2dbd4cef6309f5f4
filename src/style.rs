use crossterm::style::{Color, ContentStyle};

/// Styles threaded through a render call.
///
/// A default `StyleSpec` renders without any ANSI styling, which keeps
/// plain-text output byte-identical to its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleSpec {
    /// Applied to the text content of `<h1>` elements.
    pub h1: ContentStyle,
    /// Applied to the text content of `<h2>` elements.
    pub h2: ContentStyle,
    /// Applied to the finished body text as a whole.
    pub body: ContentStyle,
}

/// Muted grey used for quote box borders, headers and content.
pub(crate) fn muted() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::AnsiValue(240)),
        ..Default::default()
    }
}
