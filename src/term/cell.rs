//! Terminal cell geometry probing.
//!
//! Inline image protocols paint over the character grid without advancing the
//! cursor, so the renderer needs to know how many rows an image covers. That
//! requires the cell height in pixels, which only the terminal itself can
//! report (via `TIOCGWINSZ`).

#[cfg(unix)]
use crate::debug::proto_debug;

/// Height assumed when the terminal reports no pixel dimensions.
pub const DEFAULT_CELL_HEIGHT: u32 = 18;

/// Source of the terminal cell height in pixels.
///
/// Injectable so tests (and callers that already know their geometry) can
/// supply a fixed value instead of hitting the tty.
pub trait CellProbe {
    /// Cell height in pixels, or `None` if it cannot be determined.
    fn cell_height_px(&self) -> Option<u32>;
}

/// Probes the controlling terminal with `TIOCGWINSZ`.
///
/// Tries stdout, stdin and stderr in that order, then opens `/dev/tty`
/// directly, which still works when stdio is redirected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtyProbe;

impl CellProbe for TtyProbe {
    fn cell_height_px(&self) -> Option<u32> {
        probe_tty()
    }
}

/// A fixed cell height. `0` is clamped to `1`.
#[derive(Debug, Clone, Copy)]
pub struct FixedCellHeight(pub u32);

impl CellProbe for FixedCellHeight {
    fn cell_height_px(&self) -> Option<u32> {
        Some(self.0.max(1))
    }
}

#[cfg(unix)]
fn probe_tty() -> Option<u32> {
    use std::os::fd::AsRawFd;

    let fds = [
        std::io::stdout().as_raw_fd(),
        std::io::stdin().as_raw_fd(),
        std::io::stderr().as_raw_fd(),
    ];
    for fd in fds {
        if let Some(height) = cell_height_from_fd(fd) {
            return Some(height);
        }
    }

    let tty = std::fs::File::open("/dev/tty").ok()?;
    cell_height_from_fd(tty.as_raw_fd())
}

#[cfg(unix)]
fn cell_height_from_fd(fd: i32) -> Option<u32> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    // SAFETY: TIOCGWINSZ fills the winsize struct and touches nothing else.
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };
    if rc != 0 {
        return None;
    }

    // Plenty of terminals report rows but leave ypixel at 0.
    if ws.ws_row > 0 && ws.ws_ypixel > 0 {
        let height = u32::from(ws.ws_ypixel) / u32::from(ws.ws_row);
        if height > 0 {
            proto_debug!(
                "terminal cell height: {height} pixels (rows={}, ypixel={}, fd={fd})",
                ws.ws_row,
                ws.ws_ypixel
            );
            return Some(height);
        }
    }
    None
}

#[cfg(not(unix))]
fn probe_tty() -> Option<u32> {
    None
}
