//! Terminal capability detection from environment variables.
//!
//! Every check is a pure function of the process environment, recomputed
//! per render call. Several identities can be true at once; the winning
//! protocol is decided by [`TermCaps::image_protocol`].

use std::env;

/// Capability profile of the current terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermCaps {
    pub kitty: bool,
    pub ghostty: bool,
    pub iterm2: bool,
    pub wezterm: bool,
    pub wayst: bool,
    pub warp: bool,
    pub konsole: bool,
    /// OSC 8 hyperlink support, independent of image protocol support.
    pub hyperlinks: bool,
}

/// Wire protocol used to transmit inline images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProtocol {
    /// Kitty graphics protocol, chunked (`ESC _G ... ESC \`).
    Kitty,
    /// iTerm2 inline image protocol, single-shot (`ESC ]1337;File=... BEL`).
    Iterm2,
}

impl TermCaps {
    /// Snapshot the capability profile from the current environment.
    pub fn detect() -> Self {
        Self {
            kitty: kitty_supported(),
            ghostty: ghostty_supported(),
            iterm2: iterm2_supported(),
            wezterm: wezterm_supported(),
            wayst: wayst_supported(),
            warp: warp_supported(),
            konsole: konsole_supported(),
            hyperlinks: hyperlink_supported(),
        }
    }

    pub fn supports_images(&self) -> bool {
        self.image_protocol().is_some()
    }

    /// Pick the protocol encoder for this terminal.
    ///
    /// The Kitty family is checked before the iTerm2 family; when environment
    /// overlap leaves both detected, Kitty wins.
    pub fn image_protocol(&self) -> Option<ImageProtocol> {
        if self.kitty || self.ghostty || self.wezterm || self.wayst || self.konsole {
            Some(ImageProtocol::Kitty)
        } else if self.iterm2 || self.warp {
            Some(ImageProtocol::Iterm2)
        } else {
            None
        }
    }
}

fn env_lower(name: &str) -> String {
    env::var(name).unwrap_or_default().to_lowercase()
}

fn env_set(name: &str) -> bool {
    env::var_os(name).is_some_and(|v| !v.is_empty())
}

fn kitty_supported() -> bool {
    env_lower("TERM").contains("kitty") || env_set("KITTY_WINDOW_ID")
}

fn ghostty_supported() -> bool {
    env_lower("TERM").contains("ghostty")
        || env_lower("TERM_PROGRAM") == "ghostty"
        || env_set("GHOSTTY_RESOURCES_DIR")
}

fn iterm2_supported() -> bool {
    env_lower("TERM_PROGRAM") == "iterm.app"
        || env_set("ITERM_SESSION_ID")
        || env_set("ITERM_PROFILE")
}

fn wezterm_supported() -> bool {
    env_set("WEZTERM_EXECUTABLE")
        || env_set("WEZTERM_CONFIG_FILE")
        || env_lower("TERM_PROGRAM") == "wezterm"
        || env_lower("TERM").contains("wezterm")
}

fn wayst_supported() -> bool {
    env_lower("TERM").contains("wayst") || env_lower("TERM_PROGRAM") == "wayst"
}

fn warp_supported() -> bool {
    env_lower("TERM_PROGRAM") == "warp"
        || env_set("WARP_IS_LOCAL_SHELL_SESSION")
        || env_set("WARP_COMBINED_PROMPT_COMMAND_FINISHED")
}

fn konsole_supported() -> bool {
    env_set("KONSOLE_DBUS_SESSION")
        || env_set("KONSOLE_VERSION")
        || env_lower("TERM_PROGRAM") == "konsole"
}

/// OSC 8 hyperlink detection.
///
/// Broader than image support: multiplexers and VTE-based terminals carry
/// hyperlinks through even though they render no inline images.
fn hyperlink_supported() -> bool {
    const TERM_MARKERS: &[&str] = &[
        "kitty", "ghostty", "wezterm", "alacritty", "foot", "tmux", "screen",
    ];
    const PROGRAM_MARKERS: &[&str] = &["iterm.app", "hyper", "vscode", "ghostty", "wezterm"];

    let term = env_lower("TERM");
    if TERM_MARKERS.iter().any(|m| term.contains(m)) {
        return true;
    }

    let program = env_lower("TERM_PROGRAM");
    if PROGRAM_MARKERS.iter().any(|m| program.contains(m)) {
        return true;
    }

    env_set("VTE_VERSION")
        || env_set("KITTY_WINDOW_ID")
        || env_set("GHOSTTY_RESOURCES_DIR")
        || env_set("WEZTERM_EXECUTABLE")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testenv::EnvGuard;

    #[test]
    fn test_no_capabilities_on_plain_xterm() {
        let _env = EnvGuard::plain();
        let caps = TermCaps::detect();
        assert_eq!(caps, TermCaps::default());
        assert!(!caps.supports_images());
        assert!(caps.image_protocol().is_none());
    }

    #[test]
    fn test_ghostty_detection() {
        let mut env = EnvGuard::plain();
        assert!(!ghostty_supported());

        env.set("TERM", "xterm-ghostty");
        assert!(ghostty_supported());

        env.set("TERM", "xterm");
        env.set("TERM_PROGRAM", "ghostty");
        assert!(ghostty_supported());

        env.set("TERM_PROGRAM", "basic");
        env.set("GHOSTTY_RESOURCES_DIR", "/usr/share/ghostty");
        assert!(ghostty_supported());
    }

    #[test]
    fn test_kitty_detection() {
        let mut env = EnvGuard::plain();
        assert!(!kitty_supported());

        env.set("TERM", "xterm-kitty");
        assert!(kitty_supported());

        env.set("TERM", "xterm");
        env.set("KITTY_WINDOW_ID", "1");
        assert!(kitty_supported());
    }

    #[test]
    fn test_image_protocol_detection() {
        let mut env = EnvGuard::plain();
        assert!(!TermCaps::detect().supports_images());

        env.set("TERM", "xterm-kitty");
        assert_eq!(
            TermCaps::detect().image_protocol(),
            Some(ImageProtocol::Kitty)
        );
        drop(env);

        let mut env = EnvGuard::plain();
        env.set("TERM_PROGRAM", "iterm.app");
        assert_eq!(
            TermCaps::detect().image_protocol(),
            Some(ImageProtocol::Iterm2)
        );
        drop(env);

        let mut env = EnvGuard::plain();
        env.set("WEZTERM_EXECUTABLE", "/usr/bin/wezterm");
        assert_eq!(
            TermCaps::detect().image_protocol(),
            Some(ImageProtocol::Kitty)
        );
        drop(env);

        let mut env = EnvGuard::plain();
        env.set("WARP_IS_LOCAL_SHELL_SESSION", "1");
        assert_eq!(
            TermCaps::detect().image_protocol(),
            Some(ImageProtocol::Iterm2)
        );
        drop(env);

        let mut env = EnvGuard::plain();
        env.set("KONSOLE_DBUS_SESSION", "/Sessions/1");
        assert_eq!(
            TermCaps::detect().image_protocol(),
            Some(ImageProtocol::Kitty)
        );
    }

    #[test]
    fn test_kitty_family_wins_over_iterm2_family() {
        let mut env = EnvGuard::plain();
        env.set("KITTY_WINDOW_ID", "1");
        env.set("ITERM_SESSION_ID", "w0t0p0");
        assert_eq!(
            TermCaps::detect().image_protocol(),
            Some(ImageProtocol::Kitty)
        );
    }

    #[test]
    fn test_hyperlink_detection() {
        let mut env = EnvGuard::plain();
        assert!(!hyperlink_supported());

        env.set("TERM", "xterm-kitty");
        assert!(hyperlink_supported());
        drop(env);

        let mut env = EnvGuard::plain();
        env.set("VTE_VERSION", "0.60.3");
        assert!(hyperlink_supported());
        drop(env);

        let mut env = EnvGuard::plain();
        env.set("TERM_PROGRAM", "iterm.app");
        assert!(hyperlink_supported());
        drop(env);

        let mut env = EnvGuard::plain();
        env.set("WEZTERM_EXECUTABLE", "/usr/bin/wezterm");
        assert!(hyperlink_supported());
        drop(env);

        // tmux carries hyperlinks but no image protocol
        let mut env = EnvGuard::plain();
        env.set("TERM", "tmux-256color");
        let caps = TermCaps::detect();
        assert!(caps.hyperlinks);
        assert!(!caps.supports_images());
    }
}
