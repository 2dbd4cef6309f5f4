//! Test support: serialized, self-restoring environment mutation.
//!
//! Capability detection reads the process environment, which is global state.
//! Tests that change it hold one shared lock and restore the previous values
//! on drop, so they can run under the default parallel test harness.

use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Every variable the capability detector looks at.
const TERMINAL_VARS: &[&str] = &[
    "TERM",
    "TERM_PROGRAM",
    "VTE_VERSION",
    "KITTY_WINDOW_ID",
    "GHOSTTY_RESOURCES_DIR",
    "WEZTERM_EXECUTABLE",
    "WEZTERM_CONFIG_FILE",
    "ITERM_SESSION_ID",
    "ITERM_PROFILE",
    "WARP_IS_LOCAL_SHELL_SESSION",
    "WARP_COMBINED_PROMPT_COMMAND_FINISHED",
    "KONSOLE_DBUS_SESSION",
    "KONSOLE_VERSION",
];

/// 1x1 white PNG, base64-encoded.
pub(crate) const TEST_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

pub(crate) struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvGuard {
    /// Lock the environment and reset it to a plain xterm with no special
    /// capabilities.
    pub(crate) fn plain() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = TERMINAL_VARS
            .iter()
            .map(|&name| (name, env::var_os(name)))
            .collect();
        for &name in TERMINAL_VARS {
            // SAFETY: all environment mutation in the test suite goes through
            // EnvGuard and is serialized by ENV_LOCK.
            unsafe { env::remove_var(name) };
        }
        let mut guard = Self { _lock: lock, saved };
        guard.set("TERM", "xterm");
        guard.set("TERM_PROGRAM", "basic");
        guard
    }

    /// Set one of the terminal variables for the duration of the guard.
    pub(crate) fn set(&mut self, name: &'static str, value: &str) {
        debug_assert!(TERMINAL_VARS.contains(&name));
        // SAFETY: serialized by ENV_LOCK, restored on drop.
        unsafe { env::set_var(name, value) };
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            // SAFETY: still holding ENV_LOCK.
            match value {
                Some(value) => unsafe { env::set_var(name, value) },
                None => unsafe { env::remove_var(name) },
            }
        }
    }
}
