//! Protocol-decision debug hooks.
//!
//! Protocol decisions always go to `tracing` at debug level. Setting
//! `DEBUG_IMAGE_PROTOCOL` or `DEBUG_KITTY_IMAGES` additionally prints them to
//! stdout, and `DEBUG_IMAGE_PROTOCOL_LOG` / `DEBUG_KITTY_LOG` name a file the
//! lines are appended to. All of this is off by default and never required
//! for correctness.

use std::env;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;

macro_rules! proto_debug {
    ($($arg:tt)*) => {
        $crate::debug::protocol(::std::format_args!($($arg)*))
    };
}
pub(crate) use proto_debug;

pub(crate) fn protocol(args: fmt::Arguments<'_>) {
    tracing::debug!(target: "mailview::imgproto", "{args}");

    if !stdout_enabled() {
        return;
    }
    let line = format!("[img-protocol] {args}\n");
    print!("{line}");
    if let Some(path) = log_path() {
        if let Ok(mut file) = OpenOptions::new().append(true).create(true).open(&path) {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

fn stdout_enabled() -> bool {
    env_set("DEBUG_IMAGE_PROTOCOL") || env_set("DEBUG_KITTY_IMAGES")
}

fn log_path() -> Option<String> {
    ["DEBUG_IMAGE_PROTOCOL_LOG", "DEBUG_KITTY_LOG"]
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.is_empty()))
}

fn env_set(name: &str) -> bool {
    env::var_os(name).is_some_and(|v| !v.is_empty())
}
