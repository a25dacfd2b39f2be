use std::fmt;
use std::io;
use std::sync::OnceLock;

use crossterm::style::Stylize;
use crossterm::tty::IsTty;

static VERBOSE_OUTPUT: OnceLock<()> = OnceLock::new();

pub fn enable_verbose_output() {
    let _ = VERBOSE_OUTPUT.set(());
}

pub fn is_verbose_output_enabled() -> bool {
    VERBOSE_OUTPUT.get().is_some()
}

static COLOR_OUTPUT: OnceLock<()> = OnceLock::new();

pub fn enable_color_output() {
    let _ = COLOR_OUTPUT.set(());
}

pub fn is_color_output_enabled() -> bool {
    COLOR_OUTPUT.get().is_some()
}

pub fn stderr_is_tty() -> bool {
    io::stderr().is_tty()
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        eprintln!("{}: {}", $crate::log::Error, format_args!($($arg)*));
    }};
}

pub use error;

#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {{
        eprintln!("{}: {}", $crate::log::Warning, format_args!($($arg)*));
    }};
}

pub use warning;

#[macro_export]
macro_rules! building {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::log::Title("    Building"), format_args!($($arg)*));
    }};
}

pub use building;

#[macro_export]
macro_rules! finished {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::log::Title("    Finished"), format_args!($($arg)*));
    }};
}

pub use finished;

#[macro_export]
macro_rules! optimized {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::log::Title("   Optimized"), format_args!($($arg)*));
    }};
}

pub use optimized;

#[macro_export]
macro_rules! copying {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::log::Title("     Copying"), format_args!($($arg)*));
    }};
}

pub use copying;

#[macro_export]
macro_rules! serving {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::log::Title("     Serving"), format_args!($($arg)*));
    }};
}

pub use serving;

#[macro_export]
macro_rules! watching {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::log::Title("    Watching"), format_args!($($arg)*));
    }};
}

pub use watching;

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if $crate::log::is_verbose_output_enabled() {
            eprintln!("{} {}", $crate::log::Title("        Info"), format_args!($($arg)*));
        }
    }};
}

pub use info;

pub struct Error;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = "error";
        if is_color_output_enabled() {
            write!(f, "{}", title.dark_red().bold())
        } else {
            write!(f, "{title}")
        }
    }
}

pub struct Warning;

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = "warning";
        if is_color_output_enabled() {
            write!(f, "{}", title.dark_yellow().bold())
        } else {
            write!(f, "{title}")
        }
    }
}

pub struct Title(pub &'static str);

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.0;
        if is_color_output_enabled() {
            write!(f, "{}", title.dark_blue().bold())
        } else {
            write!(f, "{title}")
        }
    }
}
