//! Console logging with the `[i]` / `[+]` / `[!]` / `[-]` prefix convention.

use log::Level;
use std::io::Write;

/// Target used by [`success!`](crate::success) so the formatter can print `[+]`
pub const SUCCESS_TARGET: &str = "beevision::done";

/// Log an info record that reads as a completed step (`[+]`)
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        log::info!(target: $crate::logging::SUCCESS_TARGET, $($arg)+)
    };
}

/// Prefix printed before a record of the given level and target
pub fn prefix(level: Level, target: &str) -> &'static str {
    match level {
        Level::Error => "[-]",
        Level::Warn => "[!]",
        Level::Info if target == SUCCESS_TARGET => "[+]",
        Level::Info => "[i]",
        Level::Debug | Level::Trace => "[.]",
    }
}

/// Initialize env_logger, defaulting to `info` unless `RUST_LOG` says otherwise
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {}",
                prefix(record.level(), record.target()),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(prefix(Level::Info, "beevision::split"), "[i]");
        assert_eq!(prefix(Level::Info, SUCCESS_TARGET), "[+]");
        assert_eq!(prefix(Level::Warn, SUCCESS_TARGET), "[!]");
        assert_eq!(prefix(Level::Error, "beevision"), "[-]");
        assert_eq!(prefix(Level::Debug, "beevision"), "[.]");
    }
}
