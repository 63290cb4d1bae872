use std::fmt::Display;

use log::{Level, warn};

/// Logs a failure which has been swallowed during best effort cleanup, e.g. while closing the
/// character source of a stream or flushing pending characters on drop.
pub fn log_swallowed(context: &str, error: &impl Display) {
    if log::max_level() < Level::Warn {
        // Early return to save formatting the message in case we would not log anything.
        return;
    }
    warn!("Ignored failure while {context}: {error}");
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::log_swallowed;

    /// Must not panic, even if no logger is installed.
    #[test]
    fn log_without_logger() {
        log_swallowed("closing a stream", &io::Error::other("broken"));
    }
}
