//! Time formatting helpers

use std::time::Duration;

/// Format seconds as zero-padded `MM:SS`
///
/// Negative input is clamped to `00:00`. Minutes are not wrapped into hours,
/// so a 60 minute run reads `60:00`.
pub fn mmss(seconds: i64) -> String {
    let s = seconds.max(0);
    format!("{:02}:{:02}", s / 60, s % 60)
}

/// Format a duration as a short human readable uptime string
pub fn uptime(duration: Duration) -> String {
    let hours = duration.as_secs() / 3600;
    let minutes = (duration.as_secs() % 3600) / 60;
    let seconds = duration.as_secs() % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
