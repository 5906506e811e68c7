//! Display formatting for playback positions.

/// Format milliseconds as `M:SS`.
///
/// Minutes are not wrapped into hours and sub-second remainders are dropped.
pub fn format_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
