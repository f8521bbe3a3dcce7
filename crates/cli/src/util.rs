//! CLI utility functions.

use std::time::Duration;

pub fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    // Values that would round up to "1024.0 KB" are shown in MB.
    const MB_THRESHOLD: usize = 1_048_525;

    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < MB_THRESHOLD {
        format!("{:.1} KB", bytes as f64 / KB)
    } else {
        format!("{:.2} MB", bytes as f64 / MB)
    }
}

/// `850 ms` below one second, `2.4 s` above.
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{} ms", elapsed.as_millis())
    } else {
        format!("{:.1} s", elapsed.as_secs_f64())
    }
}
