//! Clock texts for the elapsed and total time labels.

/// Clock text for a position in whole seconds.
///
/// Minutes and seconds are always two digits. Hours are prefixed only for
/// values strictly above one hour.
pub fn format_time(seconds: u64) -> String {
    let mut text = String::new();
    let mut remaining = seconds;
    if seconds > 3600 {
        let hours = seconds / 3600;
        text.push_str(&format!("{}:", hours));
        remaining -= hours * 3600;
    }
    text.push_str(&format!("{:02}:{:02}", remaining / 60, remaining % 60));
    text
}

/// Elapsed-time label. A non-finite position renders as zero.
pub fn elapsed_text(current_time: f64) -> String {
    format_time(whole_seconds(current_time))
}

/// Duration label, `--:--` until the duration has resolved.
pub fn duration_text(duration: f64) -> String {
    if duration.is_finite() {
        format_time(whole_seconds(duration))
    } else {
        "--:--".to_string()
    }
}

fn whole_seconds(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}
