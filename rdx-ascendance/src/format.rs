//! Display helpers shared by every front end.

use std::time::Duration;

/// Compact number display: `999`, `1.5k`, `2.3M`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if magnitude < 1_000.0 {
        format!("{:.0}", value)
    } else if magnitude < 1_000_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else {
        format!("{:.1}M", value / 1_000_000.0)
    }
}

/// Coarse countdown: `3d 4h`, `5h 07m`, `12m 09s`, `42s`.
pub fn format_time_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 1 {
        format!("{}d {}h", days, hours)
    } else if total >= 3_600 {
        format!("{}h {:02}m", total / 3_600, minutes)
    } else if total >= 60 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.4), "999");
        assert_eq!(format_number(1_000.0), "1.0k");
        assert_eq!(format_number(15_260.0), "15.3k");
        assert_eq!(format_number(2_345_678.0), "2.3M");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(-1_500.0), "-1.5k");
        assert_eq!(format_number(-3_200_000.0), "-3.2M");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn countdowns() {
        assert_eq!(format_time_remaining(Duration::from_secs(42)), "42s");
        assert_eq!(format_time_remaining(Duration::from_secs(12 * 60 + 9)), "12m 09s");
        assert_eq!(format_time_remaining(Duration::from_secs(5 * 3_600 + 7 * 60)), "5h 07m");
        // Exactly one day still reads in hours.
        assert_eq!(format_time_remaining(Duration::from_secs(86_400 + 60)), "24h 01m");
        assert_eq!(format_time_remaining(Duration::from_secs(3 * 86_400 + 4 * 3_600)), "3d 4h");
    }
}
