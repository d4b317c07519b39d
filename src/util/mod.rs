use std::time::Duration;

/// Format an elapsed duration for timing logs.
///
/// - under one second: milliseconds, rounded up ("42 msec")
/// - under one minute: seconds with one decimal ("1.5 sec")
/// - under one hour: "m:ss"
/// - otherwise: "h:mm:ss"
pub fn format_elapsed_time(elapsed: Duration) -> String {
    let millis = (elapsed.as_secs_f64() * 1000.0).ceil();
    if millis < 1000.0 {
        return format!("{} msec", millis as u64);
    }

    let tenths = (millis / 100.0).round() as u64;
    if tenths < 600 {
        return format!("{}.{} sec", tenths / 10, tenths % 10);
    }

    // Derive every field from the rounded total so "59.96s" never renders as "0:60"
    let total_secs = (millis / 1000.0).round() as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_second_rounds_up_to_whole_millis() {
        assert_eq!(format_elapsed_time(Duration::ZERO), "0 msec");
        assert_eq!(format_elapsed_time(Duration::from_micros(1_200)), "2 msec");
        assert_eq!(format_elapsed_time(Duration::from_millis(999)), "999 msec");
    }

    #[test]
    fn test_seconds_use_one_decimal() {
        assert_eq!(format_elapsed_time(Duration::from_millis(1500)), "1.5 sec");
        assert_eq!(format_elapsed_time(Duration::from_millis(1000)), "1.0 sec");
        assert_eq!(format_elapsed_time(Duration::from_millis(42_340)), "42.3 sec");
    }

    #[test]
    fn test_just_under_one_second_promotes_to_seconds() {
        assert_eq!(format_elapsed_time(Duration::from_micros(999_600)), "1.0 sec");
    }

    #[test]
    fn test_minutes_and_hours() {
        assert_eq!(format_elapsed_time(Duration::from_millis(59_960)), "1:00");
        assert_eq!(format_elapsed_time(Duration::from_millis(61_000)), "1:01");
        assert_eq!(format_elapsed_time(Duration::from_secs(3_723)), "1:02:03");
    }
}
