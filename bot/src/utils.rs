use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use std::time::Duration;

lazy_static! {
    static ref DURATION_PATTERN: Regex =
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("valid duration pattern");
}

/// Parse ISO8601 duration string (PT1H2M3S) to total seconds.
///
/// Anything that does not match (empty strings, day components, fractional
/// seconds, overflowing numbers) comes back as 0. Callers treat 0 as
/// "no usable length" and drop the video.
pub fn parse_duration(duration_str: &str) -> u64 {
    let Some(captures) = DURATION_PATTERN.captures(duration_str.trim()) else {
        return 0;
    };

    let component = |index: usize| -> Option<u64> {
        match captures.get(index) {
            Some(m) => m.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };

    let total = component(1)
        .zip(component(2))
        .zip(component(3))
        .and_then(|((hours, minutes), seconds)| {
            hours
                .checked_mul(3600)?
                .checked_add(minutes.checked_mul(60)?)?
                .checked_add(seconds)
        });

    total.unwrap_or(0)
}

/// Formats a (possibly negative) number of seconds as `HHh:MMmin:SSs:MMMms`.
///
/// The sign is dropped. Hours and minutes are left out when they are zero.
pub fn format_clock(seconds: f64) -> String {
    let total_ms = (seconds.abs() * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    let mut formatted = String::new();
    if hours != 0 {
        formatted.push_str(&format!("{hours:02}h:"));
    }
    if minutes != 0 {
        formatted.push_str(&format!("{minutes:02}min:"));
    }
    formatted.push_str(&format!("{secs:02}s:{millis:03}ms"));
    formatted
}

pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:.2}%")
}

/// Picks a wait uniformly in `[min, max]` at whole-second granularity.
/// Inverted bounds are swapped.
pub fn random_wait(min: Duration, max: Duration) -> Duration {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    if low == high {
        return low;
    }
    let secs = rand::rng().random_range(low.as_secs()..=high.as_secs());
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_components() {
        assert_eq!(parse_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_duration("PT10M"), 600);
        assert_eq!(parse_duration("PT2H"), 7200);
        assert_eq!(parse_duration("PT45S"), 45);
        assert_eq!(parse_duration("PT1H30S"), 3630);
    }

    #[test]
    fn zero_and_malformed_tokens_are_zero() {
        for token in [
            "", "P0D", "PT", "PT0S", "PT0H0M0S", "garbage", "P1DT2H", "PT1.5S", "PT3M2H",
            "1H2M",
        ] {
            assert_eq!(parse_duration(token), 0, "token {token:?}");
        }
    }

    #[test]
    fn overflowing_hours_are_zero() {
        assert_eq!(parse_duration("PT99999999999999999999H"), 0);
        assert_eq!(parse_duration(&format!("PT{}H", u64::MAX / 1000)), 0);
    }

    #[test]
    fn clock_omits_zero_hours_and_minutes() {
        assert_eq!(format_clock(3723.5), "01h:02min:03s:500ms");
        assert_eq!(format_clock(62.25), "01min:02s:250ms");
        assert_eq!(format_clock(3605.0), "01h:05s:000ms");
        assert_eq!(format_clock(0.0), "00s:000ms");
        assert_eq!(format_clock(-90.0), "01min:30s:000ms");
    }

    #[test]
    fn clock_rounds_float_noise_into_milliseconds() {
        // 0.57 * 1000 is 569.999... in binary floating point
        assert_eq!(format_clock(0.57), "00s:570ms");
        assert_eq!(format_clock(59.9996), "01min:00s:000ms");
    }

    #[test]
    fn percentage_has_two_decimals() {
        assert_eq!(format_percentage(12.3456), "12.35%");
        assert_eq!(format_percentage(-0.5), "-0.50%");
    }

    #[test]
    fn random_wait_stays_in_bounds() {
        let min = Duration::from_secs(5);
        let max = Duration::from_secs(9);
        for _ in 0..200 {
            let wait = random_wait(min, max);
            assert!(wait >= min && wait <= max);
        }
        assert_eq!(random_wait(Duration::ZERO, Duration::ZERO), Duration::ZERO);
        let swapped = random_wait(max, min);
        assert!(swapped >= min && swapped <= max);
    }
}
