use std::time::Duration;

/// Sums every `<integer><unit>` token in `input`, units `s`, `m` and `h`.
///
/// Never fails: anything that is not a complete token is skipped, so `"1m30s"` is
/// 90, `"2x5s"` is 5 and `""` is 0.
#[must_use]
pub fn parse_duration_secs(input: &str) -> u64 {
    let mut total: u64 = 0;
    let mut number: Option<u64> = None;

    for ch in input.chars() {
        if let Some(d) = ch.to_digit(10) {
            let n = number.unwrap_or(0);
            number = Some(n.saturating_mul(10).saturating_add(u64::from(d)));
            continue;
        }

        if let Some(n) = number.take() {
            let unit = match ch {
                's' => 1,
                'm' => 60,
                'h' => 60 * 60,
                _ => continue,
            };
            total = total.saturating_add(n.saturating_mul(unit));
        }
    }

    total
}

#[must_use]
pub fn parse_duration(input: &str) -> Duration {
    Duration::from_secs(parse_duration_secs(input))
}

/// Inverse of [`parse_duration_secs`] for whole seconds: `90` -> `"1m30s"`, `0` -> `"0s"`.
#[must_use]
pub fn format_duration_secs(secs: u64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }

    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;

    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_concatenated_tokens() {
        assert_eq!(parse_duration_secs("1m30s"), 90);
        assert_eq!(parse_duration_secs("2h"), 7200);
        assert_eq!(parse_duration_secs("1h1m1s"), 3661);
        assert_eq!(parse_duration_secs("45s"), 45);
    }

    #[test]
    fn empty_and_zero_are_zero() {
        assert_eq!(parse_duration_secs(""), 0);
        assert_eq!(parse_duration_secs("0s"), 0);
    }

    #[test]
    fn malformed_input_degrades_to_partial_sums() {
        assert_eq!(parse_duration_secs("abc"), 0);
        assert_eq!(parse_duration_secs("10"), 0);
        assert_eq!(parse_duration_secs("10x"), 0);
        assert_eq!(parse_duration_secs("2x5s"), 5);
        assert_eq!(parse_duration_secs("1m 30s"), 90);
        assert_eq!(parse_duration_secs("s5"), 0);
    }

    #[test]
    fn format_round_trips_whole_seconds() {
        for secs in [0, 1, 59, 60, 61, 90, 3599, 3600, 3661, 86_400, 90_061] {
            let rendered = format_duration_secs(secs);
            assert_eq!(parse_duration_secs(&rendered), secs, "{rendered}");
        }
        assert_eq!(format_duration_secs(90), "1m30s");
        assert_eq!(format_duration_secs(3600), "1h");
    }

    #[test]
    fn huge_values_saturate() {
        assert_eq!(parse_duration_secs("99999999999999999999999h"), u64::MAX);
    }
}
