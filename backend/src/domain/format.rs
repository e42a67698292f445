//! Display helpers shared by reports and tooling responses.

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60_000;

/// Render a millisecond duration for humans.
///
/// Below one second the raw milliseconds are shown, below one minute the
/// seconds with one decimal, and otherwise whole minutes and seconds. The
/// sign is kept in every form.
///
/// # Examples
/// ```
/// use workload_backend::domain::format::format_duration;
///
/// assert_eq!(format_duration(0), "0ms");
/// assert_eq!(format_duration(1500), "1.5s");
/// assert_eq!(format_duration(-1000), "-1.0s");
/// assert_eq!(format_duration(125_000), "2m 5s");
/// ```
#[must_use]
pub fn format_duration(ms: i64) -> String {
    let magnitude = ms.unsigned_abs();
    if magnitude < MS_PER_SECOND {
        return format!("{ms}ms");
    }
    let sign = if ms < 0 { "-" } else { "" };
    if magnitude < MS_PER_MINUTE {
        let tenths = (magnitude + 50) / 100;
        return format!("{sign}{}.{}s", tenths / 10, tenths % 10);
    }
    let minutes = magnitude / MS_PER_MINUTE;
    let seconds = (magnitude % MS_PER_MINUTE) / MS_PER_SECOND;
    format!("{sign}{minutes}m {seconds}s")
}

/// Render a ratio as a percentage with at most one decimal place.
///
/// # Examples
/// ```
/// use workload_backend::domain::format::format_percentage;
///
/// assert_eq!(format_percentage(0.5), "50%");
/// assert_eq!(format_percentage(0.123), "12.3%");
/// ```
#[must_use]
pub fn format_percentage(ratio: f64) -> String {
    let rendered = format!("{:.1}", ratio * 100.0);
    let trimmed = rendered.strip_suffix(".0").unwrap_or(&rendered);
    let trimmed = if trimmed == "-0" { "0" } else { trimmed };
    format!("{trimmed}%")
}

/// Join the present, non-blank class names with single spaces.
///
/// # Examples
/// ```
/// use workload_backend::domain::format::cn;
///
/// assert_eq!(cn(&[Some("a"), None, Some(""), Some("b")]), "a b");
/// ```
#[must_use]
pub fn cn(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check a `YYYY-YY` academic year label.
///
/// The suffix must be the year after the start year, modulo 100.
///
/// # Examples
/// ```
/// use workload_backend::domain::format::is_valid_academic_year;
///
/// assert!(is_valid_academic_year("2024-25"));
/// assert!(is_valid_academic_year("2099-00"));
/// assert!(!is_valid_academic_year("2024-26"));
/// ```
#[must_use]
pub fn is_valid_academic_year(label: &str) -> bool {
    let Some((start, end)) = label.split_once('-') else {
        return false;
    };
    if start.len() != 4 || end.len() != 2 {
        return false;
    }
    if !start.chars().chain(end.chars()).all(|c| c.is_ascii_digit()) {
        return false;
    }
    match (start.parse::<u32>(), end.parse::<u32>()) {
        (Ok(start_year), Ok(end_suffix)) => (start_year + 1) % 100 == end_suffix,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0ms")]
    #[case(999, "999ms")]
    #[case(-999, "-999ms")]
    #[case(1000, "1.0s")]
    #[case(1500, "1.5s")]
    #[case(-1000, "-1.0s")]
    #[case(59_940, "59.9s")]
    #[case(60_000, "1m 0s")]
    #[case(125_000, "2m 5s")]
    #[case(-61_000, "-1m 1s")]
    fn durations(#[case] ms: i64, #[case] expected: &str) {
        assert_eq!(format_duration(ms), expected);
    }

    #[rstest]
    #[case(0.5, "50%")]
    #[case(0.123, "12.3%")]
    #[case(1.0, "100%")]
    #[case(0.0, "0%")]
    #[case(1.256, "125.6%")]
    #[case(-0.25, "-25%")]
    fn percentages(#[case] ratio: f64, #[case] expected: &str) {
        assert_eq!(format_percentage(ratio), expected);
    }

    #[rstest]
    #[case(&[Some("a"), None, None, Some("b")], "a b")]
    #[case(&[None, None], "")]
    #[case(&[Some(" row "), Some("over")], "row over")]
    fn class_names(#[case] parts: &[Option<&str>], #[case] expected: &str) {
        assert_eq!(cn(parts), expected);
    }

    #[rstest]
    #[case("2024-25", true)]
    #[case("1999-00", true)]
    #[case("2024-26", false)]
    #[case("2024/25", false)]
    #[case("24-25", false)]
    #[case("2024-2025", false)]
    #[case("abcd-ef", false)]
    #[case("", false)]
    fn academic_years(#[case] label: &str, #[case] expected: bool) {
        assert_eq!(is_valid_academic_year(label), expected);
    }
}
