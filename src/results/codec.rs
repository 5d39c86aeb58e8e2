// Result files look like `12-08-2025 8pm.webp`, sometimes with a `File ` prefix.
use super::{ParsedResult, Period, TimeSlot};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Literal prefix some uploads carry (`File 12-08-2025 8pm.jpg`).
pub const FILE_PREFIX: &str = "File ";

static RESULT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:file )?(\d{1,2})-(\d{1,2})-(\d{4}) (\d{1,2})(am|pm)(?:\.([a-z0-9]+))?$")
        .expect("result filename pattern is valid")
});

static DATE_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").expect("date fragment pattern is valid")
});

pub fn parse_filename(filename: &str) -> Option<ParsedResult> {
    let caps = RESULT_NAME.captures(filename)?;

    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let hour: u8 = caps[4].parse().ok()?;

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }

    let period = if caps[5].eq_ignore_ascii_case("am") {
        Period::Am
    } else {
        Period::Pm
    };
    let time_slot = TimeSlot::new(hour, period)?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    Some(ParsedResult {
        date,
        time_slot,
        filename: filename.to_string(),
        extension: caps
            .get(6)
            .map(|ext| ext.as_str().to_string())
            .unwrap_or_default(),
    })
}

/// `DD-MM-YYYY`, the date part of every result filename.
pub fn format_date(date: NaiveDate) -> String {
    format!("{:02}-{:02}-{:04}", date.day(), date.month(), date.year())
}

/// Parses the `DD-MM-YYYY` form used by the `find` query.
pub fn parse_date_fragment(fragment: &str) -> Option<NaiveDate> {
    let caps = DATE_FRAGMENT.captures(fragment.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn candidate_filename(prefix: &str, date: NaiveDate, slot: TimeSlot, extension: &str) -> String {
    format!("{}{} {}.{}", prefix, format_date(date), slot, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_basic_name() {
        let parsed = parse_filename("12-08-2025 8pm.webp").unwrap();
        assert_eq!(parsed.date, date(2025, 8, 12));
        assert_eq!(parsed.display_time(), "8pm");
        assert_eq!(parsed.hour24(), 20);
        assert_eq!(parsed.extension, "webp");
        assert_eq!(parsed.filename, "12-08-2025 8pm.webp");
    }

    #[test]
    fn test_parse_with_file_prefix_keeps_exact_name() {
        let parsed = parse_filename("File 3-8-2025 1PM.JPG").unwrap();
        assert_eq!(parsed.date, date(2025, 8, 3));
        assert_eq!(parsed.display_time(), "1pm");
        assert_eq!(parsed.filename, "File 3-8-2025 1PM.JPG");
        assert_eq!(parsed.extension, "JPG");
    }

    #[test]
    fn test_format_is_inverse_of_parse() {
        let names = [
            ("1-1-2025 1am", "01-01-2025"),
            ("09-12-2024 12pm", "09-12-2024"),
            ("31-12-1999 11pm", "31-12-1999"),
            ("5-07-2025 6PM", "05-07-2025"),
        ];
        for (name, fragment) in names {
            let parsed = parse_filename(name).unwrap_or_else(|| panic!("{} should parse", name));
            assert_eq!(format_date(parsed.date), fragment);
            assert_eq!(parse_date_fragment(fragment), Some(parsed.date));
        }
    }

    #[test]
    fn test_display_time_is_lowercase_hour_and_period() {
        for hour in 1..=12u8 {
            for period in ["am", "pm", "AM", "Pm"] {
                let name = format!("10-10-2025 {}{}", hour, period);
                let parsed = parse_filename(&name).unwrap();
                assert_eq!(
                    parsed.display_time(),
                    format!("{}{}", hour, period.to_lowercase())
                );
            }
        }
    }

    #[test]
    fn test_parse_rejects_invalid_names() {
        let rejected = [
            "12-08-2025 0pm.webp",
            "12-08-2025 13pm.webp",
            "00-08-2025 8pm.webp",
            "32-08-2025 8pm.webp",
            "12-00-2025 8pm.webp",
            "12-13-2025 8pm.webp",
            "12-08-2025 8.webp",
            "12-08-2025 8pm extra.webp",
            "12-08-2025 8pmx",
            "12-08-25 8pm.webp",
            "Files 12-08-2025 8pm.webp",
            "31-04-2025 8pm.webp",
            "logo.png",
            "",
        ];
        for name in rejected {
            assert!(parse_filename(name).is_none(), "{:?} should not parse", name);
        }
    }

    #[test]
    fn test_hour24_boundaries_from_filenames() {
        let table = [
            ("12am", 0),
            ("1am", 1),
            ("11am", 11),
            ("12pm", 12),
            ("1pm", 13),
            ("11pm", 23),
        ];
        for (slot, hour24) in table {
            let parsed = parse_filename(&format!("01-02-2025 {}.png", slot)).unwrap();
            assert_eq!(parsed.hour24(), hour24, "{}", slot);
        }
    }

    #[test]
    fn test_candidate_filename() {
        assert_eq!(
            candidate_filename("", date(2025, 8, 3), TimeSlot::SIX_PM, "jpeg"),
            "03-08-2025 6pm.jpeg"
        );
        assert_eq!(
            candidate_filename(FILE_PREFIX, date(2025, 8, 13), TimeSlot::EIGHT_PM, "png"),
            "File 13-08-2025 8pm.png"
        );
    }
}
