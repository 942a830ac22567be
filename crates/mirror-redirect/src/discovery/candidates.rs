//! Dated mirror URL generation.

use chrono::{Days, NaiveDate};

use crate::config::DATE_PLACEHOLDER;

/// Date stamp format used in mirror hostnames (`DDMMYY`).
const STAMP_FORMAT: &str = "%d%m%y";

/// Format a date the way mirror hostnames embed it.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format(STAMP_FORMAT).to_string()
}

/// Build candidate mirror URLs for `today` and the preceding days, newest first.
pub fn candidate_urls(template: &str, today: NaiveDate, window_days: u32) -> Vec<String> {
    (0..u64::from(window_days))
        .filter_map(|shift| today.checked_sub_days(Days::new(shift)))
        .map(|date| template.replacen(DATE_PLACEHOLDER, &date_stamp(date), 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stamp_is_day_month_two_digit_year() {
        assert_eq!(date_stamp(date(2024, 3, 7)), "070324");
        assert_eq!(date_stamp(date(2031, 12, 25)), "251231");
    }

    #[test]
    fn test_candidates_newest_first() {
        let urls = candidate_urls("http://kinovod{}.pro", date(2024, 3, 7), 6);
        assert_eq!(
            urls,
            vec![
                "http://kinovod070324.pro",
                "http://kinovod060324.pro",
                "http://kinovod050324.pro",
                "http://kinovod040324.pro",
                "http://kinovod030324.pro",
                "http://kinovod020324.pro",
            ]
        );
    }

    #[test]
    fn test_candidates_cross_month_and_year() {
        let urls = candidate_urls("https://m{}.example/", date(2025, 1, 1), 3);
        assert_eq!(
            urls,
            vec![
                "https://m010125.example/",
                "https://m311224.example/",
                "https://m301224.example/",
            ]
        );
    }

    #[test]
    fn test_single_day_window() {
        let urls = candidate_urls("http://x{}.test", date(2024, 2, 29), 1);
        assert_eq!(urls, vec!["http://x290224.test"]);
    }
}
