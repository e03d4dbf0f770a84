//! US equity market calendar: weekends plus the NYSE full-day holidays.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    !is_weekend(date) && holiday_name(date).is_none()
}

/// Name of the market holiday observed on `date`, if any.
pub fn holiday_name(date: NaiveDate) -> Option<&'static str> {
    holidays(date.year())
        .into_iter()
        .find(|(d, _)| *d == date)
        .map(|(_, name)| name)
}

/// `n`-th given weekday of a month, 1-based.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    nth_weekday(year, month, weekday, 5).or_else(|| nth_weekday(year, month, weekday, 4))
}

/// Saturday holidays move to Friday, Sunday holidays to Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn holidays(year: i32) -> Vec<(NaiveDate, &'static str)> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day);

    let mut days = vec![
        (nth_weekday(year, 1, Weekday::Mon, 3), "Martin Luther King Jr. Day"),
        (nth_weekday(year, 2, Weekday::Mon, 3), "Washington's Birthday"),
        (
            easter_sunday(year).map(|d| d - Duration::days(2)),
            "Good Friday",
        ),
        (last_weekday(year, 5, Weekday::Mon), "Memorial Day"),
        (fixed(7, 4).map(observed), "Independence Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day"),
        (nth_weekday(year, 11, Weekday::Thu, 4), "Thanksgiving Day"),
        (fixed(12, 25).map(observed), "Christmas Day"),
    ];

    // NYSE does not close on Friday Dec 31 for a Saturday New Year.
    if let Some(new_year) = fixed(1, 1) {
        if new_year.weekday() != Weekday::Sat {
            days.push((Some(observed(new_year)), "New Year's Day"));
        }
    }
    if year >= 2022 {
        days.push((fixed(6, 19).map(observed), "Juneteenth"));
    }

    days.into_iter()
        .filter_map(|(d, name)| d.map(|d| (d, name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_2025_holidays() {
        let closed = [
            d(2025, 1, 1),
            d(2025, 1, 20),
            d(2025, 2, 17),
            d(2025, 4, 18),
            d(2025, 5, 26),
            d(2025, 6, 19),
            d(2025, 7, 4),
            d(2025, 9, 1),
            d(2025, 11, 27),
            d(2025, 12, 25),
        ];
        for day in closed {
            assert!(!is_trading_day(day), "{} should be closed", day);
        }
        assert_eq!(holiday_name(d(2025, 4, 18)), Some("Good Friday"));
    }

    #[test]
    fn test_weekends_and_regular_days() {
        assert!(!is_trading_day(d(2025, 1, 11)));
        assert!(!is_trading_day(d(2025, 1, 12)));
        assert!(is_trading_day(d(2025, 1, 13)));
        assert!(is_trading_day(d(2025, 11, 28)));
    }

    #[test]
    fn test_observance_rules() {
        // Saturday New Year 2022: Friday 2021-12-31 stays open
        assert!(is_trading_day(d(2021, 12, 31)));
        // Saturday July 4th 2026 closes Friday
        assert!(!is_trading_day(d(2026, 7, 3)));
        // Sunday Christmas 2022 closes Monday
        assert!(!is_trading_day(d(2022, 12, 26)));
        // Juneteenth only from 2022
        assert!(is_trading_day(d(2021, 6, 18)));
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2024), Some(d(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(d(2025, 4, 20)));
        assert_eq!(easter_sunday(2026), Some(d(2026, 4, 5)));
    }
}
