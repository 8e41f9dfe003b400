//! Calendar conversions for the 48-week `BirdNET` year.

use crate::constants::calendar::DAYS_IN_MONTH;
use crate::constants::range_filter::{DAYS_PER_WEEK, WEEKS_PER_YEAR, YEAR_START_DAY};
use chrono::{Datelike, NaiveDate};

/// Clamp an arbitrary week index into `1..=48`.
pub fn clamp_week(week: i64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = week.clamp(1, i64::from(WEEKS_PER_YEAR)) as u32;
    clamped
}

/// Convert month/day to week number (1-48).
///
/// `Week = floor((day_of_year - 1) / 7.6) + 1`, computed on a non-leap
/// calendar. Out-of-range months are clamped into `1..=12`.
pub fn date_to_week(month: u32, day: u32) -> u32 {
    let month = month.clamp(1, 12);
    let day_of_year: u32 = DAYS_IN_MONTH
        .iter()
        .take((month - 1) as usize)
        .sum::<u32>()
        + day.max(1);

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let week = ((day_of_year - 1) as f32 / DAYS_PER_WEEK).floor() as i64 + 1;

    clamp_week(week)
}

/// Week number for a calendar date.
pub fn week_of(date: NaiveDate) -> u32 {
    date_to_week(date.month(), date.day())
}

/// Convert day of year (1-365) to (month, day).
///
/// Days past the end of the year map to December 31st.
pub fn day_of_year_to_date(day_of_year: u32) -> (u32, u32) {
    let mut remaining = day_of_year.max(1);
    for (month_idx, &days_in_month) in DAYS_IN_MONTH.iter().enumerate() {
        if remaining <= days_in_month {
            #[allow(clippy::cast_possible_truncation)]
            return ((month_idx + 1) as u32, remaining);
        }
        remaining -= days_in_month;
    }

    (12, 31)
}

/// First day of year covered by a `BirdNET` week.
///
/// `day_of_year = (week - 1) * DAYS_PER_WEEK + YEAR_START_DAY`
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn week_to_start_day(week: u32) -> u32 {
    let week = week.clamp(1, WEEKS_PER_YEAR);
    ((week - 1) as f32).mul_add(DAYS_PER_WEEK, YEAR_START_DAY) as u32
}

/// Representative (month, day) for a week, as expected by the range model.
pub fn week_to_month_day(week: u32) -> (u32, u32) {
    day_of_year_to_date(week_to_start_day(week))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_to_week_jan_1() {
        assert_eq!(date_to_week(1, 1), 1);
    }

    #[test]
    fn test_date_to_week_dec_31() {
        assert_eq!(date_to_week(12, 31), 48);
    }

    #[test]
    fn test_date_to_week_jun_15() {
        // day 166: (166 - 1) / 7.6 = 21.71 -> 22
        assert_eq!(date_to_week(6, 15), 22);
    }

    #[test]
    fn test_date_to_week_clamps_bad_month() {
        assert_eq!(date_to_week(0, 1), 1);
        assert_eq!(date_to_week(13, 31), 48);
    }

    #[test]
    fn test_week_of_leap_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29);
        assert_eq!(date.map(week_of), Some(8));
    }

    #[test]
    fn test_clamp_week() {
        assert_eq!(clamp_week(-5), 1);
        assert_eq!(clamp_week(0), 1);
        assert_eq!(clamp_week(24), 24);
        assert_eq!(clamp_week(60), 48);
    }

    #[test]
    fn test_week_to_start_day() {
        assert_eq!(week_to_start_day(1), 1);
        // (24 - 1) * 7.6 + 1 = 175.8 -> 175
        assert_eq!(week_to_start_day(24), 175);
        assert_eq!(week_to_start_day(48), 358);
    }

    #[test]
    fn test_week_to_month_day() {
        assert_eq!(week_to_month_day(1), (1, 1));
        assert_eq!(week_to_month_day(24), (6, 24));
        assert_eq!(week_to_month_day(48), (12, 24));
    }

    #[test]
    fn test_day_of_year_to_date_overflow() {
        assert_eq!(day_of_year_to_date(400), (12, 31));
    }
}
