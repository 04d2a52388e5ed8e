//! Calendar utilities and the recurrence cadence enum.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Canonical textual representation of calendar dates in stored documents.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// Enumerates the cadences a recurring expense can follow.
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Any cadence this build does not understand. Never advances.
    #[serde(other)]
    Unknown,
}

impl Frequency {
    /// Calculates the occurrence following `from`.
    ///
    /// Monthly cadences target `day_of_month` when present (a zero day counts as
    /// absent) and the day of `from` otherwise, clamped to the length of the
    /// resulting month. Yearly cadences keep month and day; a Feb 29 that does
    /// not exist in the next year rolls over to Mar 1. Unknown cadences return
    /// `from` unchanged.
    pub fn next_date(self, from: NaiveDate, day_of_month: Option<u32>) -> NaiveDate {
        match self {
            Frequency::Daily => from.checked_add_days(Days::new(1)).unwrap_or(from),
            Frequency::Weekly => from.checked_add_days(Days::new(7)).unwrap_or(from),
            Frequency::Monthly => {
                let target_day = day_of_month
                    .filter(|day| *day > 0)
                    .unwrap_or_else(|| from.day());
                shift_month(from, 1, target_day).unwrap_or(from)
            }
            Frequency::Yearly => next_year(from).unwrap_or(from),
            Frequency::Unknown => from,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Frequency::Unknown)
    }

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
            Frequency::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unsupported frequency name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFrequencyError(pub String);

impl fmt::Display for ParseFrequencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown frequency `{}` (expected daily, weekly, monthly or yearly)",
            self.0
        )
    }
}

impl std::error::Error for ParseFrequencyError {}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(value.to_string())),
        }
    }
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` date, returning `None` for malformed input.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Returns `date` moved to `day` within its own month, clamped to the month length.
pub fn with_day_clamped(date: NaiveDate, day: u32) -> NaiveDate {
    let day = day.clamp(1, days_in_month(date.year(), date.month()));
    date.with_day(day).unwrap_or(date)
}

/// Number of days in the given month, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn next_year(date: NaiveDate) -> Option<NaiveDate> {
    let year = date.year() + 1;
    NaiveDate::from_ymd_opt(year, date.month(), date.day()).or_else(|| {
        NaiveDate::from_ymd_opt(year, date.month(), 1)
            .and_then(|first| first.checked_add_days(Days::new(u64::from(date.day()) - 1)))
    })
}

fn shift_month(date: NaiveDate, months: i32, day: u32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_and_weekly_add_fixed_days() {
        assert_eq!(Frequency::Daily.next_date(date(2024, 12, 31), None), date(2025, 1, 1));
        assert_eq!(Frequency::Weekly.next_date(date(2024, 2, 26), None), date(2024, 3, 4));
    }

    #[test]
    fn monthly_clamps_to_short_months() {
        assert_eq!(
            Frequency::Monthly.next_date(date(2024, 1, 31), Some(31)),
            date(2024, 2, 29)
        );
        assert_eq!(
            Frequency::Monthly.next_date(date(2023, 1, 31), Some(31)),
            date(2023, 2, 28)
        );
        assert_eq!(
            Frequency::Monthly.next_date(date(2024, 2, 29), Some(31)),
            date(2024, 3, 31)
        );
    }

    #[test]
    fn monthly_without_anchor_day_follows_the_previous_day() {
        let feb = Frequency::Monthly.next_date(date(2023, 1, 31), None);
        assert_eq!(feb, date(2023, 2, 28));
        assert_eq!(Frequency::Monthly.next_date(feb, None), date(2023, 3, 28));
    }

    #[test]
    fn monthly_rolls_over_the_year() {
        assert_eq!(
            Frequency::Monthly.next_date(date(2024, 12, 5), Some(5)),
            date(2025, 1, 5)
        );
    }

    #[test]
    fn yearly_rolls_leap_day_over_to_march() {
        assert_eq!(Frequency::Yearly.next_date(date(2024, 2, 29), None), date(2025, 3, 1));
        assert_eq!(Frequency::Yearly.next_date(date(2025, 3, 1), None), date(2026, 3, 1));
        assert_eq!(Frequency::Yearly.next_date(date(2027, 2, 28), None), date(2028, 2, 28));
        assert_eq!(Frequency::Yearly.next_date(date(2024, 7, 1), None), date(2025, 7, 1));
    }

    #[test]
    fn monthly_treats_zero_day_as_unset() {
        assert_eq!(
            Frequency::Monthly.next_date(date(2024, 1, 15), Some(0)),
            date(2024, 2, 15)
        );
    }

    #[test]
    fn unknown_frequency_does_not_move() {
        let from = date(2024, 5, 5);
        assert_eq!(Frequency::Unknown.next_date(from, Some(1)), from);
    }

    #[test]
    fn frequency_deserializes_unknown_values() {
        let parsed: Frequency = serde_json::from_str("\"fortnightly\"").unwrap();
        assert_eq!(parsed, Frequency::Unknown);
        let parsed: Frequency = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(parsed, Frequency::Monthly);
        assert_eq!(serde_json::to_string(&Frequency::Weekly).unwrap(), "\"weekly\"");
    }

    #[test]
    fn frequency_parses_case_insensitively() {
        assert_eq!("Monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert!("hourly".parse::<Frequency>().is_err());
    }

    #[test]
    fn dates_round_trip_through_text() {
        assert_eq!(format_date(date(2024, 4, 5)), "2024-04-05");
        assert_eq!(parse_date("2024-04-05"), Some(date(2024, 4, 5)));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("05/04/2024"), None);
    }

    #[test]
    fn with_day_clamped_respects_month_length() {
        assert_eq!(with_day_clamped(date(2023, 2, 10), 31), date(2023, 2, 28));
        assert_eq!(with_day_clamped(date(2024, 4, 10), 5), date(2024, 4, 5));
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}
