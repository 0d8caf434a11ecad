//! Calendar months, used to page through expenses and to key budgets.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use time::{Date, Duration, Month, util::days_in_year_month};

/// A calendar month, represented by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first_day: Date,
}

impl YearMonth {
    /// The month that `date` falls in.
    pub fn containing(date: Date) -> Self {
        Self {
            first_day: date - Duration::days(i64::from(date.day()) - 1),
        }
    }

    /// Parse a month in the form "2025-01".
    pub fn parse(text: &str) -> Option<Self> {
        let (year, month) = text.trim().split_once('-')?;
        let year = year.parse::<i32>().ok()?;
        let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;

        Date::from_calendar_date(year, month, 1)
            .ok()
            .map(|first_day| Self { first_day })
    }

    pub fn first_day(&self) -> Date {
        self.first_day
    }

    /// The first day of the following month, i.e. the exclusive end of this month.
    pub fn end(&self) -> Date {
        self.next().first_day
    }

    pub fn next(&self) -> Self {
        let days = days_in_year_month(self.first_day.year(), self.first_day.month());

        Self {
            first_day: self.first_day + Duration::days(i64::from(days)),
        }
    }

    pub fn previous(&self) -> Self {
        Self::containing(self.first_day - Duration::days(1))
    }

    pub fn contains(&self, date: Date) -> bool {
        self.first_day <= date && date < self.end()
    }

    /// A human readable label, e.g. "January 2025".
    pub fn label(&self) -> String {
        format!("{} {}", self.first_day.month(), self.first_day.year())
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}",
            self.first_day.year(),
            u8::from(self.first_day.month())
        )
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;

        YearMonth::parse(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid month \"{text}\", want YYYY-MM")))
    }
}
