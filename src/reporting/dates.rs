use chrono::{Days, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const STATISTICS_DEFAULT_DAYS: u64 = 7;
pub const TRENDS_DEFAULT_DAYS: u64 = 30;

pub const INVALID_DATE_MESSAGE: &str = "Formato de fecha inválido. Use AAAA-MM-DD.";
pub const START_AFTER_END_MESSAGE: &str =
    "La fecha de inicio no puede ser posterior a la fecha de fin.";

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The `days` calendar days ending with `today`, both ends included.
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(today);
        Self { start, end: today }
    }

    pub fn start_str(&self) -> String {
        format_date(self.start)
    }

    pub fn end_str(&self) -> String {
        format_date(self.end)
    }

    pub fn contains(&self, date: &str) -> bool {
        let (start, end) = (self.start_str(), self.end_str());
        date >= start.as_str() && date <= end.as_str()
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// A requested range after falling back to the default window. `warning` carries
/// the message to show when the request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    pub range: DateRange,
    pub warning: Option<&'static str>,
}

/// Parses a user supplied range. Missing bounds silently select the default window,
/// malformed dates or a start after the end select it with a warning.
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
    default_days: u64,
) -> ResolvedRange {
    let fallback = DateRange::last_days(today, default_days);

    let (Some(start), Some(end)) = (
        start.map(str::trim).filter(|s| !s.is_empty()),
        end.map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return ResolvedRange {
            range: fallback,
            warning: None,
        };
    };

    match (
        NaiveDate::parse_from_str(start, DATE_FORMAT),
        NaiveDate::parse_from_str(end, DATE_FORMAT),
    ) {
        (Ok(start), Ok(end)) if start > end => ResolvedRange {
            range: fallback,
            warning: Some(START_AFTER_END_MESSAGE),
        },
        (Ok(start), Ok(end)) => ResolvedRange {
            range: DateRange { start, end },
            warning: None,
        },
        _ => ResolvedRange {
            range: fallback,
            warning: Some(INVALID_DATE_MESSAGE),
        },
    }
}
