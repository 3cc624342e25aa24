use chrono::{Datelike, Days, NaiveDate, Weekday};

/// How far back a price lookup may roll before giving up
pub const MAX_LOOKBACK_DAYS: u64 = 10;

/// Market calendar utilities for handling weekends
pub struct MarketCalendar;

impl MarketCalendar {
    /// Weekday check only; exchange holidays are resolved by the price data
    /// itself (a holiday simply has no bar).
    pub fn is_trading_day(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Get the most recent trading day on or before the given date.
    /// `None` when that day would fall before `NaiveDate::MIN`.
    pub fn last_trading_day(date: NaiveDate) -> Option<NaiveDate> {
        let mut current_date = date;
        while !Self::is_trading_day(current_date) {
            current_date = current_date.checked_sub_days(Days::new(1))?;
        }
        Some(current_date)
    }

    /// Date window to request when resolving a price on `date`
    pub fn lookback_window(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let start = date.checked_sub_days(Days::new(MAX_LOOKBACK_DAYS))?;
        Some((start, date))
    }
}
