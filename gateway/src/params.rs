use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use thiserror::Error;

/// Query parameters sent upstream, ordered by name.
pub type QueryParams = BTreeMap<String, String>;

/// Date format the procurement API expects.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Smallest page the procurement API accepts for paged listings.
pub const MIN_PAGE_SIZE: u32 = 10;

/// Length of the default query window ending today.
pub const LOOKBACK_DAYS: u64 = 30;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD or YYYYMMDD")]
    InvalidDate(String),

    #[error("invalid number for {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("invalid path {0:?}")]
    InvalidPath(String),
}

/// Treats blank parameters the same as absent ones.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Normalizes a caller-supplied date to `YYYYMMDD`.
///
/// Dashed values must be `YYYY-MM-DD`; undashed values must be eight digits.
/// Either way the date has to exist on the calendar. A missing value yields
/// `default`.
pub fn normalize_date(value: Option<&str>, default: NaiveDate) -> Result<String, ParamError> {
    let Some(value) = non_empty(value) else {
        return Ok(default.format(DATE_FORMAT).to_string());
    };

    let invalid = || ParamError::InvalidDate(value.to_string());

    let date = if value.contains('-') {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?
    } else {
        if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = |range: std::ops::Range<usize>| value[range].parse::<u32>().ok();
        let (Some(year), Some(month), Some(day)) = (number(0..4), number(4..6), number(6..8))
        else {
            return Err(invalid());
        };
        NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(invalid)?
    };

    Ok(date.format(DATE_FORMAT).to_string())
}

/// Raises the requested page size to at least `minimum`.
pub fn normalize_page_size(value: Option<u32>, minimum: u32) -> u32 {
    value.unwrap_or(minimum).max(minimum)
}

pub fn parse_number(name: &'static str, value: Option<&str>) -> Result<Option<u32>, ParamError> {
    non_empty(value)
        .map(|v| {
            v.parse().map_err(|_| ParamError::InvalidNumber {
                name,
                value: v.to_string(),
            })
        })
        .transpose()
}

/// The `[today - 30 days, today]` window used when no dates are given.
pub fn default_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(LOOKBACK_DAYS))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

/// Accepts a caller-supplied path only if it stays below the base it is joined to.
///
/// The URL parser treats percent-encoded dots, backslashes and embedded tabs or
/// newlines as dot-segments or separators, so `%`, `\` and control characters
/// are refused outright along with `?`, `#` and literal `.`/`..` segments.
pub fn check_path(path: &str) -> Result<(), ParamError> {
    let forbidden_char = path
        .chars()
        .any(|c| matches!(c, '?' | '#' | '%' | '\\') || c.is_control());
    let climbs = path
        .split('/')
        .any(|segment| segment == ".." || segment == ".");
    if path.is_empty() || forbidden_char || climbs {
        return Err(ParamError::InvalidPath(path.to_string()));
    }
    Ok(())
}
