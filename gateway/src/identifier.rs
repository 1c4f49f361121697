//! Tender control numbers.
//!
//! The API identifies a tender as `{entity}-{segment}-{sequence}/{year}`, e.g.
//! `18428888000123-1-000178/2024`. The portal addresses the same tender as
//! `{entity}/{year}/{sequence}` with the sequence's leading zeros removed.

use url::Url;

/// Converts a control number into the portal path form.
///
/// Returns `None` for anything that is not exactly three `-` separated parts
/// whose last part holds a single `/` between a numeric sequence and a year.
pub fn to_web_path(identifier: &str) -> Option<String> {
    if !identifier.contains('-') || identifier.matches('/').count() != 1 {
        return None;
    }

    let parts: Vec<&str> = identifier.split('-').collect();
    let [entity, _segment, sequence_and_year] = parts.as_slice() else {
        return None;
    };

    let (sequence, year) = sequence_and_year.split_once('/')?;
    if entity.is_empty() || year.is_empty() {
        return None;
    }
    let sequence: u64 = sequence.parse().ok()?;

    Some(format!("{entity}/{year}/{sequence}"))
}

/// Full portal URL for a control number, when it can be converted.
pub fn web_url(portal_base: &Url, identifier: &str) -> Option<String> {
    let path = to_web_path(identifier)?;
    Some(format!(
        "{}/{}",
        portal_base.as_str().trim_end_matches('/'),
        path
    ))
}
