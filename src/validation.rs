//! Shape and range checks for trigger requests.
//!
//! Everything here is pure: a batch either comes out as a list of
//! [`ValidatedGroup`]s or as the first [`ValidationError`] found, checking
//! groups in order and fields in the order start date, start time, end date,
//! end time.

use std::fmt;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::models::{GroupRequest, ValidatedGroup};

/// Largest batch accepted by a single trigger call.
pub const MAX_GROUPS: usize = 100;

static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$").expect("date pattern compiles")
});
static TIME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9])$").expect("time pattern compiles")
});

const GROUP_HOSTS: &[&str] = &["facebook.com", "www.facebook.com"];

/// Which end of the collection window a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Start => f.write_str("start"),
            Bound::End => f.write_str("end"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one group is required")]
    Empty,
    #[error("Maximum {} groups allowed", MAX_GROUPS)]
    TooMany,
    #[error("Invalid group entry at index {index}: {detail}")]
    Malformed { index: usize, detail: String },
    #[error("Each group must have a url")]
    MissingUrl,
    #[error("Invalid Facebook group URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid {0} date format. Use YYYY-MM-DD: {1}")]
    InvalidDate(Bound, String),
    #[error("Invalid {0} time format. Use HH:mm:ss: {1}")]
    InvalidTime(Bound, String),
    #[error("End datetime cannot be earlier than start datetime")]
    EndBeforeStart,
    #[error("Invalid status parameter")]
    InvalidStatus,
}

/// Validate a raw JSON trigger body.
///
/// Anything that is not a non-empty array is reported as [`ValidationError::Empty`],
/// the same answer a caller gets for `[]`.
pub fn validate_batch(body: Value) -> Result<Vec<ValidatedGroup>, ValidationError> {
    let Value::Array(entries) = body else {
        return Err(ValidationError::Empty);
    };
    check_batch_size(entries.len())?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let group: GroupRequest =
                serde_json::from_value(entry).map_err(|e| ValidationError::Malformed {
                    index,
                    detail: e.to_string(),
                })?;
            validate_group(group)
        })
        .collect()
}

fn check_batch_size(len: usize) -> Result<(), ValidationError> {
    if len == 0 {
        return Err(ValidationError::Empty);
    }
    if len > MAX_GROUPS {
        return Err(ValidationError::TooMany);
    }
    Ok(())
}

pub fn validate_group(group: GroupRequest) -> Result<ValidatedGroup, ValidationError> {
    let url = group.url.ok_or(ValidationError::MissingUrl)?;
    if !is_valid_group_url(&url) {
        return Err(ValidationError::InvalidUrl(url));
    }

    let validated = ValidatedGroup {
        url,
        start_date: checked_date(group.start_date.as_deref(), Bound::Start)?,
        start_time: checked_time(group.start_time.as_deref(), Bound::Start)?,
        end_date: checked_date(group.end_date.as_deref(), Bound::End)?,
        end_time: checked_time(group.end_time.as_deref(), Bound::End)?,
    };

    if let (Some(start), Some(end)) = (validated.start(), validated.end()) {
        if end < start {
            return Err(ValidationError::EndBeforeStart);
        }
    }

    Ok(validated)
}

fn checked_date(raw: Option<&str>, bound: Bound) -> Result<Option<NaiveDate>, ValidationError> {
    raw.map(|s| parse_date(s).ok_or_else(|| ValidationError::InvalidDate(bound, s.to_string())))
        .transpose()
}

fn checked_time(raw: Option<&str>, bound: Bound) -> Result<Option<NaiveTime>, ValidationError> {
    raw.map(|s| parse_time(s).ok_or_else(|| ValidationError::InvalidTime(bound, s.to_string())))
        .transpose()
}

/// Parse a strict `YYYY-MM-DD` date that also exists on the calendar.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if !DATE_SHAPE.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Parse a strict 24-hour `HH:MM:SS` time.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    if !TIME_SHAPE.is_match(raw) {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S").ok()
}

/// True for `http(s)://[www.]facebook.com/groups/<id>` with a non-empty id.
pub fn is_valid_group_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    if !url.host_str().is_some_and(|host| GROUP_HOSTS.contains(&host)) {
        return false;
    }

    let Some(mut segments) = url.path_segments() else {
        return false;
    };
    segments.next() == Some("groups") && segments.next().is_some_and(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(url: &str) -> GroupRequest {
        GroupRequest {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn dated(start_date: &str, end_date: &str) -> GroupRequest {
        GroupRequest {
            start_date: Some(start_date.to_string()),
            end_date: Some(end_date.to_string()),
            ..group("https://facebook.com/groups/rustaceans")
        }
    }

    #[test]
    fn accepts_batches_up_to_the_limit() {
        let one = json!([{ "url": "https://facebook.com/groups/1" }]);
        assert_eq!(validate_batch(one).unwrap().len(), 1);

        let full: Vec<Value> = (0..MAX_GROUPS)
            .map(|i| json!({ "url": format!("https://facebook.com/groups/{i}") }))
            .collect();
        assert_eq!(validate_batch(Value::Array(full)).unwrap().len(), MAX_GROUPS);
    }

    #[test]
    fn rejects_empty_oversized_and_non_array_bodies() {
        assert_eq!(validate_batch(json!([])), Err(ValidationError::Empty));
        assert_eq!(validate_batch(json!({ "url": "x" })), Err(ValidationError::Empty));
        assert_eq!(validate_batch(Value::Null), Err(ValidationError::Empty));

        let too_many: Vec<Value> = (0..=MAX_GROUPS)
            .map(|i| json!({ "url": format!("https://facebook.com/groups/{i}") }))
            .collect();
        assert_eq!(validate_batch(Value::Array(too_many)), Err(ValidationError::TooMany));
    }

    #[test]
    fn reports_malformed_entries_by_index() {
        let err = validate_batch(json!([
            { "url": "https://facebook.com/groups/1" },
            "https://facebook.com/groups/2",
        ]))
        .unwrap_err();

        assert!(matches!(err, ValidationError::Malformed { index: 1, .. }));
    }

    #[test]
    fn requires_a_url() {
        assert_eq!(
            validate_batch(json!([{ "start_date": "2024-01-10" }])),
            Err(ValidationError::MissingUrl)
        );
        assert_eq!(
            validate_batch(json!([{ "url": "" }])),
            Err(ValidationError::MissingUrl)
        );
    }

    #[test]
    fn group_urls() {
        assert!(is_valid_group_url("https://facebook.com/groups/rustaceans"));
        assert!(is_valid_group_url("https://www.facebook.com/groups/123456/"));
        assert!(is_valid_group_url("http://facebook.com/groups/abc/about"));

        assert!(!is_valid_group_url("https://facebook.com/groups/"));
        assert!(!is_valid_group_url("https://facebook.com/groups"));
        assert!(!is_valid_group_url("https://facebook.com/pages/rustaceans"));
        assert!(!is_valid_group_url("https://m.facebook.com/groups/rustaceans"));
        assert!(!is_valid_group_url("https://facebook.com.evil.io/groups/x"));
        assert!(!is_valid_group_url("ftp://facebook.com/groups/x"));
        assert!(!is_valid_group_url("facebook.com/groups/x"));

        assert_eq!(
            validate_group(group("https://example.com/groups/x")),
            Err(ValidationError::InvalidUrl("https://example.com/groups/x".to_string()))
        );
    }

    #[test]
    fn dates_must_be_well_formed_calendar_days() {
        assert!(parse_date("2024-02-29").is_some());
        assert!(parse_date("2024-02-30").is_none());
        assert!(parse_date("2023-02-29").is_none());
        assert!(parse_date("2024-1-05").is_none());
        assert!(parse_date("01-10-2024").is_none());
        assert!(parse_date("2024-13-01").is_none());
        assert!(parse_date("2024-01-10T00:00:00").is_none());

        let err = validate_group(GroupRequest {
            start_date: Some("2024-02-30".to_string()),
            ..group("https://facebook.com/groups/x")
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid start date format. Use YYYY-MM-DD: 2024-02-30"
        );
    }

    #[test]
    fn times_must_be_24_hour_with_seconds() {
        assert!(parse_time("00:00:00").is_some());
        assert!(parse_time("23:59:59").is_some());
        assert!(parse_time("24:00:00").is_none());
        assert!(parse_time("9:00:00").is_none());
        assert!(parse_time("09:00").is_none());
        assert!(parse_time("09:60:00").is_none());

        let err = validate_group(GroupRequest {
            end_date: Some("2024-01-10".to_string()),
            end_time: Some("25:00:00".to_string()),
            ..group("https://facebook.com/groups/x")
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidTime(Bound::End, "25:00:00".to_string()));
        assert_eq!(err.to_string(), "Invalid end time format. Use HH:mm:ss: 25:00:00");
    }

    #[test]
    fn end_may_not_precede_start() {
        assert_eq!(
            validate_group(dated("2024-01-10", "2024-01-05")),
            Err(ValidationError::EndBeforeStart)
        );

        // Same day is fine because the end defaults to 23:59:59.
        assert!(validate_group(dated("2024-01-10", "2024-01-10")).is_ok());

        let same_day_backwards = GroupRequest {
            start_time: Some("12:00:00".to_string()),
            end_time: Some("11:59:59".to_string()),
            ..dated("2024-01-10", "2024-01-10")
        };
        assert_eq!(
            validate_group(same_day_backwards),
            Err(ValidationError::EndBeforeStart)
        );
    }

    #[test]
    fn first_failing_field_wins() {
        let err = validate_group(GroupRequest {
            start_time: Some("bad".to_string()),
            end_date: Some("also-bad".to_string()),
            ..dated("2024-01-10", "2024-01-05")
        })
        .unwrap_err();

        assert_eq!(err, ValidationError::InvalidTime(Bound::Start, "bad".to_string()));
    }

    #[test]
    fn validated_group_keeps_parsed_fields() {
        let validated = validate_group(GroupRequest {
            start_time: Some("09:00:00".to_string()),
            ..dated("2024-01-10", "2024-01-12")
        })
        .unwrap();

        assert_eq!(validated.start_date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(validated.start_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(validated.end_date, NaiveDate::from_ymd_opt(2024, 1, 12));
        assert_eq!(validated.end_time, None);
    }
}
