//! Reshapes validated groups into the body the trigger endpoint expects.

use chrono::{NaiveDate, NaiveTime};

use crate::models::{end_of_day, start_of_day, TriggerGroup, ValidatedGroup};

/// Offset appended to every submitted timestamp. User input is local Indian
/// Standard Time and is passed on as such, without shifting the clock.
pub const IST_OFFSET: &str = "+05:30";

/// Format a local date and time as `YYYY-MM-DDTHH:MM:SS+05:30`.
pub fn ist_timestamp(date: NaiveDate, time: NaiveTime) -> String {
    format!(
        "{}T{}{}",
        date.format("%Y-%m-%d"),
        time.format("%H:%M:%S"),
        IST_OFFSET
    )
}

pub fn to_trigger_group(group: &ValidatedGroup) -> TriggerGroup {
    TriggerGroup {
        url: group.url.clone(),
        start_date: group
            .start_date
            .map(|date| ist_timestamp(date, group.start_time.unwrap_or_else(start_of_day))),
        end_date: group
            .end_date
            .map(|date| ist_timestamp(date, group.end_time.unwrap_or_else(end_of_day))),
    }
}

pub fn to_trigger_payload(groups: &[ValidatedGroup]) -> Vec<TriggerGroup> {
    groups.iter().map(to_trigger_group).collect()
}
