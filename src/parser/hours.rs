use serde::Serialize;

use crate::error::ParseError;

/// Time of day on a 24-hour clock. Hours are not range checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Time {
    pub hour: u32,
    pub minute: u32,
}

impl Time {
    pub fn new(hour: u32, minute: u32) -> Self {
        Time { hour, minute }
    }
}

/// Parse `H[:MM][am|pm]`.
///
/// A trailing `pm` adds 12 to the hour, so `12pm` comes out as hour 24.
// TODO: confirm with the data owners whether `12pm` should mean noon (12) before changing this.
pub fn parse_hour(value: &str) -> Result<Time, ParseError> {
    let lower = value.trim().to_lowercase();
    let pm = lower.ends_with("pm");
    let digits = lower.replace("am", "").replace("pm", "");
    let invalid = || ParseError::InvalidHour(value.trim().to_string());

    let (hour, minute) = match digits.split_once(':') {
        Some((h, m)) => (
            h.trim().parse::<u32>().map_err(|_| invalid())?,
            m.trim().parse::<u32>().map_err(|_| invalid())?,
        ),
        None => (digits.trim().parse::<u32>().map_err(|_| invalid())?, 0),
    };

    let hour = if pm {
        hour.checked_add(12).ok_or_else(invalid)?
    } else {
        hour
    };
    Ok(Time::new(hour, minute))
}

/// Parse `X-Y` into its start and end times. Spaces anywhere are ignored.
pub fn hour_range(value: &str) -> Result<(Time, Time), ParseError> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let parts: Vec<&str> = compact.split('-').collect();
    let [start, end] = parts.as_slice() else {
        return Err(ParseError::MissingRangeSeparator(compact.clone()));
    };
    Ok((parse_hour(start)?, parse_hour(end)?))
}
