use std::sync::LazyLock;

use chrono::Weekday;
use itertools::iproduct;
use regex::Regex;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::days::{day_code, day_list};
use super::hours::{hour_range, Time};
use crate::error::ParseError;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

const APPOINTMENT: &str = "appointment";

/// One opening window. Always intra-day: `start_day == end_day` for parsed hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    #[serde(serialize_with = "serialize_day")]
    pub start_day: Weekday,
    #[serde(serialize_with = "serialize_day")]
    pub end_day: Weekday,
    pub start: Time,
    pub end: Time,
}

fn serialize_day<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(day_code(*day))
}

/// Hours field that says "call us" instead of listing opening times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub phone: Option<String>,
}

pub fn appointment_for(value: &str) -> Option<Appointment> {
    let value = value.trim();
    if !value.to_lowercase().starts_with(APPOINTMENT) {
        return None;
    }
    let phone = PHONE_RE
        .captures(value)
        .map(|caps| caps[1].to_string());
    Some(Appointment { phone })
}

/// Parse a full hours field into periods, in the order they were written.
pub fn hours_for(value: &str) -> Result<Vec<Period>, ParseError> {
    let value = value.trim().to_lowercase();
    if value.is_empty() || value.starts_with(APPOINTMENT) {
        return Ok(Vec::new());
    }

    let mut periods = Vec::new();
    for clause in value.split(';') {
        periods.extend(schedule(clause)?);
    }
    debug!(?periods, "parsed hours");
    Ok(periods)
}

/// Parse one `DayList HourRange(&HourRange)*` clause.
pub fn schedule(value: &str) -> Result<Vec<Period>, ParseError> {
    let value = value.trim();
    let Some((days, rest)) = value.split_once(' ') else {
        return Err(ParseError::MissingHours(value.to_string()));
    };

    let days = day_list(days)?;
    let ranges = rest
        .split('&')
        .map(hour_range)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(iproduct!(days, ranges)
        .map(|(day, (start, end))| Period {
            start_day: day,
            end_day: day,
            start,
            end,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Weekday::*;

    fn period(day: Weekday, start: (u32, u32), end: (u32, u32)) -> Period {
        Period {
            start_day: day,
            end_day: day,
            start: Time::new(start.0, start.1),
            end: Time::new(end.0, end.1),
        }
    }

    #[test]
    fn empty_field_has_no_hours() {
        assert!(hours_for("").unwrap().is_empty());
        assert!(hours_for("   ").unwrap().is_empty());
        assert_eq!(appointment_for(""), None);
    }

    #[test]
    fn appointment_with_phone() {
        let raw = "appointment (2101234567)";
        assert!(hours_for(raw).unwrap().is_empty());
        assert_eq!(
            appointment_for(raw),
            Some(Appointment {
                phone: Some("2101234567".into())
            })
        );
    }

    #[test]
    fn appointment_without_phone() {
        assert!(hours_for("Appointment only").unwrap().is_empty());
        assert_eq!(
            appointment_for("  APPOINTMENT only"),
            Some(Appointment { phone: None })
        );
    }

    #[test]
    fn phone_is_kept_verbatim() {
        let a = appointment_for("Appointment (+30 210 Ext. A)").unwrap();
        assert_eq!(a.phone.as_deref(), Some("+30 210 Ext. A"));
    }

    #[test]
    fn regular_hours_are_not_appointments() {
        assert_eq!(appointment_for("monday 9-5 (closed holidays)"), None);
    }

    #[test]
    fn cross_product_of_days_and_ranges() {
        let periods = hours_for("Mon,Wed 9:00am-1:00pm & 2:00pm-5:00pm").unwrap();
        assert_eq!(
            periods,
            vec![
                period(Mon, (9, 0), (13, 0)),
                period(Mon, (14, 0), (17, 0)),
                period(Wed, (9, 0), (13, 0)),
                period(Wed, (14, 0), (17, 0)),
            ]
        );
    }

    #[test]
    fn clauses_concatenate_in_order() {
        let periods = hours_for("Saturday-Sunday 10am-2pm; Friday 6pm-11:30pm").unwrap();
        assert_eq!(
            periods,
            vec![
                period(Sat, (10, 0), (14, 0)),
                period(Sun, (10, 0), (14, 0)),
                period(Fri, (18, 0), (23, 30)),
            ]
        );
    }

    #[test]
    fn wrapping_range_expands_to_single_days() {
        let periods = hours_for("friday-monday 9-5pm").unwrap();
        let days: Vec<Weekday> = periods.iter().map(|p| p.start_day).collect();
        assert_eq!(days, vec![Fri, Sat, Sun, Mon]);
        assert!(periods.iter().all(|p| p.start_day == p.end_day));
    }

    #[test]
    fn clause_without_hours_fails() {
        assert_eq!(
            hours_for("monday"),
            Err(ParseError::MissingHours("monday".into()))
        );
        // trailing separator leaves an empty clause behind
        assert!(hours_for("monday 9-5;").is_err());
    }

    #[test]
    fn bad_day_reports_token() {
        let err = hours_for("Mon,Holiday 9-5").unwrap_err();
        assert_eq!(err, ParseError::UnknownDay("holiday".into()));
        assert!(err.to_string().contains("holiday"));
    }

    #[test]
    fn bad_range_fails_whole_field() {
        assert!(hours_for("monday 9-5; tuesday 9 till 5").is_err());
    }

    #[test]
    fn serializes_storage_codes() {
        let json = serde_json::to_value(period(Thu, (8, 15), (12, 0))).unwrap();
        assert_eq!(json["start_day"], "thu");
        assert_eq!(json["end"]["hour"], 12);
    }
}
