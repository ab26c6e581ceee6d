use chrono::Weekday;

use crate::error::ParseError;

/// Canonical week order with the full and storage spelling of each day.
const WEEK: [(Weekday, &str, &str); 7] = [
    (Weekday::Mon, "monday", "mon"),
    (Weekday::Tue, "tuesday", "tue"),
    (Weekday::Wed, "wednesday", "wed"),
    (Weekday::Thu, "thursday", "thu"),
    (Weekday::Fri, "friday", "fri"),
    (Weekday::Sat, "saturday", "sat"),
    (Weekday::Sun, "sunday", "sun"),
];

/// Storage code for a day (`mon` .. `sun`), as the `opening_hours` table expects it.
pub fn day_code(day: Weekday) -> &'static str {
    WEEK[day.num_days_from_monday() as usize].2
}

/// Reduce a day string to its enum by its first three letters.
pub fn day_enum_for(value: &str) -> Result<Weekday, ParseError> {
    let lower = value.trim().to_lowercase();
    let prefix: String = lower.chars().take(3).collect();
    WEEK.iter()
        .find(|(_, _, code)| *code == prefix)
        .map(|(day, _, _)| *day)
        .ok_or_else(|| ParseError::UnknownDay(value.trim().to_string()))
}

/// Exact day name: full English name or its three-letter code, any case.
fn day_named(token: &str) -> Option<Weekday> {
    let token = token.trim().to_lowercase();
    let day = day_enum_for(&token).ok()?;
    let (_, full, code) = WEEK[day.num_days_from_monday() as usize];
    (token == full || token == code).then_some(day)
}

/// Resolve a day list (`mon,wed` or `friday-monday`) to explicit days.
///
/// Ranges are inclusive and wrap past Sunday when the end comes before the start.
pub fn day_list(value: &str) -> Result<Vec<Weekday>, ParseError> {
    let value: String = value.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some((start, end)) = value.split_once('-') {
        let (Some(first), Some(last)) = (day_named(start), day_named(end)) else {
            return Err(ParseError::UnknownDayRange {
                start: start.to_lowercase(),
                end: end.to_lowercase(),
            });
        };
        let mut days = vec![first];
        let mut day = first;
        while day != last {
            day = day.succ();
            days.push(day);
        }
        return Ok(days);
    }

    value
        .split(',')
        .map(|token| day_named(token).ok_or_else(|| ParseError::UnknownDay(token.to_lowercase())))
        .collect()
}
