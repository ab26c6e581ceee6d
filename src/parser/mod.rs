//! Opening-hours mini language.
//!
//! ```text
//! HoursField    -> "appointment" ["(" Phone ")"] | ScheduleList | ""
//! ScheduleList  -> Schedule (";" Schedule)*
//! Schedule      -> DayList " " HourRangeList
//! HourRangeList -> HourRange ("&" HourRange)*
//! DayList       -> WeekDay ("," WeekDay)* | WeekDay "-" WeekDay
//! HourRange     -> Hour "-" Hour
//! Hour          -> H [":" MM] ("am"|"pm")?
//! ```

pub mod days;
pub mod hours;
pub mod schedule;

pub use days::day_code;
pub use schedule::{appointment_for, hours_for, Period};
