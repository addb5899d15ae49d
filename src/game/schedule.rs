use std::fmt::{Debug, Display};

use lazy_regex::regex_captures;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, Weekday};
use time_tz::{timezones, OffsetDateTimeExt, Tz};

use super::SessionError;

/// When the weekly game happens, in the organizers' timezone.
#[derive(Clone)]
pub struct GameSchedule {
    day: Weekday,
    time: Time,
    timezone: &'static Tz,
    timezone_name: String,
}

impl GameSchedule {
    pub fn new(day: Weekday, time: Time, timezone: &str) -> Result<GameSchedule, SessionError> {
        let timezone_name = timezone.trim();
        let timezone = timezones::get_by_name(timezone_name)
            .ok_or_else(|| SessionError::InvalidTimezone(timezone_name.to_owned()))?;

        Ok(GameSchedule {
            day,
            time,
            timezone,
            timezone_name: timezone_name.to_owned(),
        })
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn timezone_name(&self) -> &str {
        &self.timezone_name
    }

    pub fn to_local(&self, instant: OffsetDateTime) -> OffsetDateTime {
        instant.to_timezone(self.timezone)
    }

    /// The first game start strictly after `now`.
    pub fn next_start(&self, now: OffsetDateTime) -> OffsetDateTime {
        let today = self.to_local(now).date();
        let days_ahead = (self.day.number_days_from_monday() as i64
            - today.weekday().number_days_from_monday() as i64)
            .rem_euclid(7);

        let candidate = self.localize(today + Duration::days(days_ahead));
        if candidate > now {
            candidate
        } else {
            self.localize(today + Duration::days(days_ahead + 7))
        }
    }

    /// Resolves the configured local time on `date` to an absolute instant.
    fn localize(&self, date: Date) -> OffsetDateTime {
        let local = PrimitiveDateTime::new(date, self.time);

        // The offset at the guessed instant settles after two passes, DST
        // transitions included.
        let guess = local.assume_offset(self.to_local(local.assume_utc()).offset());
        local.assume_offset(self.to_local(guess).offset())
    }
}

impl Debug for GameSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSchedule")
            .field("day", &self.day)
            .field("time", &self.time)
            .field("timezone", &self.timezone_name)
            .finish()
    }
}

impl PartialEq for GameSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.day == other.day
            && self.time == other.time
            && self.timezone_name == other.timezone_name
    }
}

impl Eq for GameSchedule {}

impl Display for GameSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}s at {} ({})",
            self.day,
            format_clock(self.time),
            self.timezone_name
        )
    }
}

/// Parses `19:30`, `7:30 PM`, `7:30pm` or `7pm`.
pub fn parse_clock(input: &str) -> Option<Time> {
    let (_, hour, minute, meridiem) =
        regex_captures!(r"^(\d{1,2})(?::(\d{2}))?\s*([AaPp][Mm])?$", input.trim())?;

    let hour: u8 = hour.parse().ok()?;
    let minute: u8 = if minute.is_empty() {
        0
    } else {
        minute.parse().ok()?
    };

    let hour = match meridiem.to_ascii_lowercase().as_str() {
        "" => hour,
        _ if !(1..=12).contains(&hour) => return None,
        "am" => hour % 12,
        _ => hour % 12 + 12,
    };

    Time::from_hms(hour, minute, 0).ok()
}

/// Formats a time like `7:30 PM`.
pub fn format_clock(time: Time) -> String {
    let (hour, minute) = (time.hour(), time.minute());
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let hour = match hour % 12 {
        0 => 12,
        h => h,
    };

    format!("{hour}:{minute:02} {meridiem}")
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use time::{macros::datetime, macros::time, Weekday};

    use super::{format_clock, parse_clock, GameSchedule};
    use crate::game::SessionError;

    fn thursday_evening_la() -> GameSchedule {
        GameSchedule::new(Weekday::Thursday, time!(19:30), "America/Los_Angeles").unwrap()
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let err = GameSchedule::new(Weekday::Thursday, time!(19:30), "America/Springfield")
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTimezone("America/Springfield".to_owned())
        );
    }

    #[test]
    fn next_start_in_winter() {
        let schedule = thursday_evening_la();
        assert_eq!(
            schedule.next_start(datetime!(2024-01-01 00:00 UTC)),
            datetime!(2024-01-05 03:30 UTC)
        );
    }

    #[test]
    fn next_start_in_summer() {
        let schedule = thursday_evening_la();
        assert_eq!(
            schedule.next_start(datetime!(2024-07-01 12:00 UTC)),
            datetime!(2024-07-05 02:30 UTC)
        );
    }

    #[test]
    fn next_start_later_the_same_day() {
        let schedule = thursday_evening_la();
        // Thursday 2024-01-04 18:00 PST
        assert_eq!(
            schedule.next_start(datetime!(2024-01-05 02:00 UTC)),
            datetime!(2024-01-05 03:30 UTC)
        );
    }

    #[test]
    fn next_start_after_the_game_moves_a_week() {
        let schedule = thursday_evening_la();
        assert_eq!(
            schedule.next_start(datetime!(2024-01-05 03:30 UTC)),
            datetime!(2024-01-12 03:30 UTC)
        );
    }

    #[test]
    fn next_start_across_dst_change() {
        let schedule = thursday_evening_la();
        // DST starts on 2024-03-10 in Los Angeles.
        assert_eq!(
            schedule.next_start(datetime!(2024-03-08 12:00 UTC)),
            datetime!(2024-03-15 02:30 UTC)
        );
    }

    #[test]
    fn local_day_differs_from_utc_day() {
        let schedule =
            GameSchedule::new(Weekday::Monday, time!(09:00), "Pacific/Auckland").unwrap();
        // Sunday 2024-06-09 22:00 UTC is already Monday 10:00 in Auckland.
        assert_eq!(
            schedule.next_start(datetime!(2024-06-09 22:00 UTC)),
            datetime!(2024-06-16 21:00 UTC)
        );
    }

    #[test]
    fn parses_clock_times() {
        assert_eq!(parse_clock("19:30"), Some(time!(19:30)));
        assert_eq!(parse_clock("7:30 PM"), Some(time!(19:30)));
        assert_eq!(parse_clock("7:30pm"), Some(time!(19:30)));
        assert_eq!(parse_clock("7pm"), Some(time!(19:00)));
        assert_eq!(parse_clock("12 am"), Some(time!(00:00)));
        assert_eq!(parse_clock("12:15 PM"), Some(time!(12:15)));
        assert_eq!(parse_clock(" 8 "), Some(time!(08:00)));
    }

    #[test]
    fn rejects_bad_clock_times() {
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("7:61"), None);
        assert_eq!(parse_clock("13 PM"), None);
        assert_eq!(parse_clock("0 AM"), None);
        assert_eq!(parse_clock("half past seven"), None);
    }

    #[test]
    fn formats_clock_times() {
        assert_eq!(format_clock(time!(19:30)), "7:30 PM");
        assert_eq!(format_clock(time!(00:05)), "12:05 AM");
        assert_eq!(format_clock(time!(12:00)), "12:00 PM");
    }

    #[test]
    fn displays_schedule() {
        assert_eq!(
            thursday_evening_la().to_string(),
            "Thursdays at 7:30 PM (America/Los_Angeles)"
        );
    }
}
