use time::macros::format_description;
use time::{format_description, OffsetDateTime, UtcOffset};

use super::{timestamp, TimestampStyle};

const UTC_FORMAT: &[format_description::FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute] UTC");

const ZONED_FORMAT: &[format_description::FormatItem<'_>] = format_description!(
    "[weekday repr:short] [year]-[month]-[day] [hour]:[minute] (UTC[offset_hour sign:mandatory]:[offset_minute])"
);

pub fn format_utc(date_time: OffsetDateTime) -> String {
    date_time
        .to_offset(UtcOffset::UTC)
        .format(UTC_FORMAT)
        .expect("Hard-coded format should be correct")
}

/// Formats an instant that is already converted to the local offset.
pub fn format_zoned(local: OffsetDateTime) -> String {
    local
        .format(ZONED_FORMAT)
        .expect("Hard-coded format should be correct")
}

pub fn format_local(date_time: OffsetDateTime) -> String {
    timestamp(date_time, TimestampStyle::LongDateTime)
}

/// `1 slot`, `2 slots`.
pub fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{format_utc, format_zoned, plural};

    #[test]
    fn utc() {
        assert_eq!(format_utc(datetime!(2024-01-04 19:30 -8)), "2024-01-05 03:30 UTC");
    }

    #[test]
    fn zoned() {
        assert_eq!(
            format_zoned(datetime!(2024-01-04 19:30 -8)),
            "Thu 2024-01-04 19:30 (UTC-08:00)"
        );
    }

    #[test]
    fn plurals() {
        assert_eq!(plural(1, "spot"), "1 spot");
        assert_eq!(plural(0, "spot"), "0 spots");
        assert_eq!(plural(3, "spot"), "3 spots");
    }
}
