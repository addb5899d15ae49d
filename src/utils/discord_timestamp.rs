use std::fmt::Display;

use time::OffsetDateTime;

/// How a Discord client renders a `<t:...>` timestamp in the reader's timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampStyle {
    /// Short date/time, e.g. `20 April 2021 16:20`
    ShortDateTime,
    /// Long date/time, e.g. `Tuesday, 20 April 2021 16:20`
    LongDateTime,
    /// Relative time, e.g. `in 2 days`
    RelativeTime,
}

impl Display for TimestampStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TimestampStyle::*;

        f.write_str(match self {
            ShortDateTime => "f",
            LongDateTime => "F",
            RelativeTime => "R",
        })
    }
}

pub fn timestamp(datetime: OffsetDateTime, style: TimestampStyle) -> String {
    let unix_timestamp = datetime.unix_timestamp();
    format!("<t:{unix_timestamp}:{style}>")
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{timestamp, TimestampStyle};

    #[test]
    fn long_date_time() {
        assert_eq!(
            timestamp(datetime!(2024-01-05 03:30 UTC), TimestampStyle::LongDateTime),
            "<t:1704425400:F>"
        );
    }

    #[test]
    fn offset_does_not_matter() {
        assert_eq!(
            timestamp(datetime!(2024-01-04 19:30 -8), TimestampStyle::RelativeTime),
            "<t:1704425400:R>"
        );
    }
}
