use std::str::FromStr;

use time::Time;

use crate::game::{format_clock, parse_clock};

use super::ArgumentError;

const EXAMPLES: &str = "`19:30`, `7:30 PM`, `7pm`";

/// A wall clock time such as `7:30 PM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameTime(Time);

impl FromStr for GameTime {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_clock(s).map(GameTime).ok_or_else(|| {
            ArgumentError(format!(
                "Invalid time: `{}`.\nTime examples: {EXAMPLES}.",
                s.trim()
            ))
        })
    }
}

impl From<GameTime> for Time {
    fn from(value: GameTime) -> Self {
        value.0
    }
}

impl std::fmt::Display for GameTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_clock(self.0))
    }
}
