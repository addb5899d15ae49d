mod game_day;
mod game_time;
mod trimmed_string;

pub use game_day::GameDay;
pub use game_time::GameTime;
pub use trimmed_string::TrimmedString;

/// A slash command argument that could not be parsed.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("{0}")]
pub struct ArgumentError(String);
