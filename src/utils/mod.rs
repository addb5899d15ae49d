mod discord_timestamp;
pub mod formatting;
pub mod retry;

pub use discord_timestamp::{timestamp, TimestampStyle};
