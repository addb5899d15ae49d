use serde::Deserialize;
use time::{Duration, Time, Weekday};

use crate::{
    commands::arguments::GameDay,
    game::{parse_clock, CapacityLimits, GameSchedule},
};

/// Raw configuration, read from the environment.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub discord_bot_token: String,
    pub register_commands_globally: Option<bool>,
    pub register_commands_in_guilds: Option<Vec<u64>>,

    pub max_main_players: Option<u32>,
    pub max_travelers: Option<u32>,
    pub max_storytellers: Option<u32>,

    pub default_timezone: Option<String>,
    pub default_game_day: Option<String>,
    pub default_game_time: Option<String>,
    pub game_location: Option<String>,
    pub game_duration_hours: Option<u32>,
    pub reminder_lead_hours: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroCapacity { name: &'static str },
    #[error("DEFAULT_GAME_DAY `{0}` is not a weekday")]
    InvalidDay(String),
    #[error("DEFAULT_GAME_TIME `{0}` is not a time like `19:30` or `7:30 PM`")]
    InvalidTime(String),
    #[error("DEFAULT_TIMEZONE is invalid: {0}")]
    InvalidTimezone(String),
    #[error("GAME_DURATION_HOURS must be between 1 and 24")]
    InvalidDuration,
}

/// Validated game settings, immutable once the bot is running.
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub limits: CapacityLimits,
    pub default_day: Weekday,
    pub default_time: Time,
    pub default_timezone: String,
    pub location: String,
    pub game_duration: Duration,
    pub reminder_lead: Duration,
}

impl GameConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<GameConfig, ConfigError> {
        let capacity = |value: Option<u32>, default: u32, name: &'static str| {
            match value.unwrap_or(default) {
                0 => Err(ConfigError::ZeroCapacity { name }),
                value => Ok(value),
            }
        };

        let limits = CapacityLimits {
            storytellers: capacity(config.max_storytellers, 1, "MAX_STORYTELLERS")?,
            main_players: capacity(config.max_main_players, 15, "MAX_MAIN_PLAYERS")?,
            travelers: capacity(config.max_travelers, 5, "MAX_TRAVELERS")?,
        };

        let default_day = match &config.default_game_day {
            Some(day) => GameDay::from_name(day)
                .ok_or_else(|| ConfigError::InvalidDay(day.clone()))?
                .into(),
            None => Weekday::Thursday,
        };

        let default_time = match &config.default_game_time {
            Some(time) => parse_clock(time).ok_or_else(|| ConfigError::InvalidTime(time.clone()))?,
            None => Time::from_hms(19, 30, 0).map_err(|_| ConfigError::InvalidTime("19:30".into()))?,
        };

        let default_timezone = config
            .default_timezone
            .clone()
            .unwrap_or_else(|| "America/Los_Angeles".to_owned());
        GameSchedule::new(default_day, default_time, &default_timezone)
            .map_err(|err| ConfigError::InvalidTimezone(err.to_string()))?;

        let game_duration = match config.game_duration_hours.unwrap_or(3) {
            hours @ 1..=24 => Duration::hours(hours as i64),
            _ => return Err(ConfigError::InvalidDuration),
        };

        Ok(GameConfig {
            limits,
            default_day,
            default_time,
            default_timezone,
            location: config
                .game_location
                .clone()
                .unwrap_or_else(|| "Voice Channel".to_owned()),
            game_duration,
            reminder_lead: Duration::hours(config.reminder_lead_hours.unwrap_or(24) as i64),
        })
    }
}
