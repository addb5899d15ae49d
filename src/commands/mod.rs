pub mod arguments;

mod debug;
mod game;

use crate::{
    game::{SessionError, SessionHandleError},
    signup_board::BoardError,
    BotState,
};

pub use debug::{check_permissions, debug_players, ping, time_debug};
pub use game::{game_status, reset_game, reset_signups, setup_game};

type CommandResult = Result<(), CommandError>;
type Context<'a> = poise::Context<'a, BotState, CommandError>;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("{message}")]
    User { message: String },
    #[error("{message}")]
    Internal { message: String },
    #[error(transparent)]
    Serenity(#[from] serenity::Error),
}

fn user_err(message: impl Into<String>) -> CommandError {
    CommandError::User {
        message: message.into(),
    }
}

fn internal_err(message: impl Into<String>) -> CommandError {
    CommandError::Internal {
        message: message.into(),
    }
}

impl From<SessionError> for CommandError {
    fn from(err: SessionError) -> Self {
        user_err(err.to_string())
    }
}

impl From<SessionHandleError> for CommandError {
    fn from(err: SessionHandleError) -> Self {
        match err {
            SessionHandleError::Session(err) => err.into(),
            err => internal_err(err.to_string()),
        }
    }
}

impl From<BoardError> for CommandError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::Discord(err) => CommandError::Serenity(err),
            err => internal_err(err.to_string()),
        }
    }
}
