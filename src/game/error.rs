use super::RoleCategory;

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not enough {category} spots: requested {requested}, {available} available")]
    CapacityExceeded {
        category: RoleCategory,
        requested: u32,
        available: u32,
    },
    #[error("`{0}` is not a valid IANA timezone, try something like `America/Los_Angeles`")]
    InvalidTimezone(String),
    #[error("There is no active game. Use `/setup_game` to create one.")]
    NoActiveGame,
    #[error("A game is already open. Use `/reset_game` before setting up a new one.")]
    GameAlreadyOpen,
    #[error("Signups for this week's game are closed.")]
    SignupsClosed,
}
