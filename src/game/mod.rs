mod error;
mod role;
mod schedule;
mod session;
mod session_actor;
mod tally;

pub use error::SessionError;
pub use role::{
    Role, RoleCategory, MAIN_PARTY_EMOJIS, MAIN_PLAYER_EMOJI, SPECTATOR_EMOJI, STORYTELLER_EMOJI,
    TRAVELER_EMOJI, TRAVELER_PARTY_EMOJIS,
};
pub use schedule::{format_clock, parse_clock, GameSchedule};
pub use session::{
    BoardMessage, GameSession, NewGameWeek, ReactionOutcome, ResetOutcome, SessionEvent,
    SetupOutcome, WeekOverview, WeekStatus,
};
pub use session_actor::{SessionHandle, SessionHandleError};
pub use tally::{CapacityLimits, RemoveOutcome, SignupTally, SlotEntry, TallySnapshot};
