use async_trait::async_trait;
use serenity::all::{MessageId, ScheduledEventId, UserId};
use time::OffsetDateTime;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::actors::{Actor, ActorHandle, ActorStopped};

use super::{
    BoardMessage, GameSession, NewGameWeek, ReactionOutcome, ResetOutcome, Role, SessionError,
    SessionEvent, SetupOutcome, WeekOverview,
};

pub enum SessionCommand {
    Setup {
        new_week: NewGameWeek,
        now: OffsetDateTime,
    },
    AttachBoard {
        board: BoardMessage,
        event: Option<ScheduledEventId>,
    },
    AttachEvent(ScheduledEventId),
    AddReaction {
        message: MessageId,
        participant: UserId,
        role: Role,
    },
    RemoveReaction {
        message: MessageId,
        participant: UserId,
        role: Role,
    },
    Status,
    Reset {
        preserve_message: bool,
        now: OffsetDateTime,
    },
    CloseSignups {
        starts_at: OffsetDateTime,
    },
    Reopen {
        starts_at: OffsetDateTime,
        now: OffsetDateTime,
    },
    MarkReminded {
        starts_at: OffsetDateTime,
    },
    RolesOf(UserId),
}

#[derive(Debug)]
pub enum SessionReply {
    Setup(SetupOutcome),
    Overview(WeekOverview),
    Reaction(ReactionOutcome),
    Reset(ResetOutcome),
    Roles(Vec<Role>),
    Done,
}

#[async_trait]
impl Actor for GameSession {
    type Message = SessionCommand;
    type Response = Result<SessionReply, SessionError>;

    async fn handle_message(&mut self, message: SessionCommand) -> Self::Response {
        use SessionCommand::*;

        match message {
            Setup { new_week, now } => self.setup(new_week, now).map(SessionReply::Setup),
            AttachBoard { board, event } => self
                .attach_board(board, event)
                .map(SessionReply::Overview),
            AttachEvent(event) => self.attach_event(event).map(|_| SessionReply::Done),
            AddReaction {
                message,
                participant,
                role,
            } => self
                .add_reaction(message, participant, &role)
                .map(SessionReply::Reaction),
            RemoveReaction {
                message,
                participant,
                role,
            } => self
                .remove_reaction(message, participant, &role)
                .map(SessionReply::Reaction),
            Status => self.status().map(SessionReply::Overview),
            Reset {
                preserve_message,
                now,
            } => self.reset(preserve_message, now).map(SessionReply::Reset),
            CloseSignups { starts_at } => self.close_signups(starts_at).map(SessionReply::Overview),
            Reopen { starts_at, now } => self.reopen(starts_at, now).map(SessionReply::Overview),
            MarkReminded { starts_at } => self.mark_reminded(starts_at).map(|_| SessionReply::Done),
            RolesOf(participant) => self.roles_of(participant).map(SessionReply::Roles),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SessionHandleError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Stopped(#[from] ActorStopped),
    #[error("Unexpected reply from the game session: {0:?}")]
    UnexpectedReply(Box<SessionReply>),
}

fn unexpected(reply: SessionReply) -> SessionHandleError {
    SessionHandleError::UnexpectedReply(Box::new(reply))
}

/// Shared access to the game session; every call is serialized.
#[derive(Clone)]
pub struct SessionHandle {
    actor: ActorHandle<GameSession>,
    events: Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn spawn(session: GameSession) -> SessionHandle {
        let events = session.events();

        SessionHandle {
            actor: ActorHandle::spawn(session, "game_session"),
            events,
        }
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn request(&self, command: SessionCommand) -> Result<SessionReply, SessionHandleError> {
        Ok(self.actor.send(command).await??)
    }

    async fn request_overview(
        &self,
        command: SessionCommand,
    ) -> Result<WeekOverview, SessionHandleError> {
        match self.request(command).await? {
            SessionReply::Overview(overview) => Ok(overview),
            reply => Err(unexpected(reply)),
        }
    }

    async fn request_reaction(
        &self,
        command: SessionCommand,
    ) -> Result<ReactionOutcome, SessionHandleError> {
        match self.request(command).await? {
            SessionReply::Reaction(outcome) => Ok(outcome),
            reply => Err(unexpected(reply)),
        }
    }

    async fn request_done(&self, command: SessionCommand) -> Result<(), SessionHandleError> {
        match self.request(command).await? {
            SessionReply::Done => Ok(()),
            reply => Err(unexpected(reply)),
        }
    }

    pub async fn setup(
        &self,
        new_week: NewGameWeek,
        now: OffsetDateTime,
    ) -> Result<SetupOutcome, SessionHandleError> {
        match self.request(SessionCommand::Setup { new_week, now }).await? {
            SessionReply::Setup(outcome) => Ok(outcome),
            reply => Err(unexpected(reply)),
        }
    }

    pub async fn attach_board(
        &self,
        board: BoardMessage,
        event: Option<ScheduledEventId>,
    ) -> Result<WeekOverview, SessionHandleError> {
        self.request_overview(SessionCommand::AttachBoard { board, event })
            .await
    }

    pub async fn attach_event(&self, event: ScheduledEventId) -> Result<(), SessionHandleError> {
        self.request_done(SessionCommand::AttachEvent(event)).await
    }

    pub async fn add_reaction(
        &self,
        message: MessageId,
        participant: UserId,
        role: Role,
    ) -> Result<ReactionOutcome, SessionHandleError> {
        self.request_reaction(SessionCommand::AddReaction {
            message,
            participant,
            role,
        })
        .await
    }

    pub async fn remove_reaction(
        &self,
        message: MessageId,
        participant: UserId,
        role: Role,
    ) -> Result<ReactionOutcome, SessionHandleError> {
        self.request_reaction(SessionCommand::RemoveReaction {
            message,
            participant,
            role,
        })
        .await
    }

    pub async fn status(&self) -> Result<WeekOverview, SessionHandleError> {
        self.request_overview(SessionCommand::Status).await
    }

    pub async fn reset(
        &self,
        preserve_message: bool,
        now: OffsetDateTime,
    ) -> Result<ResetOutcome, SessionHandleError> {
        match self
            .request(SessionCommand::Reset {
                preserve_message,
                now,
            })
            .await?
        {
            SessionReply::Reset(outcome) => Ok(outcome),
            reply => Err(unexpected(reply)),
        }
    }

    pub async fn close_signups(
        &self,
        starts_at: OffsetDateTime,
    ) -> Result<WeekOverview, SessionHandleError> {
        self.request_overview(SessionCommand::CloseSignups { starts_at })
            .await
    }

    pub async fn reopen(
        &self,
        starts_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<WeekOverview, SessionHandleError> {
        self.request_overview(SessionCommand::Reopen { starts_at, now })
            .await
    }

    pub async fn mark_reminded(&self, starts_at: OffsetDateTime) -> Result<(), SessionHandleError> {
        self.request_done(SessionCommand::MarkReminded { starts_at })
            .await
    }

    pub async fn roles_of(&self, participant: UserId) -> Result<Vec<Role>, SessionHandleError> {
        match self.request(SessionCommand::RolesOf(participant)).await? {
            SessionReply::Roles(roles) => Ok(roles),
            reply => Err(unexpected(reply)),
        }
    }
}
