use serenity::all::{ChannelId, GuildId, MessageId, ScheduledEventId, UserId};
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use super::{CapacityLimits, GameSchedule, RemoveOutcome, Role, SessionError, SignupTally, TallySnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeekStatus {
    Open,
    /// The game has started; reactions are no longer accepted.
    Closed,
}

/// Where the signup board message lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardMessage {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub message: MessageId,
}

#[derive(Clone, Debug)]
pub struct NewGameWeek {
    pub schedule: GameSchedule,
    pub location: String,
}

#[derive(Debug)]
struct GameWeek {
    schedule: GameSchedule,
    location: String,
    status: WeekStatus,
    starts_at: OffsetDateTime,
    reminded: bool,
    board: Option<BoardMessage>,
    event: Option<ScheduledEventId>,
    tally: SignupTally,
}

impl GameWeek {
    fn reopen(&mut self, now: OffsetDateTime) {
        self.tally.clear();
        self.status = WeekStatus::Open;
        self.reminded = false;
        self.starts_at = self.schedule.next_start(now);
    }
}

/// Everything needed to render the board or answer a status query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekOverview {
    pub schedule: GameSchedule,
    pub location: String,
    pub status: WeekStatus,
    pub starts_at: OffsetDateTime,
    pub reminded: bool,
    pub board: Option<BoardMessage>,
    pub event: Option<ScheduledEventId>,
    pub snapshot: TallySnapshot,
    /// Grows with every change, across weeks; a higher revision is newer.
    pub revision: u64,
}

impl WeekOverview {
    pub fn ends_at(&self, duration: Duration) -> OffsetDateTime {
        self.starts_at + duration
    }

    /// The Discord event of this week, with the guild it was created in.
    pub fn discord_event(&self) -> Option<(GuildId, ScheduledEventId)> {
        Some((self.board?.guild, self.event?))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// Not a reaction on the current signup board.
    Ignored,
    Added(WeekOverview),
    Removed {
        overview: WeekOverview,
        evicted: Vec<Role>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupOutcome {
    pub overview: WeekOverview,
    /// The closed week that the new one replaced.
    pub replaced: Option<WeekOverview>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetOutcome {
    /// The discarded week when the message was not preserved, otherwise the
    /// reopened one.
    pub overview: WeekOverview,
    pub preserved: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    ScheduleChanged,
}

/// The signup state of the running bot.
///
/// Holds at most one game week.
#[derive(Debug)]
pub struct GameSession {
    limits: CapacityLimits,
    week: Option<GameWeek>,
    revision: u64,
    events: Sender<SessionEvent>,
}

impl GameSession {
    pub fn new(limits: CapacityLimits) -> GameSession {
        GameSession {
            limits,
            week: None,
            revision: 0,
            events: broadcast::channel(16).0,
        }
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> Sender<SessionEvent> {
        self.events.clone()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn notify(&self) {
        let _ = self.events.send(SessionEvent::ScheduleChanged); // Nobody listening is fine
    }

    pub fn setup(
        &mut self,
        new_week: NewGameWeek,
        now: OffsetDateTime,
    ) -> Result<SetupOutcome, SessionError> {
        if self
            .week
            .as_ref()
            .is_some_and(|week| week.status == WeekStatus::Open)
        {
            return Err(SessionError::GameAlreadyOpen);
        }

        let replaced = self.status().ok();
        if let Some(replaced) = &replaced {
            warn!("Replacing the closed game that started at {}", replaced.starts_at);
        }

        let starts_at = new_week.schedule.next_start(now);
        info!(
            "Setting up a game for {} starting at {starts_at}",
            new_week.schedule
        );

        self.week = Some(GameWeek {
            schedule: new_week.schedule,
            location: new_week.location,
            status: WeekStatus::Open,
            starts_at,
            reminded: false,
            board: None,
            event: None,
            tally: SignupTally::new(self.limits),
        });
        self.touch();
        self.notify();

        Ok(SetupOutcome {
            overview: self.status()?,
            replaced,
        })
    }

    pub fn attach_board(
        &mut self,
        board: BoardMessage,
        event: Option<ScheduledEventId>,
    ) -> Result<WeekOverview, SessionError> {
        let week = self.week.as_mut().ok_or(SessionError::NoActiveGame)?;
        week.board = Some(board);
        week.event = event.or(week.event);
        self.touch();
        // The reminder can only be posted once the board exists.
        self.notify();
        self.status()
    }

    pub fn attach_event(&mut self, event: ScheduledEventId) -> Result<(), SessionError> {
        let week = self.week.as_mut().ok_or(SessionError::NoActiveGame)?;
        week.event = Some(event);
        self.touch();
        Ok(())
    }

    fn week_for_board(&mut self, message: MessageId) -> Option<&mut GameWeek> {
        self.week
            .as_mut()
            .filter(|week| week.board.is_some_and(|board| board.message == message))
    }

    pub fn add_reaction(
        &mut self,
        message: MessageId,
        participant: UserId,
        role: &Role,
    ) -> Result<ReactionOutcome, SessionError> {
        let Some(week) = self.week_for_board(message) else {
            debug!("Ignoring reaction on message {message} which is not the signup board");
            return Ok(ReactionOutcome::Ignored);
        };

        if week.status == WeekStatus::Closed {
            return Err(SessionError::SignupsClosed);
        }

        week.tally.add_reaction(participant, role)?;
        self.touch();
        Ok(ReactionOutcome::Added(self.status()?))
    }

    pub fn remove_reaction(
        &mut self,
        message: MessageId,
        participant: UserId,
        role: &Role,
    ) -> Result<ReactionOutcome, SessionError> {
        let Some(week) = self.week_for_board(message) else {
            debug!("Ignoring reaction removal on message {message} which is not the signup board");
            return Ok(ReactionOutcome::Ignored);
        };

        let RemoveOutcome { evicted } = week.tally.remove_reaction(participant, role);
        self.touch();
        Ok(ReactionOutcome::Removed {
            overview: self.status()?,
            evicted,
        })
    }

    pub fn status(&self) -> Result<WeekOverview, SessionError> {
        let week = self.week.as_ref().ok_or(SessionError::NoActiveGame)?;

        Ok(WeekOverview {
            schedule: week.schedule.clone(),
            location: week.location.clone(),
            status: week.status,
            starts_at: week.starts_at,
            reminded: week.reminded,
            board: week.board,
            event: week.event,
            snapshot: week.tally.snapshot(),
            revision: self.revision,
        })
    }

    /// Clears all signups.
    ///
    /// With `preserve_message` the week reopens for its next occurrence and
    /// keeps routing reactions from the same board; otherwise it is discarded.
    pub fn reset(
        &mut self,
        preserve_message: bool,
        now: OffsetDateTime,
    ) -> Result<ResetOutcome, SessionError> {
        if self.week.is_none() {
            return Err(SessionError::NoActiveGame);
        }

        let outcome = if preserve_message {
            if let Some(week) = self.week.as_mut() {
                week.reopen(now);
                info!("Signups reset, next game starts at {}", week.starts_at);
            }
            self.touch();

            ResetOutcome {
                overview: self.status()?,
                preserved: true,
            }
        } else {
            let overview = self.status()?;
            self.week = None;
            self.touch();
            info!("Game reset");

            ResetOutcome {
                overview,
                preserved: false,
            }
        };

        self.notify();
        Ok(outcome)
    }

    /// Closes signups of the week starting at `starts_at`, if it is still the
    /// current one.
    pub fn close_signups(&mut self, starts_at: OffsetDateTime) -> Result<WeekOverview, SessionError> {
        let week = self.week.as_mut().ok_or(SessionError::NoActiveGame)?;
        if week.starts_at == starts_at && week.status == WeekStatus::Open {
            week.status = WeekStatus::Closed;
            info!("Signups closed for the game at {starts_at}");
            self.touch();
            self.notify();
        }
        self.status()
    }

    /// Opens signups for the following week once the closed game at
    /// `starts_at` is over. The scheduled event of the finished game is
    /// forgotten; the board is kept.
    pub fn reopen(
        &mut self,
        starts_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<WeekOverview, SessionError> {
        let week = self.week.as_mut().ok_or(SessionError::NoActiveGame)?;
        if week.starts_at == starts_at && week.status == WeekStatus::Closed {
            week.reopen(now);
            week.event = None;
            info!("Signups reopened, next game starts at {}", week.starts_at);
            self.touch();
            self.notify();
        }
        self.status()
    }

    pub fn mark_reminded(&mut self, starts_at: OffsetDateTime) -> Result<(), SessionError> {
        let week = self.week.as_mut().ok_or(SessionError::NoActiveGame)?;
        if week.starts_at == starts_at {
            week.reminded = true;
        }
        Ok(())
    }

    /// Current selections of one participant, for debugging.
    pub fn roles_of(&self, participant: UserId) -> Result<Vec<Role>, SessionError> {
        let week = self.week.as_ref().ok_or(SessionError::NoActiveGame)?;
        Ok(week.tally.roles_of(participant))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use serenity::all::{ChannelId, GuildId, MessageId, ScheduledEventId, UserId};
    use time::{macros::datetime, macros::time, OffsetDateTime, Weekday};

    use super::{BoardMessage, GameSession, NewGameWeek, ReactionOutcome, SessionEvent, WeekStatus};
    use crate::game::{CapacityLimits, GameSchedule, Role, RoleCategory, SessionError};

    const NOW: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

    fn board() -> BoardMessage {
        BoardMessage {
            guild: GuildId::new(1),
            channel: ChannelId::new(10),
            message: MessageId::new(20),
        }
    }

    fn new_week(timezone: &str) -> Result<NewGameWeek, SessionError> {
        Ok(NewGameWeek {
            schedule: GameSchedule::new(Weekday::Thursday, time!(19:30), timezone)?,
            location: "Voice Channel".to_owned(),
        })
    }

    fn session_with_board() -> GameSession {
        let mut session = GameSession::new(CapacityLimits::default());
        session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();
        session
            .attach_board(board(), Some(ScheduledEventId::new(30)))
            .unwrap();
        session
    }

    fn user(id: u64) -> UserId {
        UserId::new(id)
    }

    fn added(outcome: ReactionOutcome) -> super::WeekOverview {
        match outcome {
            ReactionOutcome::Added(overview) => overview,
            outcome => panic!("Expected a reaction to be added, got {outcome:?}"),
        }
    }

    #[test]
    fn setup_creates_open_week() {
        let mut session = GameSession::new(CapacityLimits::default());
        let outcome = session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();
        assert_eq!(outcome.replaced, None);

        let overview = outcome.overview;
        assert_eq!(overview.status, WeekStatus::Open);
        assert_eq!(overview.starts_at, datetime!(2024-01-05 03:30 UTC));
        assert_eq!(overview.board, None);
        assert_eq!(overview.location, "Voice Channel");
    }

    #[test]
    fn invalid_timezone_creates_nothing_and_valid_one_succeeds() {
        let mut session = GameSession::new(CapacityLimits::default());

        let err = new_week("Mars/Olympus_Mons").unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTimezone("Mars/Olympus_Mons".to_owned())
        );
        assert_eq!(session.status().unwrap_err(), SessionError::NoActiveGame);

        session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();
        assert!(session.status().is_ok());
    }

    #[test]
    fn setup_twice_is_rejected() {
        let mut session = session_with_board();
        let err = session
            .setup(new_week("Europe/Berlin").unwrap(), NOW)
            .unwrap_err();
        assert_eq!(err, SessionError::GameAlreadyOpen);
    }

    #[test]
    fn setup_after_reset_succeeds() {
        let mut session = session_with_board();
        session.reset(false, NOW).unwrap();
        session
            .setup(new_week("Europe/Berlin").unwrap(), NOW)
            .unwrap();
        assert_eq!(
            session.status().unwrap().schedule.timezone_name(),
            "Europe/Berlin"
        );
    }

    #[test]
    fn reactions_on_other_messages_are_ignored() {
        let mut session = session_with_board();
        let outcome = session
            .add_reaction(MessageId::new(999), user(1), &Role::Storyteller)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::Ignored);
    }

    #[test]
    fn reactions_without_game_are_ignored() {
        let mut session = GameSession::new(CapacityLimits::default());
        let outcome = session
            .add_reaction(board().message, user(1), &Role::Storyteller)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::Ignored);
    }

    #[test]
    fn reactions_on_orphaned_board_are_ignored() {
        let mut session = session_with_board();
        session.reset(false, NOW).unwrap();
        session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();

        let outcome = session
            .add_reaction(board().message, user(1), &Role::Spectator)
            .unwrap();
        assert_eq!(outcome, ReactionOutcome::Ignored);
    }

    #[test]
    fn storyteller_scenario() {
        let mut session = session_with_board();
        added(
            session
                .add_reaction(board().message, user(1), &Role::Storyteller)
                .unwrap(),
        );

        let err = session
            .add_reaction(board().message, user(2), &Role::Storyteller)
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::CapacityExceeded {
                category: RoleCategory::Storyteller,
                ..
            }
        ));
        assert_eq!(session.status().unwrap().snapshot.storytellers, vec![user(1)]);
    }

    #[test]
    fn party_scenario() {
        let mut session = session_with_board();
        let party = Role::from_emoji("🛡️");

        let overview = added(session.add_reaction(board().message, user(1), &party).unwrap());
        assert_eq!(overview.snapshot.main_player_slots(), 4);

        for _ in 0..3 {
            session.add_reaction(board().message, user(2), &party).unwrap();
        }
        assert_eq!(session.status().unwrap().snapshot.main_player_slots(), 8);
    }

    #[test]
    fn reset_preserving_message_keeps_week() {
        let mut session = session_with_board();
        session
            .add_reaction(board().message, user(1), &Role::MainPlayer { slots: 3 })
            .unwrap();
        let before = session.status().unwrap();

        let later = datetime!(2024-01-06 00:00 UTC);
        let outcome = session.reset(true, later).unwrap();
        assert!(outcome.preserved);

        let after = session.status().unwrap();
        assert_eq!(after.schedule, before.schedule);
        assert_eq!(after.location, before.location);
        assert_eq!(after.board, Some(board()));
        assert_eq!(after.snapshot.main_player_slots(), 0);
        assert_eq!(after.starts_at, datetime!(2024-01-12 03:30 UTC));

        // Reactions keep routing to the same board.
        added(
            session
                .add_reaction(board().message, user(1), &Role::Spectator)
                .unwrap(),
        );
    }

    #[test]
    fn reset_without_preserving_clears_everything() {
        let mut session = session_with_board();
        session
            .add_reaction(board().message, user(1), &Role::Spectator)
            .unwrap();

        let outcome = session.reset(false, NOW).unwrap();
        assert!(!outcome.preserved);
        assert_eq!(outcome.overview.event, Some(ScheduledEventId::new(30)));
        assert_eq!(session.status().unwrap_err(), SessionError::NoActiveGame);
    }

    #[test]
    fn reset_without_game_fails() {
        let mut session = GameSession::new(CapacityLimits::default());
        assert_eq!(
            session.reset(true, NOW).unwrap_err(),
            SessionError::NoActiveGame
        );
    }

    #[test]
    fn closed_week_rejects_additions_but_allows_removals() {
        let mut session = session_with_board();
        session
            .add_reaction(board().message, user(1), &Role::Spectator)
            .unwrap();

        let starts_at = session.status().unwrap().starts_at;
        let overview = session.close_signups(starts_at).unwrap();
        assert_eq!(overview.status, WeekStatus::Closed);

        assert_eq!(
            session
                .add_reaction(board().message, user(2), &Role::Spectator)
                .unwrap_err(),
            SessionError::SignupsClosed
        );

        let outcome = session
            .remove_reaction(board().message, user(1), &Role::Spectator)
            .unwrap();
        assert!(matches!(outcome, ReactionOutcome::Removed { .. }));
        assert!(session.status().unwrap().snapshot.spectators.is_empty());
    }

    #[test]
    fn stale_close_is_ignored() {
        let mut session = session_with_board();
        let overview = session.close_signups(datetime!(2023-12-28 03:30 UTC)).unwrap();
        assert_eq!(overview.status, WeekStatus::Open);
    }

    #[test]
    fn setup_over_closed_week_is_allowed() {
        let mut session = session_with_board();
        let starts_at = session.status().unwrap().starts_at;
        session.close_signups(starts_at).unwrap();

        let outcome = session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();
        assert_eq!(session.status().unwrap().status, WeekStatus::Open);

        let replaced = outcome.replaced.unwrap();
        assert_eq!(replaced.status, WeekStatus::Closed);
        assert_eq!(replaced.board, Some(board()));
        assert_eq!(replaced.event, Some(ScheduledEventId::new(30)));
        assert_eq!(
            replaced.discord_event(),
            Some((board().guild, ScheduledEventId::new(30)))
        );
        assert_eq!(outcome.overview.event, None);
    }

    #[test]
    fn week_without_board_has_no_discord_event() {
        let mut session = GameSession::new(CapacityLimits::default());
        session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();
        session.attach_event(ScheduledEventId::new(30)).unwrap();

        assert_eq!(session.status().unwrap().discord_event(), None);
    }

    #[test]
    fn lifecycle_changes_are_published() {
        let mut session = GameSession::new(CapacityLimits::default());
        let mut events = session.subscribe();

        session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();
        session.attach_board(board(), None).unwrap();
        session.reset(true, NOW).unwrap();

        for _ in 0..3 {
            assert_eq!(events.try_recv().unwrap(), SessionEvent::ScheduleChanged);
        }
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn attaching_the_board_wakes_listeners() {
        let mut session = GameSession::new(CapacityLimits::default());
        session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap();
        let mut events = session.subscribe();

        session.attach_board(board(), None).unwrap();
        assert_eq!(events.try_recv().unwrap(), SessionEvent::ScheduleChanged);
    }

    #[test]
    fn revision_grows_with_every_change() {
        let mut session = session_with_board();
        let mut last = session.status().unwrap().revision;

        let mut check = |overview: super::WeekOverview| {
            assert!(overview.revision > last, "{} <= {last}", overview.revision);
            last = overview.revision;
        };

        check(added(
            session
                .add_reaction(board().message, user(1), &Role::Spectator)
                .unwrap(),
        ));
        match session
            .remove_reaction(board().message, user(1), &Role::Spectator)
            .unwrap()
        {
            ReactionOutcome::Removed { overview, .. } => check(overview),
            outcome => panic!("Expected a removal, got {outcome:?}"),
        }
        check(session.reset(true, NOW).unwrap().overview);

        let discarded = session.reset(false, NOW).unwrap().overview;
        let fresh = session
            .setup(new_week("America/Los_Angeles").unwrap(), NOW)
            .unwrap()
            .overview;
        assert!(fresh.revision > discarded.revision);
    }

    #[test]
    fn closed_week_reopens_for_the_next_game() {
        let mut session = session_with_board();
        session
            .add_reaction(board().message, user(1), &Role::Storyteller)
            .unwrap();
        let starts_at = session.status().unwrap().starts_at;
        session.mark_reminded(starts_at).unwrap();
        session.close_signups(starts_at).unwrap();

        let overview = session
            .reopen(starts_at, datetime!(2024-01-05 07:00 UTC))
            .unwrap();
        assert_eq!(overview.status, WeekStatus::Open);
        assert_eq!(overview.starts_at, datetime!(2024-01-12 03:30 UTC));
        assert!(!overview.reminded);
        assert_eq!(overview.board, Some(board()));
        assert_eq!(overview.event, None);
        assert!(overview.snapshot.storytellers.is_empty());
    }

    #[test]
    fn reopen_needs_the_matching_closed_week() {
        let mut session = session_with_board();
        let starts_at = session.status().unwrap().starts_at;

        let still_open = session.reopen(starts_at, NOW).unwrap();
        assert_eq!(still_open.starts_at, starts_at);
        assert_eq!(still_open.event, Some(ScheduledEventId::new(30)));

        session.close_signups(starts_at).unwrap();
        let stale = session
            .reopen(datetime!(2023-12-28 03:30 UTC), NOW)
            .unwrap();
        assert_eq!(stale.status, WeekStatus::Closed);
    }

    #[test]
    fn mark_reminded_only_applies_to_current_week() {
        let mut session = session_with_board();
        session.mark_reminded(datetime!(2023-12-28 03:30 UTC)).unwrap();
        assert!(!session.status().unwrap().reminded);

        let starts_at = session.status().unwrap().starts_at;
        session.mark_reminded(starts_at).unwrap();
        assert!(session.status().unwrap().reminded);
    }
}
