pub mod render;

use std::sync::Arc;

use poise::serenity_prelude::{
    ChannelId, CreateMessage, CreateScheduledEvent, EditMessage, EditScheduledEvent, GuildId,
    Http, MessageId, ReactionType, ScheduledEventId, ScheduledEventType, Timestamp, UserId,
};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    game::{BoardMessage, Role, SessionError, WeekOverview},
    utils::retry::{retry_with_backoff, Backoff, RetryExhausted},
};

use render::{board_embed, event_description, rejection_message, reminder_message, GAME_TITLE};

#[derive(thiserror::Error, Debug)]
pub enum BoardError {
    #[error("Could not deliver the signup board update after {attempts} attempts: {source}")]
    TransientDeliveryFailure {
        attempts: u32,
        source: serenity::Error,
    },
    #[error(transparent)]
    Discord(#[from] serenity::Error),
    #[error("The signup board has not been posted yet")]
    NotPosted,
    #[error("The game start {0} cannot be used as a Discord timestamp")]
    InvalidTimestamp(OffsetDateTime),
}

/// Newest session revision shown on the board.
#[derive(Debug, Default)]
struct RenderGate {
    shown: u64,
}

impl RenderGate {
    fn admits(&self, revision: u64) -> bool {
        revision >= self.shown
    }

    fn record(&mut self, revision: u64) {
        self.shown = self.shown.max(revision);
    }
}

/// Outbound side of the bot: the signup message, its reactions and the
/// scheduled event.
pub struct SignupBoard {
    http: Arc<Http>,
    game_duration: Duration,
    backoff: Backoff,
    rendered: Mutex<RenderGate>,
}

fn reaction(role: &Role) -> ReactionType {
    ReactionType::Unicode(role.emoji())
}

fn discord_timestamp(instant: OffsetDateTime) -> Result<Timestamp, BoardError> {
    Timestamp::from_unix_timestamp(instant.unix_timestamp())
        .map_err(|_| BoardError::InvalidTimestamp(instant))
}

impl SignupBoard {
    pub fn new(http: Arc<Http>, game_duration: Duration) -> SignupBoard {
        SignupBoard {
            http,
            game_duration,
            backoff: Backoff::default(),
            rendered: Mutex::new(RenderGate::default()),
        }
    }

    /// Posts a fresh board in `channel` and seeds the role reactions.
    #[tracing::instrument(skip(self, overview))]
    pub async fn post(
        &self,
        guild: GuildId,
        channel: ChannelId,
        overview: &WeekOverview,
    ) -> Result<BoardMessage, BoardError> {
        let message = channel
            .send_message(&*self.http, CreateMessage::new().embed(board_embed(overview)))
            .await?;

        let board = BoardMessage {
            guild,
            channel,
            message: message.id,
        };
        self.seed_reactions(board.channel, board.message).await?;

        info!("Posted the signup board as message {}", board.message);
        Ok(board)
    }

    async fn seed_reactions(&self, channel: ChannelId, message: MessageId) -> Result<(), BoardError> {
        for role in Role::palette() {
            channel
                .create_reaction(&*self.http, message, reaction(&role))
                .await?;
        }
        Ok(())
    }

    /// Re-renders the board, retrying transient failures.
    ///
    /// Edits are serialized, and an overview older than the one already shown
    /// is skipped, so a slow retry never puts a stale tally back.
    #[tracing::instrument(skip(self, overview), fields(revision = overview.revision))]
    pub async fn refresh(&self, overview: &WeekOverview) -> Result<(), BoardError> {
        let board = overview.board.ok_or(BoardError::NotPosted)?;

        let mut rendered = self.rendered.lock().await;
        if !rendered.admits(overview.revision) {
            debug!("Board already shows revision {}, skipping", rendered.shown);
            return Ok(());
        }

        let embed = board_embed(overview);
        let http = &*self.http;

        retry_with_backoff(self.backoff, "edit the signup board", || {
            board
                .channel
                .edit_message(http, board.message, EditMessage::new().embed(embed.clone()))
        })
        .await
        .map_err(
            |RetryExhausted {
                 attempts,
                 last_error,
             }| BoardError::TransientDeliveryFailure {
                attempts,
                source: last_error,
            },
        )?;

        rendered.record(overview.revision);
        Ok(())
    }

    /// Drops every reaction on the board and puts the role reactions back.
    #[tracing::instrument(skip(self))]
    pub async fn clear_reactions(&self, board: BoardMessage) -> Result<(), BoardError> {
        board
            .channel
            .delete_reactions(&*self.http, board.message)
            .await?;
        self.seed_reactions(board.channel, board.message).await
    }

    /// Retracts one participant's reaction.
    pub async fn retract(
        &self,
        board: BoardMessage,
        participant: UserId,
        role: &Role,
    ) -> Result<(), BoardError> {
        board
            .channel
            .delete_reaction(&*self.http, board.message, Some(participant), reaction(role))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, overview))]
    pub async fn create_event(
        &self,
        guild: GuildId,
        overview: &WeekOverview,
    ) -> Result<ScheduledEventId, BoardError> {
        let builder = CreateScheduledEvent::new(
            ScheduledEventType::External,
            GAME_TITLE,
            discord_timestamp(overview.starts_at)?,
        )
        .end_time(discord_timestamp(overview.ends_at(self.game_duration))?)
        .location(overview.location.clone())
        .description(event_description(&overview.snapshot))
        .audit_log_reason("Weekly BOTC game night");

        let event = guild.create_scheduled_event(&*self.http, builder).await?;
        info!("Created scheduled event {}", event.id);
        Ok(event.id)
    }

    /// Keeps the scheduled event in line with the board. Failures are only
    /// logged, the board is what participants look at.
    #[tracing::instrument(skip(self, overview))]
    pub async fn update_event(&self, overview: &WeekOverview) {
        let (Some(board), Some(event)) = (overview.board, overview.event) else {
            return;
        };

        let builder = match (
            discord_timestamp(overview.starts_at),
            discord_timestamp(overview.ends_at(self.game_duration)),
        ) {
            (Ok(start), Ok(end)) => EditScheduledEvent::new()
                .start_time(start)
                .end_time(end)
                .location(overview.location.clone())
                .description(event_description(&overview.snapshot)),
            _ => {
                warn!("Game start {} is out of range for Discord", overview.starts_at);
                return;
            }
        };

        if let Err(err) = board
            .guild
            .edit_scheduled_event(&*self.http, event, builder)
            .await
        {
            warn!("Could not update scheduled event {event}: {err}");
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&self, guild: GuildId, event: ScheduledEventId) {
        if let Err(err) = guild.delete_scheduled_event(&*self.http, event).await {
            warn!("Could not delete scheduled event {event}: {err}");
        }
    }

    /// Tells a participant why their reaction was removed.
    pub async fn notify_rejection(&self, participant: UserId, role: &Role, error: &SessionError) {
        let message = CreateMessage::new().content(rejection_message(role, error));
        if let Err(err) = participant.direct_message(&*self.http, message).await {
            // Users with closed DMs are common; the reverted reaction speaks for itself.
            warn!("Could not DM {participant} about the rejected reaction: {err}");
        }
    }

    #[tracing::instrument(skip(self, overview))]
    pub async fn post_reminder(&self, overview: &WeekOverview) -> Result<(), BoardError> {
        let board = overview.board.ok_or(BoardError::NotPosted)?;
        board
            .channel
            .say(&*self.http, reminder_message(overview))
            .await?;
        Ok(())
    }

    /// Refreshes the board, then the event. Only a board failure is returned.
    pub async fn publish(&self, overview: &WeekOverview) -> Result<(), BoardError> {
        self.refresh(overview).await?;
        self.update_event(overview).await;
        Ok(())
    }

    /// [`Self::publish`] for background paths, where a failure can only be logged.
    pub async fn sync(&self, overview: &WeekOverview) {
        if let Err(err) = self.publish(overview).await {
            error!("Could not refresh the signup board: {err}");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use poise::serenity_prelude::{ChannelId, GuildId, HttpBuilder, MessageId};
    use time::{macros::datetime, macros::time, Duration, Weekday};
    use tokio::sync::Mutex;

    use super::{BoardError, RenderGate, SignupBoard};
    use crate::{
        game::{BoardMessage, CapacityLimits, GameSchedule, SignupTally, WeekOverview, WeekStatus},
        utils::retry::Backoff,
    };

    /// A board whose Discord calls all fail fast: nothing listens on the proxy port.
    pub(crate) fn unreachable_board() -> SignupBoard {
        SignupBoard {
            http: Arc::new(HttpBuilder::new("token").proxy("http://127.0.0.1:1").build()),
            game_duration: Duration::hours(3),
            backoff: Backoff {
                attempts: 3,
                initial_delay: std::time::Duration::from_millis(1),
                factor: 2,
            },
            rendered: Mutex::new(RenderGate::default()),
        }
    }

    fn overview(revision: u64) -> WeekOverview {
        WeekOverview {
            schedule: GameSchedule::new(Weekday::Thursday, time!(19:30), "America/Los_Angeles")
                .unwrap(),
            location: "Voice Channel".to_owned(),
            status: WeekStatus::Open,
            starts_at: datetime!(2024-01-05 03:30 UTC),
            reminded: false,
            board: Some(BoardMessage {
                guild: GuildId::new(1),
                channel: ChannelId::new(10),
                message: MessageId::new(20),
            }),
            event: None,
            snapshot: SignupTally::new(CapacityLimits::default()).snapshot(),
            revision,
        }
    }

    #[test]
    fn render_gate_only_admits_newer_revisions() {
        let mut gate = RenderGate::default();
        assert!(gate.admits(0));

        gate.record(5);
        assert!(!gate.admits(4));
        assert!(gate.admits(5));
        assert!(gate.admits(6));

        gate.record(3);
        assert!(!gate.admits(4));
    }

    #[tokio::test]
    async fn stale_overview_is_not_rendered() {
        let board = unreachable_board();
        board.rendered.lock().await.record(10);

        // Would fail if it reached Discord.
        board.refresh(&overview(9)).await.unwrap();
    }

    #[tokio::test]
    async fn failed_edit_is_reported_after_retries() {
        let board = unreachable_board();

        let err = board.publish(&overview(1)).await.unwrap_err();
        assert!(
            matches!(err, BoardError::TransientDeliveryFailure { attempts: 3, .. }),
            "{err:?}"
        );
        assert_eq!(board.rendered.lock().await.shown, 0);
    }

    #[tokio::test]
    async fn unposted_board_cannot_be_refreshed() {
        let board = unreachable_board();
        let overview = WeekOverview {
            board: None,
            ..overview(1)
        };

        assert!(matches!(
            board.refresh(&overview).await,
            Err(BoardError::NotPosted)
        ));
    }
}
