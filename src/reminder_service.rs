use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::{
    select,
    sync::{broadcast::error::RecvError, Notify},
};
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    game::{SessionError, SessionEvent, SessionHandle, SessionHandleError, WeekOverview, WeekStatus},
    signup_board::SignupBoard,
    utils::formatting::format_utc,
};

const DEFAULT_SLEEP_DURATION: Duration = Duration::seconds(60 * 60 /* One hour */);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Due {
    Reminder { starts_at: OffsetDateTime },
    CloseSignups { starts_at: OffsetDateTime },
    Reopen { starts_at: OffsetDateTime },
}

#[derive(Clone, Copy, Debug)]
struct Timing {
    reminder_lead: Duration,
    game_duration: Duration,
}

/// What the current week needs next, and when.
fn next_due(
    overview: &WeekOverview,
    timing: Timing,
    now: OffsetDateTime,
) -> Option<(OffsetDateTime, Due)> {
    // Setup posts the board right after creating the week; attaching it wakes us again.
    overview.board?;

    let starts_at = overview.starts_at;
    if overview.status == WeekStatus::Closed {
        Some((starts_at + timing.game_duration, Due::Reopen { starts_at }))
    } else if !overview.reminded && now < starts_at {
        Some((starts_at - timing.reminder_lead, Due::Reminder { starts_at }))
    } else {
        Some((starts_at, Due::CloseSignups { starts_at }))
    }
}

/// Runs the weekly cycle: reminder, closing signups at the start and
/// reopening for the next week once the game is over.
pub struct ReminderService {
    session: SessionHandle,
    board: Arc<SignupBoard>,
    timing: Timing,
}

impl ReminderService {
    pub fn create_and_start(
        shutdown: Arc<Notify>,
        session: SessionHandle,
        board: Arc<SignupBoard>,
        reminder_lead: Duration,
        game_duration: Duration,
    ) {
        let service = ReminderService {
            session,
            board,
            timing: Timing {
                reminder_lead,
                game_duration,
            },
        };

        tokio::spawn(service.run(shutdown).instrument(info_span!("reminder_loop")));
    }

    async fn run(self, shutdown: Arc<Notify>) {
        let mut session_events = self.session.subscribe();

        loop {
            let next = self.reschedule().await;

            let sleep_duration = {
                let duration = next
                    .map(|(time, _)| Duration::max(Duration::ZERO, time - OffsetDateTime::now_utc()))
                    .unwrap_or(DEFAULT_SLEEP_DURATION);

                std::time::Duration::from_millis(duration.whole_milliseconds() as _)
            };

            info!(
                "Next check scheduled at {} (in {:?})",
                format_utc(OffsetDateTime::now_utc() + sleep_duration),
                sleep_duration
            );

            select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    if let Some((_, due)) = next {
                        self.perform(due).await;
                    }
                }

                evt = session_events.recv() => {
                    match evt {
                        Ok(SessionEvent::ScheduleChanged) => info!("Schedule changed"),
                        Err(RecvError::Lagged(skipped)) => warn!("Missed {skipped} session events"),
                        Err(RecvError::Closed) => {
                            error!("Session events channel closed, stopping");
                            break;
                        }
                    }
                }

                _ = shutdown.notified() => {
                    info!("Shutting down");
                    break;
                }
            }
        }
    }

    async fn reschedule(&self) -> Option<(OffsetDateTime, Due)> {
        match self.session.status().await {
            Ok(overview) => next_due(&overview, self.timing, OffsetDateTime::now_utc()),
            Err(SessionHandleError::Session(SessionError::NoActiveGame)) => None,
            Err(err) => {
                error!("Could not reschedule: {err}");
                None
            }
        }
    }

    async fn perform(&self, due: Due) {
        let result = match due {
            Due::Reminder { starts_at } => self.send_reminder(starts_at).await,
            Due::CloseSignups { starts_at } => self.close_signups(starts_at).await,
            Due::Reopen { starts_at } => self.reopen(starts_at).await,
        };

        if let Err(err) = result {
            error!("Could not perform {due:?}: {err}");
        }
    }

    #[tracing::instrument(skip(self))]
    async fn send_reminder(&self, starts_at: OffsetDateTime) -> anyhow::Result<()> {
        let overview = self.session.status().await?;
        if overview.starts_at != starts_at || overview.reminded || overview.board.is_none() {
            return Ok(());
        }

        // Marked first so a failing channel does not turn into a reminder loop.
        self.session.mark_reminded(starts_at).await?;

        info!("Posting the reminder for the game at {}", format_utc(starts_at));
        self.board.post_reminder(&overview).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn close_signups(&self, starts_at: OffsetDateTime) -> anyhow::Result<()> {
        let overview = self.session.close_signups(starts_at).await?;
        if overview.status == WeekStatus::Closed && overview.starts_at == starts_at {
            self.board.sync(&overview).await;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn reopen(&self, starts_at: OffsetDateTime) -> anyhow::Result<()> {
        let overview = self
            .session
            .reopen(starts_at, OffsetDateTime::now_utc())
            .await?;
        if overview.status != WeekStatus::Open || overview.starts_at == starts_at {
            return Ok(());
        }

        info!("Next week's game starts at {}", format_utc(overview.starts_at));

        if let Some(board) = overview.board {
            self.board.clear_reactions(board).await?;

            match self.board.create_event(board.guild, &overview).await {
                Ok(event) => self.session.attach_event(event).await?,
                Err(err) => warn!("Could not create next week's scheduled event: {err}"),
            }
        }

        self.board.sync(&self.session.status().await?).await;
        Ok(())
    }
}
