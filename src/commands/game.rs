use poise::CreateReply;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    commands::{
        arguments::{GameDay, GameTime, TrimmedString},
        internal_err, user_err, CommandResult, Context,
    },
    game::{GameSchedule, NewGameWeek, SessionError, SessionHandleError},
    signup_board::render::{board_embed, next_game_line},
};

/// Set up this week's game and post the signup board in this channel.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_EVENTS",
    default_member_permissions = "MANAGE_EVENTS"
)]
pub async fn setup_game(
    ctx: Context<'_>,

    #[description = "Day of the week. Defaults to the configured game day."] day: Option<GameDay>,

    #[description = "Start time, like `19:30` or `7:30 PM`. Defaults to the configured time."]
    time: Option<GameTime>,

    #[description = "IANA timezone, like `America/Los_Angeles`. Defaults to the configured one."]
    timezone: Option<TrimmedString>,

    #[description = "Where the game is played. Defaults to the configured location."]
    location: Option<TrimmedString>,
) -> CommandResult {
    let guild = ctx.guild_id().ok_or(internal_err(
        "Setup command should only be invoked in guilds",
    ))?;
    let state = ctx.data();
    let game = &state.game;

    let timezone = timezone
        .map(String::from)
        .unwrap_or_else(|| game.default_timezone.clone());
    let schedule = GameSchedule::new(
        day.map(Into::into).unwrap_or(game.default_day),
        time.map(Into::into).unwrap_or(game.default_time),
        &timezone,
    )?;
    let location = location
        .map(String::from)
        .unwrap_or_else(|| game.location.clone());

    ctx.defer_ephemeral().await?;

    let now = OffsetDateTime::now_utc();
    let outcome = state
        .session
        .setup(NewGameWeek { schedule, location }, now)
        .await?;
    if let Some((guild, event)) = outcome.replaced.as_ref().and_then(|w| w.discord_event()) {
        state.board.delete_event(guild, event).await;
    }
    let overview = outcome.overview;

    let board = match state.board.post(guild, ctx.channel_id(), &overview).await {
        Ok(board) => board,
        Err(err) => {
            // Without a board nobody can sign up, so the week is dropped again.
            if let Err(reset_err) = state.session.reset(false, now).await {
                warn!("Could not discard the week after a failed post: {reset_err}");
            }
            return Err(err.into());
        }
    };

    let event = match state.board.create_event(guild, &overview).await {
        Ok(event) => Some(event),
        Err(err) => {
            warn!("Could not create the scheduled event: {err}");
            None
        }
    };

    let overview = state.session.attach_board(board, event).await?;
    info!("Game set up for {}", overview.starts_at);

    let mut content = format!("# Game night is set up!\n{}", next_game_line(&overview));
    if event.is_none() {
        content += "\n\nThe Discord event could not be created. Check `/check_permissions`.";
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Clear all signups and reopen the board for the next game.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_EVENTS",
    default_member_permissions = "MANAGE_EVENTS"
)]
pub async fn reset_signups(ctx: Context<'_>) -> CommandResult {
    let state = ctx.data();

    ctx.defer_ephemeral().await?;

    let outcome = state
        .session
        .reset(true, OffsetDateTime::now_utc())
        .await?;
    let overview = outcome.overview;

    if let Some(board) = overview.board {
        state.board.clear_reactions(board).await?;

        if overview.event.is_none() {
            match state.board.create_event(board.guild, &overview).await {
                Ok(event) => state.session.attach_event(event).await?,
                Err(err) => warn!("Could not recreate the scheduled event: {err}"),
            }
        }
    }
    state.board.publish(&state.session.status().await?).await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "# Signups cleared\n{}",
                next_game_line(&overview)
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Discard the current game and its Discord event.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_EVENTS",
    default_member_permissions = "MANAGE_EVENTS"
)]
pub async fn reset_game(ctx: Context<'_>) -> CommandResult {
    let state = ctx.data();

    let outcome = state
        .session
        .reset(false, OffsetDateTime::now_utc())
        .await?;

    if let Some((guild, event)) = outcome.overview.discord_event() {
        state.board.delete_event(guild, event).await;
    }

    ctx.send(
        CreateReply::default()
            .content("# Game reset\nUse `/setup_game` to post a new signup board.")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Show the current signups.
#[poise::command(slash_command, guild_only)]
pub async fn game_status(ctx: Context<'_>) -> CommandResult {
    let overview = match ctx.data().session.status().await {
        Ok(overview) => overview,
        Err(SessionHandleError::Session(SessionError::NoActiveGame)) => {
            return Err(user_err(
                "There is no game this week yet. An organizer can start one with `/setup_game`.",
            ));
        }
        Err(err) => return Err(err.into()),
    };

    ctx.send(
        CreateReply::default()
            .embed(board_embed(&overview))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
