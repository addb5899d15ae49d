use poise::{
    serenity_prelude::{Mentionable, Permissions, User},
    CreateReply,
};
use time::OffsetDateTime;

use crate::{
    commands::{internal_err, user_err, CommandResult, Context},
    game::{GameSchedule, SessionError, SessionHandleError},
    signup_board::render::debug_dump,
    utils::{
        formatting::{format_local, format_utc, format_zoned},
        timestamp, TimestampStyle,
    },
};

const REQUIRED_PERMISSIONS: [(Permissions, &str); 7] = [
    (Permissions::VIEW_CHANNEL, "View Channel"),
    (Permissions::SEND_MESSAGES, "Send Messages"),
    (Permissions::EMBED_LINKS, "Embed Links"),
    (Permissions::ADD_REACTIONS, "Add Reactions"),
    (Permissions::READ_MESSAGE_HISTORY, "Read Message History"),
    (Permissions::MANAGE_MESSAGES, "Manage Messages"),
    (Permissions::MANAGE_EVENTS, "Manage Events"),
];

async fn reply(ctx: Context<'_>, content: String) -> CommandResult {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Dump the raw signup state.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_EVENTS",
    default_member_permissions = "MANAGE_EVENTS"
)]
pub async fn debug_players(
    ctx: Context<'_>,
    #[description = "Only show the selections of this member."] member: Option<User>,
) -> CommandResult {
    let session = &ctx.data().session;

    let content = match member {
        Some(member) => {
            let roles = session.roles_of(member.id).await?;
            if roles.is_empty() {
                format!("{} has no reactions on the board.", member.mention())
            } else {
                let emojis = roles
                    .iter()
                    .map(|role| role.emoji())
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{} reacted with {emojis}", member.mention())
            }
        }
        None => {
            let overview = session.status().await?;
            format!(
                "# Signups for {}\n{}",
                format_utc(overview.starts_at),
                debug_dump(&overview.snapshot)
            )
        }
    };

    reply(ctx, content).await
}

/// Check whether the bot can manage the board in this channel.
#[poise::command(slash_command, guild_only)]
pub async fn check_permissions(ctx: Context<'_>) -> CommandResult {
    let channel = ctx
        .channel_id()
        .to_channel(ctx)
        .await?
        .guild()
        .ok_or(user_err("Please run this command in a server text channel."))?;

    let permissions = channel
        .permissions_for_user(ctx, ctx.framework().bot_id)
        .map_err(|err| internal_err(format!("Could not compute the bot permissions: {err}")))?;

    let list = REQUIRED_PERMISSIONS
        .iter()
        .fold(String::new(), |acc, (permission, name)| {
            let mark = if permissions.contains(*permission) {
                "✅"
            } else {
                "❌"
            };
            acc + &format!("{mark} {name}\n")
        });

    reply(
        ctx,
        format!("# Bot permissions in {}\n{list}", channel.mention()),
    )
    .await
}

/// Show how the bot sees the game time.
#[poise::command(slash_command, guild_only)]
pub async fn time_debug(ctx: Context<'_>) -> CommandResult {
    let state = ctx.data();
    let now = OffsetDateTime::now_utc();

    let (schedule, starts_at, source) = match state.session.status().await {
        Ok(overview) => (overview.schedule, overview.starts_at, "current game"),
        Err(SessionHandleError::Session(SessionError::NoActiveGame)) => {
            let schedule = GameSchedule::new(
                state.game.default_day,
                state.game.default_time,
                &state.game.default_timezone,
            )?;
            let starts_at = schedule.next_start(now);
            (schedule, starts_at, "configured defaults")
        }
        Err(err) => return Err(err.into()),
    };

    let reminder_at = starts_at - state.game.reminder_lead;

    reply(
        ctx,
        format!(
            "# Time debug ({source})\n\
             Now: {}\n\
             Now in {}: {}\n\
             Schedule: {schedule}\n\
             Next game: {} / {} / {} your time\n\
             Reminder: {} ({} your time)",
            format_utc(now),
            schedule.timezone_name(),
            format_zoned(schedule.to_local(now)),
            format_utc(starts_at),
            format_zoned(schedule.to_local(starts_at)),
            format_local(starts_at),
            format_utc(reminder_at),
            timestamp(reminder_at, TimestampStyle::ShortDateTime),
        ),
    )
    .await
}

/// Check that the bot is alive.
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    let latency = ctx.ping().await;
    ctx.say(format!("Pong! Gateway latency: {} ms", latency.as_millis()))
        .await?;
    Ok(())
}
