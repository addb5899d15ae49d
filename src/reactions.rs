use poise::serenity_prelude::{self as serenity, Reaction, ReactionType, UserId};
use tracing::{debug, error, info, warn};

use crate::{
    commands::CommandError,
    game::{ReactionOutcome, Role, SessionError, SessionHandleError},
    BotState,
};

/// Routes board reactions into the game session.
pub async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, BotState, CommandError>,
    state: &BotState,
) -> Result<(), CommandError> {
    match event {
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            info!(
                "Connected as {}, present in {} guild(s)",
                data_about_bot.user.name,
                data_about_bot.guilds.len()
            );
        }

        serenity::FullEvent::ReactionAdd { add_reaction } => {
            if let Some((participant, role)) = signup_reaction(add_reaction, framework.bot_id) {
                on_reaction_added(state, add_reaction, participant, role).await;
            }
        }

        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            if let Some((participant, role)) = signup_reaction(removed_reaction, framework.bot_id)
            {
                on_reaction_removed(state, removed_reaction, participant, role).await;
            }
        }

        _ => {}
    }

    Ok(())
}

/// The participant and role behind a reaction, if it can be a signup at all.
fn signup_reaction(reaction: &Reaction, bot_id: UserId) -> Option<(UserId, Role)> {
    let from_bot = reaction
        .member
        .as_ref()
        .is_some_and(|member| member.user.bot);

    signup_role(reaction.user_id?, from_bot, &reaction.emoji, bot_id)
}

/// Skips the bot's own palette reactions, other bots and custom emoji.
fn signup_role(
    participant: UserId,
    from_bot: bool,
    emoji: &ReactionType,
    bot_id: UserId,
) -> Option<(UserId, Role)> {
    if participant == bot_id || from_bot {
        return None;
    }

    match emoji {
        ReactionType::Unicode(emoji) => Some((participant, Role::from_emoji(emoji))),
        _ => None,
    }
}

#[tracing::instrument(skip(state, reaction))]
async fn on_reaction_added(state: &BotState, reaction: &Reaction, participant: UserId, role: Role) {
    let outcome = state
        .session
        .add_reaction(reaction.message_id, participant, role.clone())
        .await;

    match outcome {
        Ok(ReactionOutcome::Added(overview)) => {
            debug!("{participant} signed up with {}", role.emoji());
            state.board.sync(&overview).await;
        }

        Ok(_) => {}

        Err(SessionHandleError::Session(
            err @ (SessionError::CapacityExceeded { .. } | SessionError::SignupsClosed),
        )) => {
            info!("Rejected {} from {participant}: {err}", role.emoji());

            let Ok(overview) = state.session.status().await else {
                return;
            };
            if let Some(board) = overview.board {
                if let Err(err) = state.board.retract(board, participant, &role).await {
                    warn!("Could not remove the rejected reaction: {err}");
                }
            }
            state.board.notify_rejection(participant, &role, &err).await;
        }

        Err(SessionHandleError::Session(SessionError::NoActiveGame)) => {
            debug!("Reaction from {participant} arrived without an active game");
        }

        Err(err) => {
            error!("Could not record the reaction of {participant}: {err}");
        }
    }
}

#[tracing::instrument(skip(state, reaction))]
async fn on_reaction_removed(
    state: &BotState,
    reaction: &Reaction,
    participant: UserId,
    role: Role,
) {
    let outcome = state
        .session
        .remove_reaction(reaction.message_id, participant, role.clone())
        .await;

    match outcome {
        Ok(ReactionOutcome::Removed { overview, evicted }) => {
            debug!("{participant} withdrew {}", role.emoji());
            state.board.sync(&overview).await;

            if let Some(board) = overview.board {
                for evicted in evicted {
                    info!(
                        "Evicting {} from {participant}, it no longer fits",
                        evicted.emoji()
                    );
                    if let Err(err) = state.board.retract(board, participant, &evicted).await {
                        warn!("Could not remove the evicted reaction: {err}");
                    }
                }
            }
        }

        Ok(_) => {}

        Err(SessionHandleError::Session(SessionError::NoActiveGame)) => {
            debug!("Reaction removal from {participant} arrived without an active game");
        }

        Err(err) => {
            error!("Could not record the reaction removal of {participant}: {err}");
        }
    }
}
