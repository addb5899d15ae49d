use poise::{CreateReply, FrameworkError};
use tracing::{error, warn};

use crate::{commands::CommandError, BotState};

type Context<'a> = poise::Context<'a, BotState, CommandError>;

pub async fn handle_error(error: FrameworkError<'_, BotState, CommandError>) {
    use FrameworkError::*;

    match error {
        Setup { error, .. } => {
            error!("Error in bot setup: {error}");
        }

        EventHandler { error, event, .. } => {
            error!(
                "Error in {} event handler: {error}",
                event.snake_case_name()
            );
        }

        Command { error, ctx, .. } => match error {
            CommandError::User { message } => {
                reply_with_error(ctx, &message).await;
            }

            CommandError::Internal { message } => {
                error!(
                    "Internal error in `/{}`: {message}",
                    ctx.command().qualified_name
                );
                reply_with_internal_error(ctx, &message).await;
            }

            CommandError::Serenity(error) => {
                error!(
                    "Discord error in `/{}`: {error}",
                    ctx.command().qualified_name
                );
                reply_with_internal_error(ctx, &error.to_string()).await;
            }
        },

        ArgumentParse {
            error, input, ctx, ..
        } => {
            let response = match input {
                Some(input) => format!("**Sorry, `{input}` is not a valid value.**\n{error}"),
                None => format!("**{error}**"),
            };

            reply_with_error(ctx, &response).await;
        }

        CommandStructureMismatch {
            description, ctx, ..
        } => {
            error!(
                "Failed to deserialize interaction arguments for `/{}`: {description}",
                ctx.command.qualified_name
            );
        }

        MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            reply_with_error(
                ctx,
                &format!(
                    "Sorry, the bot is missing these permissions here: {missing_permissions}. \
                     `/check_permissions` lists everything it needs."
                ),
            )
            .await;
        }

        MissingUserPermissions { ctx, .. } => {
            reply_with_error(
                ctx,
                "Sorry, only members with the Manage Events permission can do this.",
            )
            .await;
        }

        GuildOnly { ctx, .. } => {
            reply_with_error(ctx, "Sorry, but you can only run this command in a server.").await;
        }

        UnknownInteraction { interaction, .. } => {
            warn!("Received an unknown interaction: {:?}", interaction.data.name);
        }

        error => {
            error!("Unhandled framework error: {error}");
        }
    }
}

async fn reply_with_error(ctx: Context<'_>, error_message: &str) {
    if let Err(send_error) = ctx
        .send(
            CreateReply::default()
                .content(error_message)
                .ephemeral(true),
        )
        .await
    {
        error!(
            "Failed to send an error message to the user: {send_error}\nThe message was: {error_message}"
        );
    }
}

async fn reply_with_internal_error(ctx: Context<'_>, error_message: &str) {
    reply_with_error(
        ctx,
        &format!("Sorry, something went wrong on our side: {error_message}"),
    )
    .await;
}
