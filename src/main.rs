#![forbid(unsafe_code)]

mod actors;
mod commands;
mod config;
mod game;
mod poise_error_handler;
mod reactions;
mod reminder_service;
mod signup_board;
mod utils;

use std::{process::exit, sync::Arc};

use config::{AppConfig, GameConfig};
use game::{GameSession, SessionHandle};
use poise::{serenity_prelude::*, Framework};
use poise_error_handler::handle_error;
use reminder_service::ReminderService;
use signup_board::SignupBoard;
use tokio::{select, signal, sync::Notify};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub struct BotState {
    pub session: SessionHandle,
    pub board: Arc<SignupBoard>,
    pub game: Arc<GameConfig>,
}

#[tracing::instrument]
#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        warn!("Could not load config from .env file: {err}");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(
                    "clocktower_signup_bot=info"
                        .parse()
                        .expect("Hard-coded default directive should be correct"),
                )
                .from_env_lossy(),
        )
        .init();

    let app_config = match envy::from_env::<AppConfig>() {
        Ok(config) => config,
        Err(err) => {
            error!("Could not load app config: {err}");
            exit(255);
        }
    };

    let game_config = match GameConfig::from_app_config(&app_config) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            error!("Invalid game config: {err}");
            exit(255);
        }
    };

    info!(
        "Capacity: {} storyteller(s), {} main players, {} travelers",
        game_config.limits.storytellers,
        game_config.limits.main_players,
        game_config.limits.travelers
    );

    let shutdown_notify = Arc::new(Notify::new());
    let reminder_service_shutdown = shutdown_notify.clone();

    let framework = Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::setup_game(),
                commands::reset_signups(),
                commands::reset_game(),
                commands::game_status(),
                commands::debug_players(),
                commands::check_permissions(),
                commands::time_debug(),
                commands::ping(),
            ],
            event_handler: |ctx, event, framework, state| {
                Box::pin(reactions::event_handler(ctx, event, framework, state))
            },
            on_error: |error| Box::pin(handle_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(
                async move {
                    let commands = &framework.options().commands;

                    if let Some(true) = app_config.register_commands_globally {
                        info!("Registering commands globally");
                        poise::builtins::register_globally(ctx, commands).await?;
                    }

                    if let Some(guilds) = app_config.register_commands_in_guilds {
                        for guild in guilds.iter().map(|g| GuildId::new(*g)) {
                            let guild_name = ctx
                                .http()
                                .get_guild(guild)
                                .await
                                .map(|g| g.name)
                                .unwrap_or("???".to_string());

                            info!("Registering commands in guild {guild} ({guild_name})");

                            poise::builtins::register_in_guild(ctx, commands, guild).await?;
                        }
                    }

                    let session = SessionHandle::spawn(GameSession::new(game_config.limits));
                    let board = Arc::new(SignupBoard::new(
                        ctx.http.clone(),
                        game_config.game_duration,
                    ));

                    ReminderService::create_and_start(
                        reminder_service_shutdown,
                        session.clone(),
                        board.clone(),
                        game_config.reminder_lead,
                        game_config.game_duration,
                    );

                    Ok(BotState {
                        session,
                        board,
                        game: game_config,
                    })
                }
                .instrument(info_span!("bot_setup")),
            )
        })
        .build();

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = match ClientBuilder::new(app_config.discord_bot_token, intents)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to create the client: {err}");
            exit(255);
        }
    };

    select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            shutdown_notify.notify_waiters();
            client.shard_manager.shutdown_all().await;
        },

        result = client.start() => {
            if let Err(err) = result {
                error!("Failed to start the client: {err}");
            }
        },
    };
}
