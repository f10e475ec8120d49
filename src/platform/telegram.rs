use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatAction, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Me,
    ParseMode,
};
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::config::{TelegramConfig, WebhookConfig};
use crate::pipeline::{Button, ButtonAction, PayloadKind, Pipeline, ResponsePayload, CLOSE_TOKEN};
use crate::platform::{ChatKind, IncomingMessage, SenderMeta};
use crate::registry::UserRegistry;

const MOVIE_HINT_TOKEN: &str = "movie";
const ANIME_HINT_TOKEN: &str = "anime";

const WELCOME_CAPTION: &str = "<blockquote><b>🤖 Anime &amp; Movie Search Bot</b>\n\n\
     • Search Anime\n\
     • Search Movies\n\
     • Works in Groups</blockquote>";

/// Shared application state
pub struct AppState {
    pipeline: Pipeline,
    registry: Option<UserRegistry>,
    telegram: TelegramConfig,
}

impl AppState {
    pub fn new(pipeline: Pipeline, registry: Option<UserRegistry>, telegram: TelegramConfig) -> Self {
        Self {
            pipeline,
            registry,
            telegram,
        }
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Show the welcome screen.")]
    Start,
    #[command(description = "How to use the bot.")]
    Help,
}

/// Run the Telegram bot: long polling, or a webhook server when configured
pub async fn run(state: Arc<AppState>, webhook: Option<WebhookConfig>) -> Result<()> {
    let bot = Bot::new(&state.telegram.bot_token);

    info!("Starting Telegram platform...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build();

    let Some(webhook) = webhook else {
        dispatcher.dispatch().await;
        return Ok(());
    };

    let url = reqwest::Url::parse(&webhook.url)
        .with_context(|| format!("Invalid webhook url: {}", webhook.url))?;
    let options = webhooks::Options::new(webhook.listen_addr, url);
    let (listener, stop_flag, router) = webhooks::axum_to_router(bot, options)
        .await
        .context("Failed to register webhook")?;

    let app = router.route("/", axum::routing::get(health));
    let tcp = tokio::net::TcpListener::bind(webhook.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", webhook.listen_addr))?;

    info!("Webhook server listening on {}", webhook.listen_addr);
    let server = tokio::spawn(async move {
        axum::serve(tcp, app)
            .with_graceful_shutdown(stop_flag)
            .await
    });

    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("webhook listener"),
        )
        .await;

    server
        .await
        .context("Webhook server task panicked")?
        .context("Webhook server failed")?;

    Ok(())
}

async fn health() -> &'static str {
    "Bot Alive"
}

fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(dptree::endpoint(handle_message)),
        )
}

/// Map a Telegram message onto the platform-neutral model.
/// Channels are not served.
fn incoming_message(msg: &Message) -> Option<IncomingMessage> {
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_supergroup() {
        ChatKind::Supergroup
    } else if msg.chat.is_group() {
        ChatKind::Group
    } else {
        return None;
    };

    let sender = msg
        .from
        .as_ref()
        .map(|user| SenderMeta {
            first_name: Some(user.first_name.clone()),
            username: user.username.clone(),
        })
        .unwrap_or_default();

    Some(IncomingMessage {
        text: msg.text().map(str::to_string),
        chat_id: msg.chat.id.0,
        chat_kind,
        message_id: msg.id.0,
        sender,
    })
}

/// Profile fields stored for a chat. A group row describes the group, so no
/// member's name is attached to it.
fn chat_profile(incoming: &IncomingMessage) -> SenderMeta {
    match incoming.chat_kind {
        ChatKind::Private => incoming.sender.clone(),
        ChatKind::Group | ChatKind::Supergroup => SenderMeta::default(),
    }
}

/// Record the chat in the background; failures are only logged
fn register(state: &AppState, incoming: &IncomingMessage) {
    let Some(registry) = state.registry.clone() else {
        return;
    };
    let chat_id = incoming.chat_id;
    let kind = incoming.chat_kind;
    let profile = chat_profile(incoming);
    tokio::spawn(async move {
        if let Err(e) = registry.upsert(chat_id, &profile, kind).await {
            warn!("Failed to register chat {}: {:#}", chat_id, e);
        }
    });
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    me: Me,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(incoming) = incoming_message(&msg) else {
        return Ok(());
    };

    info!("Command {:?} in chat {}", msg.text(), incoming.chat_id);
    register(&state, &incoming);

    match cmd {
        Command::Start | Command::Help => {
            send_welcome(&bot, msg.chat.id, me.username(), &state.telegram).await?;
        }
    }

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(incoming) = incoming_message(&msg) else {
        return Ok(());
    };

    let Some(text) = state.pipeline.admit(&incoming).await else {
        return Ok(());
    };

    info!("Search request in chat {}: {}", incoming.chat_id, text);

    // Keep group feeds clean: the reply replaces the request
    if incoming.chat_kind.is_group() {
        if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
            debug!(
                "Could not delete message {} in chat {}: {}",
                msg.id.0, msg.chat.id.0, e
            );
        }
    }

    bot.send_chat_action(msg.chat.id, ChatAction::UploadPhoto)
        .await
        .ok();

    register(&state, &incoming);

    let payload = state.pipeline.respond(&incoming, &text).await;
    deliver(&bot, msg.chat.id, &payload).await;

    Ok(())
}

/// Send the payload as a photo, falling back to plain text if the photo is
/// rejected. A failed text send drops the reply.
async fn deliver(bot: &Bot, chat_id: ChatId, payload: &ResponsePayload) {
    let markup = keyboard(&payload.buttons);

    if let PayloadKind::Photo(photo) = &payload.kind {
        match reqwest::Url::parse(photo) {
            Ok(photo_url) => {
                let sent = bot
                    .send_photo(chat_id, InputFile::url(photo_url))
                    .caption(payload.caption.clone())
                    .parse_mode(ParseMode::Html)
                    .has_spoiler(payload.spoiler)
                    .reply_markup(markup.clone())
                    .await;
                match sent {
                    Ok(_) => return,
                    Err(e) => warn!(
                        "Photo send failed in chat {}, resending as text: {}",
                        chat_id.0, e
                    ),
                }
            }
            Err(e) => warn!("Unusable image url {:?}: {}", photo, e),
        }
    }

    if let Err(e) = bot
        .send_message(chat_id, payload.caption.clone())
        .parse_mode(ParseMode::Html)
        .reply_markup(markup)
        .await
    {
        error!("Failed to deliver reply to chat {}: {}", chat_id.0, e);
    }
}

/// One button per row, in payload order. Buttons whose URL does not parse
/// are dropped.
fn keyboard(buttons: &[Button]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .iter()
        .filter_map(|button| {
            let rendered = match &button.action {
                ButtonAction::Url(url) => match reqwest::Url::parse(url) {
                    Ok(url) => InlineKeyboardButton::url(button.label.clone(), url),
                    Err(e) => {
                        warn!("Skipping result with bad url {:?}: {}", url, e);
                        return None;
                    }
                },
                ButtonAction::Control(token) => {
                    InlineKeyboardButton::callback(button.label.clone(), token.clone())
                }
            };
            Some(vec![rendered])
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

fn welcome_keyboard(bot_username: &str, telegram: &TelegramConfig) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![
        InlineKeyboardButton::callback("🎬 Movies", MOVIE_HINT_TOKEN),
        InlineKeyboardButton::callback("⛩ Anime", ANIME_HINT_TOKEN),
    ]];

    if let Ok(url) = reqwest::Url::parse(&format!("https://t.me/{bot_username}?startgroup=true")) {
        rows.push(vec![InlineKeyboardButton::url("➕ Add to Group", url)]);
    }

    let mut contact = Vec::new();
    if let Some(url) = telegram
        .owner_id
        .and_then(|id| reqwest::Url::parse(&format!("tg://user?id={id}")).ok())
    {
        contact.push(InlineKeyboardButton::url("👤 Owner", url));
    }
    if let Some(url) = telegram
        .support_url
        .as_deref()
        .and_then(|u| reqwest::Url::parse(u).ok())
    {
        contact.push(InlineKeyboardButton::url("💬 Support", url));
    }
    if !contact.is_empty() {
        rows.push(contact);
    }

    InlineKeyboardMarkup::new(rows)
}

async fn send_welcome(
    bot: &Bot,
    chat_id: ChatId,
    bot_username: &str,
    telegram: &TelegramConfig,
) -> ResponseResult<()> {
    let markup = welcome_keyboard(bot_username, telegram);

    if let Some(banner) = telegram
        .banner_url
        .as_deref()
        .and_then(|u| reqwest::Url::parse(u).ok())
    {
        match bot
            .send_photo(chat_id, InputFile::url(banner))
            .caption(WELCOME_CAPTION)
            .parse_mode(ParseMode::Html)
            .reply_markup(markup.clone())
            .await
        {
            Ok(_) => return Ok(()),
            Err(e) => warn!("Banner send failed in chat {}: {}", chat_id.0, e),
        }
    }

    bot.send_message(chat_id, WELCOME_CAPTION)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup)
        .await?;
    Ok(())
}

/// Popup text for the welcome screen's hint buttons
fn callback_hint(data: &str) -> Option<&'static str> {
    match data {
        MOVIE_HINT_TOKEN => Some("Type a movie name, e.g. Stree 2"),
        ANIME_HINT_TOKEN => Some("Type an anime name, e.g. Naruto"),
        _ => None,
    }
}

async fn handle_callback(bot: Bot, q: CallbackQuery) -> ResponseResult<()> {
    let data = q.data.as_deref().unwrap_or_default();

    if data == CLOSE_TOKEN {
        if let Some(message) = q.message.as_ref() {
            if let Err(e) = bot.delete_message(message.chat().id, message.id()).await {
                debug!(
                    "Close failed for message {} in chat {}: {}",
                    message.id().0,
                    message.chat().id.0,
                    e
                );
            }
        }
        bot.answer_callback_query(q.id.clone()).await.ok();
        return Ok(());
    }

    let answer = bot.answer_callback_query(q.id.clone());
    match callback_hint(data) {
        Some(hint) => answer.text(hint).await.ok(),
        None => answer.await.ok(),
    };

    Ok(())
}
