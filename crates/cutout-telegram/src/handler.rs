//! Telegram message handler registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tracing::{debug, warn};

use cutout_core::config::TelegramConfig;
use cutout_sessions::InboundEvent;

use crate::action::ChatActionHandle;
use crate::allow::AllowList;
use crate::attach;
use crate::context::TelegramAppContext;
use crate::error::TelegramError;
use crate::send::{self, TelegramOutbound};

const INTERNAL_ERROR_REPLY: &str = "⚠️ Something went wrong on our side. Please try again.";

/// What a message carries once the sender has been admitted.
enum Payload {
    Text(String),
    Image(String),
}

/// Main message handler registered in the teloxide Dispatcher.
///
/// Runs for every incoming `Message`:
/// 1. Bot-message filter
/// 2. Allowlist check (deny-by-default)
/// 3. Payload extraction (image or text, anything else is dropped)
/// 4. Non-blocking session handling in a spawned task
pub async fn handle_message<C: TelegramAppContext + 'static>(
    bot: Bot,
    msg: Message,
    ctx: Arc<C>,
    config: TelegramConfig,
) -> ResponseResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    if from.is_bot {
        return Ok(());
    }

    if !AllowList::new(&config.allow_users).permits(from.username.as_deref(), from.id.0) {
        debug!(user_id = from.id.0, "Telegram: sender not in allowlist");
        return Ok(());
    }

    let payload = if let Some(file_id) = attach::image_file_id(&msg) {
        Payload::Image(file_id.to_string())
    } else if let Some(text) = msg.text() {
        Payload::Text(text.to_string())
    } else {
        return Ok(());
    };

    let user_id = from.id.0.to_string();
    let chat_id = msg.chat.id;

    tokio::spawn(async move {
        let action = match &payload {
            Payload::Image(_) => Some(ChatActionHandle::start(
                bot.clone(),
                chat_id,
                ChatAction::UploadPhoto,
            )),
            Payload::Text(_) => None,
        };

        let event = match payload {
            Payload::Text(text) => Some(InboundEvent::Text(text)),
            Payload::Image(file_id) => {
                match attach::download(&bot, &file_id, config.max_attachment_bytes).await {
                    Ok(bytes) => Some(InboundEvent::Image(bytes)),
                    Err(e) => {
                        warn!(error = %e, user = %user_id, "Telegram: image download failed");
                        send::send_text(&bot, chat_id, &download_failure_reply(&e)).await;
                        None
                    }
                }
            }
        };

        if let Some(event) = event {
            let out = TelegramOutbound::new(bot.clone(), chat_id, config.send_as_document);
            if let Err(e) = ctx.sessions().handle(&user_id, event, &out).await {
                warn!(error = %e, user = %user_id, "Telegram: session handling failed");
                send::send_text(&bot, chat_id, INTERNAL_ERROR_REPLY).await;
            }
        }

        if let Some(action) = action {
            action.stop();
        }
    });

    Ok(())
}

fn download_failure_reply(err: &TelegramError) -> String {
    match err {
        TelegramError::TooLarge { limit, .. } => format!(
            "⚠️ That file is too large (limit {} MB). Please send a smaller image.",
            limit / (1024 * 1024)
        ),
        _ => "⚠️ I couldn't download your image. Please try sending it again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_reply_names_the_limit() {
        let reply = download_failure_reply(&TelegramError::TooLarge {
            size: 30 * 1024 * 1024,
            limit: 20 * 1024 * 1024,
        });
        assert!(reply.contains("20 MB"), "{reply}");
    }
}
