//! Outbound delivery for the Telegram adapter.
//!
//! Telegram's message limit is 4096 characters; we use 4090 for safety.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::warn;

use cutout_sessions::Outbound;

/// Maximum characters per Telegram message.
const CHUNK_MAX: usize = 4090;

const RESULT_FILE_NAME: &str = "cutout.png";

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, breaking on
/// line boundaries where possible.
pub fn split_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        let mut line = line;
        // Lines that cannot fit in any chunk are hard-split on char boundaries.
        while line.chars().count() > CHUNK_MAX {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let cut = line
                .char_indices()
                .nth(CHUNK_MAX)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }

        let needed = if current.is_empty() { 0 } else { 1 } + line.chars().count();
        if current.chars().count() + needed > CHUNK_MAX {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Send `text` to `chat_id` as one or more plain-text messages.
///
/// A 100ms delay is inserted between consecutive chunks to avoid hitting rate limits.
pub async fn send_text(bot: &Bot, chat_id: ChatId, text: &str) {
    let chunks = split_chunks(text);
    for (i, chunk) in chunks.iter().enumerate() {
        if let Err(e) = bot.send_message(chat_id, chunk).await {
            warn!(error = %e, chunk_index = i, "Telegram: failed to send message");
        }
        if i + 1 < chunks.len() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// [`Outbound`] bound to one Telegram chat.
pub struct TelegramOutbound {
    bot: Bot,
    chat_id: ChatId,
    as_document: bool,
}

impl TelegramOutbound {
    pub fn new(bot: Bot, chat_id: ChatId, as_document: bool) -> Self {
        Self {
            bot,
            chat_id,
            as_document,
        }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send_text(&self, text: &str) {
        send_text(&self.bot, self.chat_id, text).await;
    }

    async fn send_image(&self, png: Vec<u8>) {
        let file = InputFile::memory(png).file_name(RESULT_FILE_NAME);
        let sent = if self.as_document {
            self.bot.send_document(self.chat_id, file).await.map(|_| ())
        } else {
            self.bot.send_photo(self.chat_id, file).await.map(|_| ())
        };
        if let Err(e) = sent {
            warn!(error = %e, chat_id = self.chat_id.0, "Telegram: failed to send image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(split_chunks("Hello, world!"), vec!["Hello, world!"]);
    }

    #[test]
    fn empty_text_is_single_empty_chunk() {
        assert_eq!(split_chunks(""), vec![""]);
    }

    #[test]
    fn exactly_chunk_max_is_single_chunk() {
        let text = "a".repeat(CHUNK_MAX);
        assert_eq!(split_chunks(&text).len(), 1);
    }

    #[test]
    fn long_list_splits_on_newlines() {
        let text = (1..=600)
            .map(|i| format!("{i}. template_{i:04}.png"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = split_chunks(&text);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.chars().count() <= CHUNK_MAX);
        }
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn very_long_single_line_force_splits() {
        let text = "é".repeat(9000);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 3);
        for c in &chunks {
            assert!(c.chars().count() <= CHUNK_MAX);
        }
        assert_eq!(chunks.concat(), text);
    }
}
