//! Inbound image handling for the Telegram adapter.
//!
//! Downloads land in memory only, so nothing is left on disk whether the
//! composition succeeds or fails.

use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::debug;

use crate::error::TelegramError;

/// File id of the image carried by `msg`, if any.
///
/// Photos pick the highest resolution (last element); documents count when
/// their MIME type is `image/*` (users sending uncompressed files).
pub fn image_file_id(msg: &Message) -> Option<&str> {
    if let Some(photo) = msg.photo().and_then(|photos| photos.last()) {
        return Some(&photo.file.id);
    }

    let doc = msg.document()?;
    let mime = doc.mime_type.as_ref().map(|m| m.as_ref()).unwrap_or("");
    if is_image_mime(mime) {
        return Some(&doc.file.id);
    }
    None
}

fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Download a file via the Bot API into memory.
///
/// Fails with [`TelegramError::TooLarge`] before downloading when the file
/// exceeds `max_bytes`.
pub async fn download(bot: &Bot, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, TelegramError> {
    let file = bot.get_file(file_id).await?;

    let size = u64::from(file.size);
    if size > max_bytes {
        return Err(TelegramError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut buf: Vec<u8> = Vec::with_capacity(size as usize);
    bot.download_file(&file.path, &mut buf).await?;
    debug!(file_id, bytes = buf.len(), "Telegram: file downloaded");
    Ok(buf)
}
