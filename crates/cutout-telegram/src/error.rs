/// Errors produced by the Telegram adapter.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("download failed: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error("file too large: {size} bytes (max {limit})")]
    TooLarge { size: u64, limit: u64 },
}
