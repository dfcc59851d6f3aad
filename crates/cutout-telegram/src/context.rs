//! What the Telegram adapter needs from the application.

use cutout_sessions::SessionManager;

/// Implemented by the gateway's shared state.
pub trait TelegramAppContext: Send + Sync {
    fn sessions(&self) -> &SessionManager;
}
