//! Chat action indicator: sends `sendChatAction` every 4 seconds.
//!
//! Telegram's action status expires after ~5 seconds, so we refresh every 4s.
//! The loop is aborted when the handle is stopped or dropped, including when
//! the owning task unwinds.

use std::future::Future;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatAction;

/// Handle to a background chat action task.
pub struct ChatActionHandle(tokio::task::JoinHandle<()>);

impl ChatActionHandle {
    /// Show `action` in `chat_id` until the handle is stopped or dropped.
    pub fn start(bot: Bot, chat_id: ChatId, action: ChatAction) -> Self {
        Self::spawn(async move {
            loop {
                let _ = bot.send_chat_action(chat_id, action).await;
                tokio::time::sleep(Duration::from_secs(4)).await;
            }
        })
    }

    fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        ChatActionHandle(tokio::spawn(task))
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ChatActionHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropping_the_handle_aborts_the_loop() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = ChatActionHandle::spawn(async move {
            let _held = tx;
            std::future::pending::<()>().await;
        });

        drop(handle);
        assert!(rx.await.is_err(), "sender should be dropped with the aborted task");
    }

    #[tokio::test]
    async fn unwinding_owner_releases_the_loop() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let owner = tokio::spawn(async move {
            let _action = ChatActionHandle::spawn(async move {
                let _held = tx;
                std::future::pending::<()>().await;
            });
            panic!("session handling blew up");
        });

        assert!(owner.await.unwrap_err().is_panic());
        assert!(rx.await.is_err());
    }
}
