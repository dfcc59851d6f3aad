pub mod action;
pub mod adapter;
pub mod allow;
pub mod attach;
pub mod context;
pub mod error;
pub mod handler;
pub mod send;

pub use adapter::TelegramAdapter;
pub use context::TelegramAppContext;
pub use error::TelegramError;
