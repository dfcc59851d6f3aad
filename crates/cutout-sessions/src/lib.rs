pub mod db;
pub mod error;
pub mod machine;
pub mod manager;
pub mod outbound;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use machine::{transition, Effect, Input, Limits, Reply};
pub use manager::{InboundEvent, SessionManager};
pub use outbound::Outbound;
pub use store::SessionStore;
pub use types::{Session, SessionState, Stage};
