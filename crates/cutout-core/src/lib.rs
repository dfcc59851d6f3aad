pub mod config;
pub mod error;

pub use config::CutoutConfig;
pub use error::{CutoutError, Result};
