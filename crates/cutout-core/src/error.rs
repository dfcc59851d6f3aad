use thiserror::Error;

#[derive(Debug, Error)]
pub enum CutoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CutoutError {
    /// Short error code string for logs.
    pub fn code(&self) -> &'static str {
        match self {
            CutoutError::Config(_) => "CONFIG_ERROR",
            CutoutError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CutoutError>;
