use thiserror::Error;

use crate::segment::SegmentError;

/// Failures of a single composition request.
///
/// None of these are fatal to the process; every variant is reported back to
/// the user and the session stays usable.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The submitted bytes are not a decodable image.
    #[error("cannot decode image: {0}")]
    Decode(String),

    /// The background-removal capability failed or returned garbage.
    #[error("segmentation failed: {0}")]
    SegmentationFailed(String),

    #[error("segmentation timed out after {ms}ms")]
    SegmentationTimeout { ms: u64 },

    /// Background removal left no visible pixel.
    #[error("no foreground pixels in cutout")]
    EmptyForeground,

    /// The cropped foreground has zero height.
    #[error("cropped foreground has zero height")]
    DegenerateCrop,

    /// The resized cutout would exceed the resize pixel budget.
    #[error("resized cutout too large: {width}x{height}")]
    ResultTooLarge { width: u32, height: u32 },

    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// The template exists but cannot be read or decoded.
    #[error("template unreadable: {0}")]
    Template(String),

    #[error("cannot encode result: {0}")]
    Encode(String),

    /// A blocking worker panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl ComposeError {
    pub fn code(&self) -> &'static str {
        match self {
            ComposeError::Decode(_) => "DECODE_ERROR",
            ComposeError::SegmentationFailed(_) => "SEGMENTATION_FAILED",
            ComposeError::SegmentationTimeout { .. } => "SEGMENTATION_TIMEOUT",
            ComposeError::EmptyForeground => "EMPTY_FOREGROUND",
            ComposeError::DegenerateCrop => "DEGENERATE_CROP",
            ComposeError::ResultTooLarge { .. } => "RESULT_TOO_LARGE",
            ComposeError::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            ComposeError::Template(_) => "TEMPLATE_ERROR",
            ComposeError::Encode(_) => "ENCODE_ERROR",
            ComposeError::Worker(_) => "WORKER_ERROR",
        }
    }

    /// Whether resending a photo with the same selection can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ComposeError::TemplateNotFound { .. }
                | ComposeError::Template(_)
                | ComposeError::ResultTooLarge { .. }
        )
    }

    /// Text shown to the user in place of the composed image.
    pub fn user_message(&self) -> String {
        match self {
            ComposeError::Decode(_) => {
                "⚠️ I couldn't read that image. Please send it again as a photo.".to_string()
            }
            ComposeError::SegmentationFailed(_) => {
                "⚠️ Background removal failed. Please try again in a moment.".to_string()
            }
            ComposeError::SegmentationTimeout { .. } => {
                "⚠️ Background removal took too long. Please try again.".to_string()
            }
            ComposeError::EmptyForeground | ComposeError::DegenerateCrop => {
                "⚠️ Could not identify a product in this image. Try a photo with a clearer subject."
                    .to_string()
            }
            ComposeError::ResultTooLarge { .. } => {
                "⚠️ At that height the product is too large to place. Send /start and choose a smaller height."
                    .to_string()
            }
            ComposeError::TemplateNotFound { name } => format!(
                "⚠️ Template \"{name}\" is no longer available. Send /start to pick another one."
            ),
            ComposeError::Template(_) => {
                "⚠️ The selected template cannot be loaded. Send /start to pick another one."
                    .to_string()
            }
            ComposeError::Encode(_) | ComposeError::Worker(_) => {
                "⚠️ Something went wrong while composing your image. Please try again.".to_string()
            }
        }
    }
}

impl From<SegmentError> for ComposeError {
    fn from(e: SegmentError) -> Self {
        ComposeError::SegmentationFailed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;
