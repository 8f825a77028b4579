use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Invalid alignment value: '{0}'")]
    InvalidAlignment(String),

    #[error("Invalid color: '{0}'")]
    InvalidColor(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("No watermark to draw")]
    NothingToDraw,

    #[error("Input not found: {0}")]
    InputNotFound(String),

    #[error("Failed to load image: {0}")]
    ImageError(String),

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
