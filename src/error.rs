use miette::Diagnostic;
use thiserror::Error;

/// Main error type for marble operations
#[derive(Error, Diagnostic, Debug)]
pub enum MarbleError {
    #[error("IO error: {0}")]
    #[diagnostic(code(marble::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(marble::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Could not decode image: {message}")]
    #[diagnostic(code(marble::decode))]
    Decode {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Could not encode image: {message}")]
    #[diagnostic(code(marble::encode))]
    Encode { message: String },

    #[error("Template limit reached ({max} templates)")]
    #[diagnostic(
        code(marble::capacity),
        help("Remove or disable an existing template before adding another")
    )]
    CapacityExceeded { max: usize },

    #[error("Template '{id_key}' already exists")]
    #[diagnostic(code(marble::duplicate))]
    DuplicateTemplate { id_key: String },

    #[error("Malformed anchor: {message}")]
    #[diagnostic(
        code(marble::anchor),
        help("Coordinates are four integers: tile X, tile Y, pixel X, pixel Y")
    )]
    MalformedAnchor { message: String },

    #[error("Render factor must be an odd positive integer, got {factor}")]
    #[diagnostic(code(marble::config))]
    InvalidRenderFactor { factor: u32 },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(marble::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Parse error: {message}")]
    #[diagnostic(code(marble::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to persist templates: {message}")]
    #[diagnostic(
        code(marble::persist),
        help("The in-memory collection is unchanged; saving again may succeed")
    )]
    Persistence { message: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(marble::cancelled))]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, MarbleError>;
