use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl RelayError {
    /// 給使用者看的簡短錯誤訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            RelayError::ConfigError { message } => format!("Configuration problem: {}", message),
            RelayError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            RelayError::MissingConfigError { field } => {
                format!("Setting '{}' is required", field)
            }
            RelayError::TransportError(_) | RelayError::HttpError(_) => {
                "Could not reach the messaging bridge".to_string()
            }
            other => other.to_string(),
        }
    }

    /// 建議的修復方式
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RelayError::ConfigError { .. }
            | RelayError::InvalidConfigValueError { .. }
            | RelayError::MissingConfigError { .. } => {
                "Check relay.toml and the command line overrides"
            }
            RelayError::TransportError(_) | RelayError::HttpError(_) => {
                "Make sure the bridge process is running and bridge.url points at it"
            }
            RelayError::IoError(_) => "Check file permissions and available disk space",
        }
    }
}

/// Errors raised by the messaging transport collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bridge request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("bridge returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected bridge response: {0}")]
    InvalidResponse(String),

    #[error("cannot load media: {0}")]
    Media(#[from] std::io::Error),
}

impl TransportError {
    /// The session engine reports malformed chat ids as "invalid wid".
    pub fn is_invalid_wid(&self) -> bool {
        match self {
            TransportError::Remote { message, .. } => message.contains("invalid wid"),
            TransportError::InvalidResponse(message) => message.contains("invalid wid"),
            _ => false,
        }
    }
}

/// Rejections raised while accepting an uploaded file.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Invalid file type. Only JPEG, PNG, GIF, PDF, and DOC files are allowed.")]
    InvalidFileType,

    #[error("File too large. Maximum size is {limit} bytes.")]
    FileTooLarge { limit: usize },

    #[error("Malformed multipart request: {0}")]
    Multipart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
