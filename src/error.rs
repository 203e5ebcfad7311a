//! Error taxonomy for descriptor resolution, content building and configuration.

pub type Result<T> = std::result::Result<T, PopupError>;

#[derive(thiserror::Error, Debug)]
pub enum PopupError {
    /// A `key:value` token whose value cannot be used for its field.
    #[error("malformed descriptor field `{key}` = `{value}`: {reason}")]
    MalformedDescriptor {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid timing breakpoints: {0}")]
    InvalidBreakpoints(String),

    #[error("no keyframe animation with index {0}")]
    UnknownAnimation(u32),

    /// Building the pop-up's pixel content failed.
    #[error("content error: {0}")]
    Content(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("asset error: {0}")]
    Asset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PopupError {
    pub fn malformed(key: &str, value: &str, reason: impl Into<String>) -> Self {
        PopupError::MalformedDescriptor {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
