use std::path::PathBuf;

use crate::graphics::ObjectKind;

/// Result alias that carries the custom [`ShmVizError`] type.
pub type Result<T> = std::result::Result<T, ShmVizError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ShmVizError {
    /// Free-form error used by the binaries and collaborator glue.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A channel was opened without a size but no producer has created it.
    #[error(
        "no channel file at {}; did you start the producer, and is the base path correct?",
        path.display()
    )]
    ChannelNotFound { path: PathBuf },
    /// The channel backing file does not have the expected length.
    #[error("channel {} holds {actual} bytes, expected {expected}", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
    /// Shader compilation failed; carries the driver's info log.
    #[error("shader compilation failed: {0}")]
    Compile(String),
    /// Program linking failed; carries the driver's info log.
    #[error("program link failed: {0}")]
    Link(String),
    #[error("{0} objects cannot be bound")]
    NotBindable(ObjectKind),
    #[error("{kind} bind expects {expected} target argument(s), got {got}")]
    InvalidBindTarget {
        kind: ObjectKind,
        expected: usize,
        got: usize,
    },
    #[error("{what} index {index} out of range (count {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("component count expected to be in [1, 4], not {0}")]
    InvalidComponentCount(usize),
    #[error("no active attribute named `{0}`")]
    AttributeNotFound(String),
    #[error("no active uniform named `{0}`")]
    UniformNotFound(String),
    #[error("no active uniform block named `{0}`")]
    UniformBlockNotFound(String),
    #[error("unknown framebuffer attachment object type {0:#x}")]
    UnknownAttachmentType(u32),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("fft failed: {0}")]
    Fft(#[from] realfft::FftError),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ShmVizError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for ShmVizError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ShmVizError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
