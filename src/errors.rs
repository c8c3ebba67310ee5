use thiserror::Error;

/// Errors that can occur while resolving, loading, or saving identities.
#[derive(Error, Debug)]
pub enum ParticipantsError {
    #[error("file error: {message} (path: {path})")]
    File { message: String, path: String },

    #[error("parse error: {message} (path: {path}, line: {line:?})")]
    Parse {
        message: String,
        path: String,
        line: Option<usize>,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("invalid stable id '{stable_id}': expected '{prefix}' followed by digits")]
    InvalidStableId { stable_id: String, prefix: String },

    #[error("identifier {kind} -> {value} is listed under both {first} and {second}")]
    DuplicateIdentifier {
        kind: String,
        value: String,
        first: String,
        second: String,
    },

    #[error("stable id sequence for prefix '{prefix}' is exhausted")]
    SequenceExhausted { prefix: String },

    #[error("identifier type '{kind}' is reserved for tombstone redirects")]
    ReservedType { kind: String },

    #[error("refusing to overwrite input file (path: {path})")]
    SamePath { path: String },

    #[error("internal consistency violation: {message}")]
    Invariant { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ParticipantsError {
    /// Process exit status: 2 for a same-path invocation, 3 for a broken
    /// invariant, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParticipantsError::SamePath { .. } => 2,
            ParticipantsError::Invariant { .. } => 3,
            _ => 1,
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        ParticipantsError::Invariant {
            message: message.into(),
        }
    }
}

/// Convenience alias for results using `ParticipantsError`.
pub type Result<T> = std::result::Result<T, ParticipantsError>;
