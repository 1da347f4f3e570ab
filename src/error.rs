use thiserror::Error;

/// Failures reported by a [`CurveWriter`](crate::writer::CurveWriter).
///
/// All of them are scoped to the call that produced them; the writer stays
/// usable afterwards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("no buffer name provided")]
    MissingBufferName,

    #[error("buffer '{name}' probably doesn't exist")]
    BufferNotFound { name: String },

    #[error("no buffer yet")]
    NoBuffer,

    #[error("couldn't lock samples of buffer '{name}'")]
    LockFailed { name: String },

    #[error("list needs to only contain floats (element {index} is '{found}')")]
    NonFloatElement { index: usize, found: String },

    #[error("invalid input: send a list of floats, not a single number")]
    InvalidInput,

    #[error("unknown message '{selector}'")]
    UnknownMessage { selector: String },

    #[error("parse error: {0}")]
    Parse(String),
}
