use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("wrong field count: expected {expected}, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid record id: {0:?}")]
    InvalidId(String),

    #[error("invalid cleared flag: {0:?} (expected \"0\" or \"1\")")]
    InvalidFlag(String),

    #[error("dump contained no decodable segments")]
    EmptyDump,

    #[error("unrecognized message identifier: {0:?}")]
    UnknownIdentifier(char),

    #[error("malformed frame: {0}")]
    Framing(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
