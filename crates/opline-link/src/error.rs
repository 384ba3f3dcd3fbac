use thiserror::Error;

use opline_protocol::DecodeError;
use opline_store::StoreError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("log store error: {0}")]
    Store(#[from] StoreError),

    #[error("transport closed")]
    TransportClosed,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("handshake timed out after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },
}

pub type LinkResult<T> = Result<T, LinkError>;
