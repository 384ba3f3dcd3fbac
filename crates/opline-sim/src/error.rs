use thiserror::Error;

use opline_link::LinkError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

pub type SimResult<T> = Result<T, SimError>;
