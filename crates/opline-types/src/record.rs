use serde::{Deserialize, Serialize};

/// Informational record emitted by the controller.
///
/// Ids are not globally unique; they only need to be unique within one
/// ledger for clear/find operations to behave deterministically. The
/// timestamp is opaque text, displayed verbatim and never used for ordering.
/// `text` must not contain the wire field delimiter (`,`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    pub timestamp: String,
    pub text: String,
}

impl EventRecord {
    pub fn new(id: u64, timestamp: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: timestamp.into(),
            text: text.into(),
        }
    }
}

/// Fault record. Unlike events, errors carry a `cleared` flag and remain in
/// the journal after being cleared; clearing marks resolution in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: u64,
    pub timestamp: String,
    pub text: String,
    pub cleared: bool,
}

impl ErrorRecord {
    pub fn new(
        id: u64,
        timestamp: impl Into<String>,
        text: impl Into<String>,
        cleared: bool,
    ) -> Self {
        Self {
            id,
            timestamp: timestamp.into(),
            text: text.into(),
            cleared,
        }
    }
}

/// Either kind of journal record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Event(EventRecord),
    Error(ErrorRecord),
}

impl Record {
    pub fn id(&self) -> u64 {
        match self {
            Self::Event(e) => e.id,
            Self::Error(e) => e.id,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            Self::Event(e) => &e.timestamp,
            Self::Error(e) => &e.timestamp,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Event(e) => &e.text,
            Self::Error(e) => &e.text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<EventRecord> for Record {
    fn from(record: EventRecord) -> Self {
        Self::Event(record)
    }
}

impl From<ErrorRecord> for Record {
    fn from(record: ErrorRecord) -> Self {
        Self::Error(record)
    }
}
