use serde::{Deserialize, Serialize};

use opline_types::{ErrorRecord, EventRecord, MessageKind};

/// Field delimiter within one record.
pub const FIELD_DELIM: char = ',';
/// Separator between records inside a dump payload.
pub const DUMP_DELIM: &str = ",,";
/// Usable fields in an event record: text, timestamp, id.
pub const EVENT_FIELDS: usize = 3;
/// Usable fields in an error record: text, timestamp, id, cleared flag.
pub const ERROR_FIELDS: usize = 4;

/// All messages in the Opline link protocol, tagged by wire identifier.
///
/// STATUS and ELECTRICAL payloads are carried as raw field vectors; their
/// interpretation belongs to the display boundary, not the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMessage {
    EventDump(Vec<EventRecord>),
    ErrorDump(Vec<ErrorRecord>),
    Electrical(Vec<String>),
    Event(EventRecord),
    Error(ErrorRecord),
    Status(Vec<String>),
    ClearError { id: u64 },
    Listening,
    Begin,
    ClosingConnection,
}

impl LinkMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::EventDump(_) => MessageKind::EventDump,
            Self::ErrorDump(_) => MessageKind::ErrorDump,
            Self::Electrical(_) => MessageKind::Electrical,
            Self::Event(_) => MessageKind::Event,
            Self::Error(_) => MessageKind::Error,
            Self::Status(_) => MessageKind::Status,
            Self::ClearError { .. } => MessageKind::ClearError,
            Self::Listening => MessageKind::Listening,
            Self::Begin => MessageKind::Begin,
            Self::ClosingConnection => MessageKind::ClosingConnection,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }
}
