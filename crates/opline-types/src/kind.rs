use serde::{Deserialize, Serialize};

/// Single-digit message identifiers used on the wire.
///
/// A dispatched line starts with one of these digits followed immediately by
/// the field delimiter. The set is closed: the dispatcher matches on it
/// exhaustively, so adding an identifier is a compile-visible change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    EventDump,
    ErrorDump,
    Electrical,
    Event,
    Error,
    Status,
    ClearError,
    Listening,
    Begin,
    ClosingConnection,
}

impl MessageKind {
    /// The wire digit for this identifier.
    pub fn digit(&self) -> u8 {
        match self {
            Self::EventDump => 0,
            Self::ErrorDump => 1,
            Self::Electrical => 2,
            Self::Event => 3,
            Self::Error => 4,
            Self::Status => 5,
            Self::ClearError => 6,
            Self::Listening => 7,
            Self::Begin => 8,
            Self::ClosingConnection => 9,
        }
    }

    /// Parse a wire digit. Returns `None` for anything outside 0–9.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::EventDump),
            1 => Some(Self::ErrorDump),
            2 => Some(Self::Electrical),
            3 => Some(Self::Event),
            4 => Some(Self::Error),
            5 => Some(Self::Status),
            6 => Some(Self::ClearError),
            7 => Some(Self::Listening),
            8 => Some(Self::Begin),
            9 => Some(Self::ClosingConnection),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EventDump => "EventDump",
            Self::ErrorDump => "ErrorDump",
            Self::Electrical => "Electrical",
            Self::Event => "Event",
            Self::Error => "Error",
            Self::Status => "Status",
            Self::ClearError => "ClearError",
            Self::Listening => "Listening",
            Self::Begin => "Begin",
            Self::ClosingConnection => "ClosingConnection",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
