use tracing::debug;

use opline_types::{ErrorRecord, EventRecord, MessageKind};

use crate::error::{DecodeError, DecodeResult};
use crate::message::{LinkMessage, DUMP_DELIM, ERROR_FIELDS, EVENT_FIELDS, FIELD_DELIM};

/// Codec for the delimited-text line protocol.
///
/// Single messages decode strictly; dump payloads decode permissively: each
/// `,,`-separated segment is decoded independently and only the valid ones
/// are admitted. A dump with zero decodable segments is itself a failure.
pub struct LineCodec;

impl LineCodec {
    /// Encode a full dispatched line: identifier digit, delimiter, payload,
    /// trailing newline. Every field is followed by the delimiter.
    pub fn encode(msg: &LinkMessage) -> String {
        let digit = msg.kind().digit();
        let payload = match msg {
            LinkMessage::EventDump(records) => records
                .iter()
                .map(Self::encode_event_fields)
                .collect::<Vec<_>>()
                .join(","),
            LinkMessage::ErrorDump(records) => records
                .iter()
                .map(Self::encode_error_fields)
                .collect::<Vec<_>>()
                .join(","),
            LinkMessage::Electrical(fields) | LinkMessage::Status(fields) => {
                fields.iter().map(|f| format!("{f}{FIELD_DELIM}")).collect()
            }
            LinkMessage::Event(record) => Self::encode_event_fields(record),
            LinkMessage::Error(record) => Self::encode_error_fields(record),
            LinkMessage::ClearError { id } => format!("{id}{FIELD_DELIM}"),
            LinkMessage::Listening | LinkMessage::Begin | LinkMessage::ClosingConnection => {
                String::new()
            }
        };
        format!("{digit}{FIELD_DELIM}{payload}\n")
    }

    /// Decode a full dispatched line.
    ///
    /// The leading identifier selects the payload grammar. A lead byte that
    /// is not a digit is [`DecodeError::UnknownIdentifier`]; the state
    /// machine treats that as a protocol desync rather than a dropped line.
    pub fn decode(line: &str) -> DecodeResult<LinkMessage> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut chars = line.chars();
        let lead = chars
            .next()
            .ok_or_else(|| DecodeError::Framing("empty line".into()))?;
        let digit = match lead.to_digit(10) {
            Some(d) => d as u8,
            None => return Err(DecodeError::UnknownIdentifier(lead)),
        };
        match chars.next() {
            Some(FIELD_DELIM) => {}
            _ => {
                return Err(DecodeError::Framing(format!(
                    "identifier not followed by delimiter: {line:?}"
                )))
            }
        }
        // All ten digits are assigned, so this cannot fail today; the Option
        // keeps the parse total if the identifier space ever shrinks.
        let kind = MessageKind::from_digit(digit)
            .ok_or(DecodeError::UnknownIdentifier(lead))?;
        let payload = &line[2..];

        match kind {
            MessageKind::EventDump => Ok(LinkMessage::EventDump(Self::decode_event_dump(payload)?)),
            MessageKind::ErrorDump => Ok(LinkMessage::ErrorDump(Self::decode_error_dump(payload)?)),
            MessageKind::Electrical => Ok(LinkMessage::Electrical(Self::raw_fields(payload))),
            MessageKind::Event => Ok(LinkMessage::Event(Self::decode_event_fields(payload)?)),
            MessageKind::Error => Ok(LinkMessage::Error(Self::decode_error_fields(payload)?)),
            MessageKind::Status => Ok(LinkMessage::Status(Self::raw_fields(payload))),
            MessageKind::ClearError => {
                let fields = Self::split_fields(payload);
                if fields.len() != 1 {
                    return Err(DecodeError::FieldCount {
                        expected: 1,
                        found: fields.len(),
                    });
                }
                Ok(LinkMessage::ClearError {
                    id: Self::parse_id(fields[0])?,
                })
            }
            MessageKind::Listening => Ok(LinkMessage::Listening),
            MessageKind::Begin => Ok(LinkMessage::Begin),
            MessageKind::ClosingConnection => Ok(LinkMessage::ClosingConnection),
        }
    }

    /// Encode one event payload: `text,timestamp,id,` (delimiter-terminated).
    pub fn encode_event_fields(record: &EventRecord) -> String {
        format!(
            "{}{d}{}{d}{}{d}",
            record.text,
            record.timestamp,
            record.id,
            d = FIELD_DELIM
        )
    }

    /// Encode one error payload: `text,timestamp,id,flag,`.
    pub fn encode_error_fields(record: &ErrorRecord) -> String {
        format!(
            "{}{d}{}{d}{}{d}{}{d}",
            record.text,
            record.timestamp,
            record.id,
            u8::from(record.cleared),
            d = FIELD_DELIM
        )
    }

    /// Decode one event payload. Exactly three usable fields are required.
    pub fn decode_event_fields(payload: &str) -> DecodeResult<EventRecord> {
        let fields = Self::split_fields(payload);
        if fields.len() != EVENT_FIELDS {
            return Err(DecodeError::FieldCount {
                expected: EVENT_FIELDS,
                found: fields.len(),
            });
        }
        Ok(EventRecord::new(
            Self::parse_id(fields[2])?,
            fields[1],
            fields[0],
        ))
    }

    /// Decode one error payload. Exactly four usable fields are required and
    /// the trailing cleared flag must be `"0"` or `"1"`.
    pub fn decode_error_fields(payload: &str) -> DecodeResult<ErrorRecord> {
        let fields = Self::split_fields(payload);
        if fields.len() != ERROR_FIELDS {
            return Err(DecodeError::FieldCount {
                expected: ERROR_FIELDS,
                found: fields.len(),
            });
        }
        let cleared = match fields[3] {
            "0" => false,
            "1" => true,
            other => return Err(DecodeError::InvalidFlag(other.to_string())),
        };
        Ok(ErrorRecord::new(
            Self::parse_id(fields[2])?,
            fields[1],
            fields[0],
            cleared,
        ))
    }

    /// Decode an event dump payload, admitting every valid segment.
    ///
    /// Segmentation splits on the raw two-character separator, so a record
    /// whose free text contains `,,` will mis-parse; this is an inherited
    /// protocol ambiguity, left as-is on purpose.
    pub fn decode_event_dump(payload: &str) -> DecodeResult<Vec<EventRecord>> {
        Self::decode_dump(payload, Self::decode_event_fields)
    }

    /// Decode an error dump payload, admitting every valid segment.
    pub fn decode_error_dump(payload: &str) -> DecodeResult<Vec<ErrorRecord>> {
        Self::decode_dump(payload, Self::decode_error_fields)
    }

    fn decode_dump<T>(
        payload: &str,
        decode_one: impl Fn(&str) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        let mut admitted = Vec::new();
        for segment in payload.split(DUMP_DELIM) {
            if segment.trim().is_empty() {
                continue;
            }
            match decode_one(segment) {
                Ok(record) => admitted.push(record),
                Err(reason) => {
                    debug!(segment, %reason, "dump segment rejected");
                }
            }
        }
        if admitted.is_empty() {
            return Err(DecodeError::EmptyDump);
        }
        Ok(admitted)
    }

    /// Split a payload into trimmed, non-empty fields. The trailing delimiter
    /// produces an empty token that is discarded here.
    fn split_fields(payload: &str) -> Vec<&str> {
        payload
            .split(FIELD_DELIM)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect()
    }

    fn raw_fields(payload: &str) -> Vec<String> {
        Self::split_fields(payload)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Ids must parse as non-negative integers; anything else is rejected,
    /// never clamped.
    fn parse_id(field: &str) -> DecodeResult<u64> {
        field
            .parse::<u64>()
            .map_err(|_| DecodeError::InvalidId(field.to_string()))
    }
}
