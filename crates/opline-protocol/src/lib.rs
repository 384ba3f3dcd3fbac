//! Wire protocol for Opline.
//!
//! Messages travel as UTF-8 text lines: a single-digit identifier, then
//! comma-separated fields, every field followed by the delimiter. Dumps pack
//! multiple records into one line separated by `,,`. Single messages decode
//! strictly; dump segments decode permissively (bad segments are dropped,
//! good ones admitted).

pub mod codec;
pub mod error;
pub mod message;

pub use codec::LineCodec;
pub use error::{DecodeError, DecodeResult};
pub use message::{LinkMessage, DUMP_DELIM, ERROR_FIELDS, EVENT_FIELDS, FIELD_DELIM};
