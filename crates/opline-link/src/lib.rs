//! Protocol state machine and session run loop for Opline.
//!
//! [`LinkEndpoint`] is the pure dispatcher: it consumes decoded messages,
//! mutates its journal and log store, buffers dumps while disconnected, and
//! produces outbound messages. [`session::run_session`] drives an endpoint
//! against a [`LineTransport`] with bounded reads, handshake retries, and
//! cooperative cancellation.

pub mod endpoint;
pub mod error;
pub mod session;
pub mod transport;

pub use endpoint::{LinkEndpoint, LinkState};
pub use error::{LinkError, LinkResult};
pub use session::{run_session, SessionConfig, SessionRole};
pub use transport::{channel_pair, ChannelTransport, LineTransport};
