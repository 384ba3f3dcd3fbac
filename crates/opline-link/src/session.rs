use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use opline_protocol::LineCodec;

use crate::endpoint::{LinkEndpoint, LinkState};
use crate::error::{LinkError, LinkResult};
use crate::transport::LineTransport;

/// Which side of the handshake this session plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRole {
    /// Sends LISTENING until the peer answers BEGIN.
    Initiator,
    /// Waits for LISTENING and answers BEGIN.
    Responder,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub role: SessionRole,
    /// Upper bound on one blocking read; the loop observes cancellation at
    /// this granularity.
    pub read_timeout: Duration,
    /// Gap between LISTENING retries while disconnected.
    pub handshake_interval: Duration,
    /// LISTENING retries before the session gives up.
    pub handshake_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: SessionRole::Initiator,
            read_timeout: Duration::from_millis(50),
            handshake_interval: Duration::from_millis(500),
            handshake_attempts: 20,
        }
    }
}

/// Drive an endpoint against a transport until cancelled or the transport
/// closes.
///
/// Each iteration is fault-isolated: a malformed line or failed write is
/// logged and the loop continues. Cancellation performs an orderly shutdown,
/// discarding unsent dump buffers and sending CLOSING_CONNECTION best-effort
/// when the link is up.
pub async fn run_session<T: LineTransport>(
    endpoint: &mut LinkEndpoint,
    transport: &T,
    config: &SessionConfig,
    shutdown: CancellationToken,
) -> LinkResult<()> {
    let mut attempts_left = config.handshake_attempts;
    let mut next_handshake = Instant::now();

    loop {
        if shutdown.is_cancelled() {
            endpoint.discard_buffers();
            if endpoint.state() == LinkState::Connected {
                let closing = endpoint.begin_close();
                if let Err(error) = transport.write_line(&LineCodec::encode(&closing)).await {
                    debug!(%error, "closing message not delivered");
                }
            }
            info!("session stopped");
            return Ok(());
        }

        if !transport.is_open() {
            return Err(LinkError::TransportClosed);
        }

        if config.role == SessionRole::Initiator && endpoint.state() != LinkState::Connected {
            if attempts_left == 0 {
                endpoint.handshake_timed_out();
                return Err(LinkError::HandshakeTimeout {
                    attempts: config.handshake_attempts,
                });
            }
            if Instant::now() >= next_handshake {
                let listening = endpoint.start_handshake();
                send(transport, std::iter::once(listening)).await;
                attempts_left -= 1;
                next_handshake = Instant::now() + config.handshake_interval;
            }
        }

        let line = tokio::select! {
            _ = shutdown.cancelled() => continue,
            read = transport.read_line(config.read_timeout) => match read {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(LinkError::TransportClosed) => return Err(LinkError::TransportClosed),
                Err(error) => {
                    warn!(%error, "transport read failed");
                    continue;
                }
            },
        };

        let was_connected = endpoint.state() == LinkState::Connected;
        let replies = endpoint.handle_line(&line);
        if was_connected && endpoint.state() == LinkState::Disconnected {
            // Desync or peer close; the initiator may handshake again.
            attempts_left = config.handshake_attempts;
            next_handshake = Instant::now();
        }
        send(transport, replies.into_iter()).await;
    }
}

async fn send<T: LineTransport>(
    transport: &T,
    messages: impl Iterator<Item = opline_protocol::LinkMessage>,
) {
    for msg in messages {
        let line = LineCodec::encode(&msg);
        if let Err(error) = transport.write_line(&line).await {
            warn!(%error, kind = msg.kind_name(), "transport write failed");
        }
    }
}
