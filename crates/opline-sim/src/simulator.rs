use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use opline_journal::Journal;
use opline_link::{LinkEndpoint, LinkError, LinkState, LineTransport};
use opline_protocol::{LineCodec, LinkMessage};

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::generator::TrafficGenerator;

/// Counters reported when a simulator run ends.
#[derive(Clone, Debug, Serialize)]
pub struct SimReport {
    pub events_generated: u64,
    pub errors_generated: u64,
    pub errors_cleared: u64,
    pub lines_sent: usize,
    pub journal_events: usize,
    pub journal_errors: usize,
    pub journal_cleared: usize,
}

/// Synthetic instrument: generates event and error traffic on configured
/// cadences, occasionally clears one of its own unresolved errors, and keeps
/// a record of every line it puts on the wire.
pub struct Simulator {
    endpoint: LinkEndpoint,
    generator: TrafficGenerator,
    config: SimConfig,
    /// Errors raised but not yet cleared; cleared ones are dropped outright
    /// so positional picks only ever land on live candidates.
    unresolved: Journal,
    sent: Vec<String>,
    events_generated: u64,
    errors_generated: u64,
    errors_cleared: u64,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        Self {
            endpoint: LinkEndpoint::new(),
            generator: TrafficGenerator::new(config.seed),
            config,
            unresolved: Journal::new(),
            sent: Vec::new(),
            events_generated: 0,
            errors_generated: 0,
            errors_cleared: 0,
        }
    }

    pub fn endpoint(&self) -> &LinkEndpoint {
        &self.endpoint
    }

    /// Every line transmitted so far, in send order.
    pub fn sent_lines(&self) -> &[String] {
        &self.sent
    }

    /// Drive the simulator against a transport until cancelled, the peer
    /// disappears, or the handshake gives up.
    pub async fn run<T: LineTransport>(
        &mut self,
        transport: &T,
        shutdown: CancellationToken,
    ) -> SimResult<SimReport> {
        let mut event_tick = tokio::time::interval(self.config.event_interval());
        let mut error_tick = tokio::time::interval(self.config.error_interval());
        let mut clear_tick = tokio::time::interval(self.config.clear_interval());
        for tick in [&mut event_tick, &mut error_tick, &mut clear_tick] {
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        let mut attempts_left = self.config.handshake_attempts;
        let mut next_handshake = Instant::now();

        loop {
            if shutdown.is_cancelled() {
                self.endpoint.discard_buffers();
                if self.endpoint.state() == LinkState::Connected {
                    let closing = self.endpoint.begin_close();
                    self.transmit(transport, &closing).await;
                }
                info!(
                    events = self.events_generated,
                    errors = self.errors_generated,
                    "simulator stopped"
                );
                return Ok(self.report());
            }

            if !transport.is_open() {
                return Err(LinkError::TransportClosed.into());
            }

            if self.endpoint.state() != LinkState::Connected {
                if attempts_left == 0 {
                    self.endpoint.handshake_timed_out();
                    return Err(LinkError::HandshakeTimeout {
                        attempts: self.config.handshake_attempts,
                    }
                    .into());
                }
                if Instant::now() >= next_handshake {
                    let listening = self.endpoint.start_handshake();
                    self.transmit(transport, &listening).await;
                    attempts_left -= 1;
                    next_handshake = Instant::now() + self.config.handshake_interval();
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => continue,
                _ = event_tick.tick() => {
                    let record = self.generator.next_event();
                    self.events_generated += 1;
                    if let Some(msg) = self.endpoint.queue_event(record) {
                        self.transmit(transport, &msg).await;
                    }
                }
                _ = error_tick.tick() => {
                    let record = self.generator.next_error();
                    self.errors_generated += 1;
                    self.unresolved.add_error(record.clone());
                    if let Some(msg) = self.endpoint.queue_error(record) {
                        self.transmit(transport, &msg).await;
                    }
                }
                _ = clear_tick.tick() => {
                    self.maybe_clear(transport).await;
                }
                read = transport.read_line(self.config.read_timeout()) => match read {
                    Ok(Some(line)) => {
                        let was_connected = self.endpoint.state() == LinkState::Connected;
                        let replies = self.endpoint.handle_line(&line);
                        if was_connected && self.endpoint.state() == LinkState::Disconnected {
                            attempts_left = self.config.handshake_attempts;
                            next_handshake = Instant::now();
                        }
                        for msg in replies {
                            self.transmit(transport, &msg).await;
                        }
                    }
                    Ok(None) => {}
                    Err(LinkError::TransportClosed) => {
                        return Err(LinkError::TransportClosed.into());
                    }
                    Err(error) => warn!(%error, "transport read failed"),
                },
            }
        }
    }

    /// Roll the clear chance and, on success, retire one unresolved error
    /// chosen by position. A clear must reach the peer in the same motion,
    /// so this is a no-op while the link is down; no-op too when nothing is
    /// unresolved.
    async fn maybe_clear<T: LineTransport>(&mut self, transport: &T) {
        if self.endpoint.state() != LinkState::Connected {
            return;
        }
        let live = self.unresolved.totals().errors;
        if live == 0 || !self.generator.roll(self.config.clear_probability) {
            return;
        }
        let pos = self.generator.pick(live);
        let Some(id) = self.unresolved.error_id_at(pos) else {
            return;
        };
        if let Some(msg) = self.endpoint.clear_error_local(id) {
            debug!(id, "clearing error");
            self.transmit(transport, &msg).await;
            self.unresolved.remove_error(id);
            self.errors_cleared += 1;
        }
    }

    async fn transmit<T: LineTransport>(&mut self, transport: &T, msg: &LinkMessage) {
        let line = LineCodec::encode(msg);
        match transport.write_line(&line).await {
            Ok(_) => self.sent.push(line),
            Err(error) => warn!(%error, kind = msg.kind_name(), "send failed"),
        }
    }

    fn report(&self) -> SimReport {
        let totals = self.endpoint.journal().totals();
        SimReport {
            events_generated: self.events_generated,
            errors_generated: self.errors_generated,
            errors_cleared: self.errors_cleared,
            lines_sent: self.sent.len(),
            journal_events: totals.events,
            journal_errors: totals.errors,
            journal_cleared: totals.cleared,
        }
    }
}
