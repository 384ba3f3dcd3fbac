use tracing::{debug, warn};

use opline_journal::Journal;
use opline_protocol::{DecodeError, LineCodec, LinkMessage};
use opline_store::LogStore;
use opline_types::{ErrorRecord, EventRecord, Record};

/// Connection state of one side of the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Handshake sent, awaiting BEGIN.
    Listening,
    Connected,
}

/// One side of the link protocol: the dispatcher that classifies inbound
/// messages and drives journal and log-store mutations.
///
/// The endpoint is transport-agnostic and synchronous; the session loop owns
/// the wire. While disconnected, locally generated records accumulate in
/// dump buffers that are flushed as one dump message per ledger on the
/// transition to `Connected`.
pub struct LinkEndpoint {
    state: LinkState,
    journal: Journal,
    store: Option<LogStore>,
    event_buffer: Vec<EventRecord>,
    error_buffer: Vec<ErrorRecord>,
    last_status: Option<Vec<String>>,
    last_electrical: Option<Vec<String>>,
}

impl LinkEndpoint {
    pub fn new() -> Self {
        Self::with_store(None)
    }

    pub fn with_store(store: Option<LogStore>) -> Self {
        Self {
            state: LinkState::Disconnected,
            journal: Journal::new(),
            store,
            event_buffer: Vec::new(),
            error_buffer: Vec::new(),
            last_status: None,
            last_electrical: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn journal_mut(&mut self) -> &mut Journal {
        &mut self.journal
    }

    pub fn store(&self) -> Option<&LogStore> {
        self.store.as_ref()
    }

    /// Buffered (event, error) record counts awaiting the next connect.
    pub fn buffered(&self) -> (usize, usize) {
        (self.event_buffer.len(), self.error_buffer.len())
    }

    /// Latest STATUS fields received, verbatim. Display-boundary data only.
    pub fn last_status(&self) -> Option<&[String]> {
        self.last_status.as_deref()
    }

    /// Latest ELECTRICAL fields received, verbatim.
    pub fn last_electrical(&self) -> Option<&[String]> {
        self.last_electrical.as_deref()
    }

    /// Decode and dispatch one raw inbound line.
    ///
    /// Malformed lines are dropped with a logged reason and change nothing.
    /// An unrecognized identifier means synchronization is broken: the
    /// endpoint forces itself to `Disconnected` and waits to be re-driven.
    pub fn handle_line(&mut self, line: &str) -> Vec<LinkMessage> {
        match LineCodec::decode(line) {
            Ok(msg) => self.handle_message(msg),
            Err(DecodeError::UnknownIdentifier(identifier)) => {
                warn!(%identifier, "unrecognized identifier, forcing disconnect");
                self.state = LinkState::Disconnected;
                Vec::new()
            }
            Err(reason) => {
                warn!(line, %reason, "inbound line dropped");
                Vec::new()
            }
        }
    }

    /// Dispatch one decoded message, returning the messages to transmit in
    /// response. The match is exhaustive over the closed message union.
    pub fn handle_message(&mut self, msg: LinkMessage) -> Vec<LinkMessage> {
        let mut out = Vec::new();
        match msg {
            LinkMessage::EventDump(records) => {
                debug!(count = records.len(), "event dump received");
                for record in records {
                    self.journal.add_event(record);
                }
                self.persist_merged();
            }
            LinkMessage::ErrorDump(records) => {
                debug!(count = records.len(), "error dump received");
                for record in records {
                    self.journal.add_error(record);
                }
                self.persist_merged();
            }
            LinkMessage::Event(record) => {
                self.journal.add_event(record.clone());
                self.persist_record(&Record::Event(record));
            }
            LinkMessage::Error(record) => {
                self.journal.add_error(record.clone());
                self.persist_record(&Record::Error(record));
            }
            LinkMessage::Status(fields) => {
                self.last_status = Some(fields);
            }
            LinkMessage::Electrical(fields) => {
                self.last_electrical = Some(fields);
            }
            LinkMessage::ClearError { id } => {
                if !self.journal.clear_error(id) {
                    warn!(id, "clear requested for unknown error id");
                }
            }
            LinkMessage::Listening => {
                // The peer is (re)starting its handshake; acknowledge and
                // treat the link as established.
                out.push(LinkMessage::Begin);
                if self.state != LinkState::Connected {
                    self.enter_connected(&mut out);
                }
            }
            LinkMessage::Begin => {
                if self.state == LinkState::Listening {
                    self.enter_connected(&mut out);
                } else {
                    debug!(state = ?self.state, "stray BEGIN ignored");
                }
            }
            LinkMessage::ClosingConnection => {
                // Free the journal so stale ids cannot collide with the
                // next session.
                debug!("closing received, dropping session journal");
                self.journal.clear();
                self.state = LinkState::Disconnected;
            }
        }
        out
    }

    /// Begin the handshake as initiator: returns the LISTENING message to
    /// transmit. Retried by the session loop on its interval.
    pub fn start_handshake(&mut self) -> LinkMessage {
        self.state = LinkState::Listening;
        LinkMessage::Listening
    }

    /// The handshake window elapsed without BEGIN.
    pub fn handshake_timed_out(&mut self) {
        warn!("handshake timed out, returning to disconnected");
        self.state = LinkState::Disconnected;
    }

    /// Start an orderly shutdown from this side: returns the closing message
    /// to transmit. The local journal is kept; only the receiving side frees.
    pub fn begin_close(&mut self) -> LinkMessage {
        self.state = LinkState::Disconnected;
        LinkMessage::ClosingConnection
    }

    /// Record a locally generated event. Connected: journal it and return
    /// the wire message. Disconnected: journal it and buffer for the next
    /// dump flush.
    pub fn queue_event(&mut self, record: EventRecord) -> Option<LinkMessage> {
        self.journal.add_event(record.clone());
        self.persist_record(&Record::Event(record.clone()));
        if self.state == LinkState::Connected {
            Some(LinkMessage::Event(record))
        } else {
            self.event_buffer.push(record);
            None
        }
    }

    /// Record a locally generated error, analogous to [`Self::queue_event`].
    pub fn queue_error(&mut self, record: ErrorRecord) -> Option<LinkMessage> {
        self.journal.add_error(record.clone());
        self.persist_record(&Record::Error(record.clone()));
        if self.state == LinkState::Connected {
            Some(LinkMessage::Error(record))
        } else {
            self.error_buffer.push(record);
            None
        }
    }

    /// Clear an error locally and produce the wire message that keeps the
    /// peer's journal consistent. `None` when no such id exists.
    pub fn clear_error_local(&mut self, id: u64) -> Option<LinkMessage> {
        if self.journal.clear_error(id) {
            Some(LinkMessage::ClearError { id })
        } else {
            None
        }
    }

    /// Drop buffered dump records without flushing (stop path).
    pub fn discard_buffers(&mut self) {
        self.event_buffer.clear();
        self.error_buffer.clear();
    }

    fn enter_connected(&mut self, out: &mut Vec<LinkMessage>) {
        debug!(
            buffered_events = self.event_buffer.len(),
            buffered_errors = self.error_buffer.len(),
            "link established"
        );
        self.state = LinkState::Connected;
        if !self.event_buffer.is_empty() {
            out.push(LinkMessage::EventDump(std::mem::take(
                &mut self.event_buffer,
            )));
        }
        if !self.error_buffer.is_empty() {
            out.push(LinkMessage::ErrorDump(std::mem::take(
                &mut self.error_buffer,
            )));
        }
    }

    /// Log-store writes are best-effort at this layer: a failed write is
    /// logged and the session proceeds without persistence.
    fn persist_record(&self, record: &Record) {
        if let Some(store) = &self.store {
            if let Err(error) = store.append_session_record(record) {
                warn!(%error, "log append failed");
            }
        }
    }

    fn persist_merged(&self) {
        if let Some(store) = &self.store {
            if let Err(error) = store.append_session_merged(&self.journal) {
                warn!(%error, "log dump append failed");
            }
        }
    }
}

impl Default for LinkEndpoint {
    fn default() -> Self {
        Self::new()
    }
}
