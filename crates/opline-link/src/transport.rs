use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::error::{LinkError, LinkResult};

/// Abstract byte-stream duplex at the transport boundary.
///
/// The concrete serial-port transport is an external collaborator; the core
/// only needs bounded line reads, line writes, and an open predicate. Reads
/// poll with a timeout so the run loop can observe a stop request promptly.
#[async_trait]
pub trait LineTransport: Send + Sync {
    /// Wait up to `timeout` for one full line. `Ok(None)` means would-block:
    /// no line arrived within the window.
    async fn read_line(&self, timeout: Duration) -> LinkResult<Option<String>>;

    /// Write one line, returning the byte count written.
    async fn write_line(&self, line: &str) -> LinkResult<usize>;

    fn is_open(&self) -> bool;
}

/// In-memory transport backed by unbounded channels.
///
/// One half of a pair created by [`channel_pair`]; used by tests and the
/// simulator's loopback demo in place of a serial port.
pub struct ChannelTransport {
    tx: UnboundedSender<String>,
    rx: Mutex<UnboundedReceiver<String>>,
    closed: Arc<AtomicBool>,
}

/// Create a connected pair of in-memory transports.
pub fn channel_pair() -> (ChannelTransport, ChannelTransport) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        ChannelTransport {
            tx: a_tx,
            rx: Mutex::new(b_rx),
            closed: Arc::clone(&closed),
        },
        ChannelTransport {
            tx: b_tx,
            rx: Mutex::new(a_rx),
            closed,
        },
    )
}

impl ChannelTransport {
    /// Close both halves of the pair.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LineTransport for ChannelTransport {
    async fn read_line(&self, timeout: Duration) -> LinkResult<Option<String>> {
        if !self.is_open() {
            return Err(LinkError::TransportClosed);
        }
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => {
                self.closed.store(true, Ordering::SeqCst);
                Err(LinkError::TransportClosed)
            }
            Err(_) => Ok(None),
        }
    }

    async fn write_line(&self, line: &str) -> LinkResult<usize> {
        if !self.is_open() {
            return Err(LinkError::TransportClosed);
        }
        self.tx
            .send(line.to_string())
            .map_err(|_| LinkError::TransportClosed)?;
        Ok(line.len())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_lines_both_ways() {
        let (a, b) = channel_pair();
        a.write_line("3,x,t,1,\n").await.unwrap();
        let line = b.read_line(Duration::from_millis(50)).await.unwrap();
        assert_eq!(line.as_deref(), Some("3,x,t,1,\n"));

        b.write_line("8,\n").await.unwrap();
        let line = a.read_line(Duration::from_millis(50)).await.unwrap();
        assert_eq!(line.as_deref(), Some("8,\n"));
    }

    #[tokio::test]
    async fn read_times_out_as_would_block() {
        let (a, _b) = channel_pair();
        let line = a.read_line(Duration::from_millis(10)).await.unwrap();
        assert!(line.is_none());
    }

    #[tokio::test]
    async fn close_propagates_to_both_halves() {
        let (a, b) = channel_pair();
        a.close();
        assert!(!a.is_open());
        assert!(!b.is_open());
        assert!(matches!(
            b.write_line("7,\n").await.unwrap_err(),
            LinkError::TransportClosed
        ));
    }
}
