//! Duplex text-message channel abstraction.
//!
//! The dispatcher and the invoker only ever see a [`MessageChannel`]; framing,
//! handshakes and connection setup belong to the implementations.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::{TransportError, TransportResult};

/// A bidirectional stream of whole text messages.
pub trait MessageChannel: Send {
    /// Sends one text message.
    fn send(&mut self, text: String) -> impl Future<Output = TransportResult<()>> + Send;

    /// Receives the next text message.
    ///
    /// Returns `Ok(None)` once the peer has closed the channel.
    fn receive(&mut self) -> impl Future<Output = TransportResult<Option<String>>> + Send;

    /// Closes the channel. Closing twice is not an error.
    fn close(&mut self) -> impl Future<Output = TransportResult<()>> + Send;
}

/// One end of an in-process channel pair.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Creates two connected in-process channels.
///
/// Messages sent on one end are received on the other in order. Closing or
/// dropping one end ends the other end's stream.
pub fn memory_pair() -> (MemoryChannel, MemoryChannel) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();

    (
        MemoryChannel {
            tx: Some(a_tx),
            rx: a_rx,
        },
        MemoryChannel {
            tx: Some(b_tx),
            rx: b_rx,
        },
    )
}

impl MessageChannel for MemoryChannel {
    async fn send(&mut self, text: String) -> TransportResult<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(text).map_err(|_| TransportError::Closed)
    }

    async fn receive(&mut self) -> TransportResult<Option<String>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}
