use crate::Message;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A bidirectional message pipe to one peer.
///
/// Concrete adaptors (sockets, workers, ...) feed their decoded frames into
/// `incoming` and drain `outgoing` onto the wire.
pub struct Transport {
    pub(crate) outgoing: UnboundedSender<Message>,
    pub(crate) incoming: UnboundedReceiver<Message>,
}

impl Transport {
    pub fn new(outgoing: UnboundedSender<Message>, incoming: UnboundedReceiver<Message>) -> Self {
        Self { outgoing, incoming }
    }

    /// Two transports wired to each other in memory
    pub fn pair() -> (Transport, Transport) {
        let (left_tx, left_rx) = mpsc::unbounded_channel();
        let (right_tx, right_rx) = mpsc::unbounded_channel();

        (
            Transport::new(left_tx, right_rx),
            Transport::new(right_tx, left_rx),
        )
    }
}
