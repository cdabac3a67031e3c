//! Typed event bus (C11): bridges an in-progress ingestion or search turn
//! to its client transport.
//!
//! A `tokio::sync::mpsc` bounded channel per connection, sized generously
//! so it behaves as "logically unbounded" under normal load (§4.11). The
//! producer side enforces the transport's flow-control contract itself:
//! [`EventSender::send`] is `timeout`-guarded and surfaces
//! [`lorekeeper_core::error::Error::ClientSlow`] if the consumer can't
//! keep up within the deadline, or
//! [`lorekeeper_core::error::Error::Cancelled`] if the consumer is simply
//! gone (the client disconnected).

use std::time::Duration;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::events::Event;
use tokio::sync::mpsc;

/// Channel capacity standing in for "logically unbounded" (§4.11).
const CHANNEL_CAPACITY: usize = 256;

/// How long a single frame send may block before the turn fails with
/// [`Error::ClientSlow`].
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (EventSender { tx }, EventReceiver { rx })
}

/// The producer half, held by the task driving an ingestion or search turn.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    /// Send one frame. Fails with [`Error::Cancelled`] if the receiver has
    /// been dropped (the client transport is gone), or [`Error::ClientSlow`]
    /// if the receiver is still attached but didn't accept the frame within
    /// [`SEND_TIMEOUT`] (transport write back-pressure).
    pub async fn send(&self, event: Event) -> Result<()> {
        match tokio::time::timeout(SEND_TIMEOUT, self.tx.send(event)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Error::Cancelled),
            Err(_) => Err(Error::ClientSlow),
        }
    }
}

/// The consumer half, drained by the transport (WebSocket write loop).
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl tokio_stream::Stream for EventReceiver {
    type Item = Event;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeeper_core::events::Event;

    #[tokio::test]
    async fn send_then_recv_round_trips_an_event() {
        let (tx, mut rx) = channel();
        tx.send(Event::status("retrieving")).await.unwrap();
        let got = rx.recv().await.unwrap();
        assert!(matches!(got, Event::Status(_)));
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_is_cancelled() {
        let (tx, rx) = channel();
        drop(rx);
        let err = tx
            .send(Event::done(Some("session-1".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "Cancelled");
    }

    #[tokio::test]
    async fn events_are_delivered_fifo() {
        let (tx, mut rx) = channel();
        tx.send(Event::status("a")).await.unwrap();
        tx.send(Event::status("b")).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Event::Status(s) if s == "a"));
        assert!(matches!(second, Event::Status(s) if s == "b"));
    }
}
