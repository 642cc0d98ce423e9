//! Interrupt bridge.
//!
//! Native interrupt callbacks may run on a driver-owned thread. They never
//! touch node state; the handler only queues a [`Notification`] and the
//! event loop drains the queue in arrival order.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::trace;

use ctr700_common::hal::driver::InterruptHandler;

/// One interrupt: `(channel, value)` as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    /// Interrupt channel (DI number or run switch).
    pub channel: u8,
    /// Raw value, non-zero means high.
    pub value: u8,
}

/// Queue between interrupt context and the event loop.
///
/// Unbounded: notifications are never dropped on the producer side.
pub struct InterruptBridge {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
}

impl InterruptBridge {
    /// Create an empty bridge.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Callback to register with the driver.
    pub fn handler(&self) -> InterruptHandler {
        let tx = self.tx.clone();
        Arc::new(move |channel, value| {
            // Fails only once the bridge is gone; nothing left to notify.
            if tx.try_send(Notification { channel, value }).is_err() {
                trace!(channel, "Interrupt after bridge shutdown");
            }
        })
    }

    /// Receiving end, for `select!`.
    pub fn receiver(&self) -> &Receiver<Notification> {
        &self.rx
    }

    /// Next queued notification, if any.
    pub fn try_next(&self) -> Option<Notification> {
        match self.rx.try_recv() {
            Ok(n) => Some(n),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Number of queued notifications.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for InterruptBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_queues_in_order() {
        let bridge = InterruptBridge::new();
        let handler = bridge.handler();
        handler(3, 1);
        handler(3, 0);
        handler(0x80, 1);

        assert_eq!(bridge.pending(), 3);
        assert_eq!(bridge.try_next(), Some(Notification { channel: 3, value: 1 }));
        assert_eq!(bridge.try_next(), Some(Notification { channel: 3, value: 0 }));
        assert_eq!(
            bridge.try_next(),
            Some(Notification {
                channel: 0x80,
                value: 1
            })
        );
        assert_eq!(bridge.try_next(), None);
    }

    #[test]
    fn handler_callable_from_other_thread() {
        let bridge = InterruptBridge::new();
        let handler = bridge.handler();
        let producer = thread::spawn(move || {
            for value in 0..100u8 {
                handler(5, value % 2);
            }
        });
        producer.join().unwrap();

        let values: Vec<u8> = std::iter::from_fn(|| bridge.try_next())
            .map(|n| n.value)
            .collect();
        assert_eq!(values.len(), 100);
        assert!(values.iter().enumerate().all(|(i, &v)| v == (i % 2) as u8));
    }

    #[test]
    fn handler_outliving_bridge_is_harmless() {
        let bridge = InterruptBridge::new();
        let handler = bridge.handler();
        drop(bridge);
        handler(1, 1);
    }
}
