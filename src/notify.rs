//! Change notification: a multicast stream of changed key names.

use parking_lot::Mutex;
use std::sync::mpsc;
use std::time::Duration;

/// Fans changed keys out to every live [`ChangeStream`].
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<mpsc::Sender<String>>>,
}

impl ChangeNotifier {
    /// Notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It sees only changes emitted after this call.
    pub fn subscribe(&self) -> ChangeStream {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        ChangeStream { rx }
    }

    /// `true` if anyone might be listening. Streams dropped since the last
    /// emission still count until then.
    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.lock().is_empty()
    }

    /// Send `keys` to every subscriber, last key first. Subscribers whose
    /// stream is gone are dropped.
    pub fn emit(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        self.subscribers
            .lock()
            .retain(|tx| keys.iter().rev().all(|k| tx.send(k.clone()).is_ok()));
    }
}

/// Receiving end of a store's change notifications.
///
/// Iterating blocks until the next key arrives and ends once the store and
/// all its handles are gone.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::Receiver<String>,
}

impl ChangeStream {
    /// Block for the next changed key. `None` once the store is gone.
    pub fn recv(&self) -> Option<String> {
        self.rx.recv().ok()
    }

    /// Next changed key if one is already waiting.
    pub fn try_recv(&self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next changed key.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Everything received so far, without blocking.
    pub fn drain(&self) -> Vec<String> {
        self.rx.try_iter().collect()
    }
}

impl Iterator for ChangeStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.recv()
    }
}
