//! Processing guard between the report reader and the engine
//!
//! The reader offers every report; a report that arrives while the previous
//! one is still being processed is dropped, not queued. The busy flag is held
//! by a [`BusyToken`] travelling with the report and cleared when the token
//! is dropped, whatever way the cycle ends.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

/// What the reader hands to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Raw HID input report
    Report(Vec<u8>),
    /// The controller went away; held outputs must be released
    Disconnected,
}

/// Result of offering an input to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    /// A cycle was in progress
    Dropped,
    /// The engine side is gone
    Closed,
}

/// Holds the busy flag for the duration of one cycle
#[derive(Debug)]
pub struct BusyToken {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

type Slot = (Input, BusyToken);

/// Producer side, owned by the reader
#[derive(Debug, Clone)]
pub struct ReportGate {
    busy: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    tx: mpsc::Sender<Slot>,
}

/// Consumer side, owned by the worker
#[derive(Debug)]
pub struct ReportInbox {
    rx: mpsc::Receiver<Slot>,
}

/// Create a connected gate and inbox
pub fn report_channel() -> (ReportGate, ReportInbox) {
    let (tx, rx) = mpsc::channel(1);
    let gate = ReportGate {
        busy: Arc::new(AtomicBool::new(false)),
        dropped: Arc::new(AtomicU64::new(0)),
        tx,
    };
    (gate, ReportInbox { rx })
}

impl ReportGate {
    fn acquire(&self) -> Option<BusyToken> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyToken {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Hand `input` to the engine unless a cycle is in progress. Never blocks.
    pub fn offer(&self, input: Input) -> Offer {
        let Some(token) = self.acquire() else {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            trace!("Report dropped while busy ({total} total)");
            return Offer::Dropped;
        };

        match self.tx.try_send((input, token)) {
            Ok(()) => Offer::Accepted,
            // The token inside the returned value is dropped here
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Offer::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Deliver `input` even if a cycle is in progress, waiting for it to end.
    ///
    /// For notices that must not be lost. Blocks the calling thread; do not
    /// call from async code.
    pub fn deliver_blocking(&self, input: Input) -> Offer {
        let token = loop {
            if self.tx.is_closed() {
                return Offer::Closed;
            }
            if let Some(token) = self.acquire() {
                break token;
            }
            std::thread::sleep(Duration::from_millis(1));
        };
        match self.tx.blocking_send((input, token)) {
            Ok(()) => Offer::Accepted,
            Err(_) => Offer::Closed,
        }
    }

    /// Reports dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl ReportInbox {
    /// Next input with its busy token; `None` once every gate is dropped
    pub async fn recv(&mut self) -> Option<(Input, BusyToken)> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drop_while_busy() {
        let (gate, mut inbox) = report_channel();
        assert_eq!(gate.offer(Input::Report(vec![1])), Offer::Accepted);
        assert!(gate.is_busy());
        assert_eq!(gate.offer(Input::Report(vec![2])), Offer::Dropped);
        assert_eq!(gate.offer(Input::Report(vec![3])), Offer::Dropped);
        assert_eq!(gate.dropped(), 2);

        let (input, token) = inbox.recv().await.unwrap();
        assert_eq!(input, Input::Report(vec![1]));
        // Still busy until the cycle finishes
        assert_eq!(gate.offer(Input::Report(vec![4])), Offer::Dropped);
        drop(token);

        assert!(!gate.is_busy());
        assert_eq!(gate.offer(Input::Report(vec![5])), Offer::Accepted);
        let (input, _token) = inbox.recv().await.unwrap();
        assert_eq!(input, Input::Report(vec![5]));
    }

    #[tokio::test]
    async fn test_released_on_failed_cycle() {
        fn failing_cycle(_input: Input, _token: BusyToken) -> Result<(), &'static str> {
            Err("decode failed")
        }

        let (gate, mut inbox) = report_channel();
        gate.offer(Input::Report(vec![0; 3]));
        let (input, token) = inbox.recv().await.unwrap();
        assert!(failing_cycle(input, token).is_err());
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_closed_inbox() {
        let (gate, inbox) = report_channel();
        drop(inbox);
        assert_eq!(gate.offer(Input::Disconnected), Offer::Closed);
        assert!(!gate.is_busy());
        assert_eq!(gate.deliver_blocking(Input::Disconnected), Offer::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deliver_waits_for_cycle() {
        let (gate, mut inbox) = report_channel();
        gate.offer(Input::Report(vec![1]));
        let (_, token) = inbox.recv().await.unwrap();

        let reader = gate.clone();
        let handle = std::thread::spawn(move || reader.deliver_blocking(Input::Disconnected));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(token);

        let (input, _token) = inbox.recv().await.unwrap();
        assert_eq!(input, Input::Disconnected);
        assert_eq!(handle.join().unwrap(), Offer::Accepted);
    }
}
