//! Event channel built on crossbeam-channel.
//!
//! Senders are cheap to clone and safe to share across scan workers.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Event;

/// Sending half handed to the engine.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Wrap a raw crossbeam sender.
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send an event.
    ///
    /// A dropped receiver silently discards the event, so progress
    /// reporting is always optional.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half held by a UI layer.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create an unbounded channel.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Create a bounded channel; senders block when a slow UI falls behind.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        EventChannel
    }
}

/// A sender whose events go nowhere.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

/// Decides which of many concurrent progress ticks get reported.
///
/// Emits on every `interval`-th tick and always on the final one, so a UI
/// sees steady progress without one event per file on huge scans.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    ticks: AtomicUsize,
    interval: usize,
    total: usize,
}

impl ProgressThrottle {
    pub(crate) fn new(total: usize) -> Self {
        // Roughly 200 updates per scan, never fewer than one per file on small scans
        let interval = (total / 200).max(1);
        Self {
            ticks: AtomicUsize::new(0),
            interval,
            total,
        }
    }

    /// Record one finished item. Returns the running count when it should be reported.
    pub(crate) fn tick(&self) -> Option<usize> {
        let count = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if count % self.interval == 0 || count == self.total {
            Some(count)
        } else {
            None
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, ScanEvent, ScanProgress};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                processed: 5,
                total: 25,
                current_path: PathBuf::from("/test/a.png"),
            })));
        });

        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Scan(ScanEvent::Progress(p)) => assert_eq!(p.total, 25),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Started));
    }

    #[test]
    fn bounded_channel_respects_capacity() {
        let (sender, receiver) = EventChannel::bounded(2);

        sender.send(Event::Pipeline(PipelineEvent::Started));
        sender.send(Event::Pipeline(PipelineEvent::Started));

        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn throttle_reports_every_tick_on_small_scans() {
        let throttle = ProgressThrottle::new(3);
        assert_eq!(throttle.tick(), Some(1));
        assert_eq!(throttle.tick(), Some(2));
        assert_eq!(throttle.tick(), Some(3));
    }

    #[test]
    fn throttle_thins_large_scans_but_reports_the_last_tick() {
        let throttle = ProgressThrottle::new(1000);
        let reported: Vec<usize> = (0..1000).filter_map(|_| throttle.tick()).collect();

        assert_eq!(reported.len(), 200);
        assert_eq!(reported.last(), Some(&1000));
        assert_eq!(throttle.count(), 1000);
    }
}
