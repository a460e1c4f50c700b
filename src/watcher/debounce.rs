use crate::watcher::{WatchEvent, WatchKind, WatchMessage};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, sleep_until};

struct Pending {
    kind: WatchKind,
    deadline: Instant,
    seq: u64,
}

/// Coalesces bursts of events for the same path.
///
/// Every event restarts its path's timer; when a timer expires the merged
/// event is forwarded. Errors are forwarded immediately.
pub struct Debouncer {
    pending: HashMap<PathBuf, Pending>,
    output_tx: UnboundedSender<WatchMessage>,
    duration: Duration,
    next_seq: u64,
}

impl Debouncer {
    pub fn new(output_tx: UnboundedSender<WatchMessage>, duration: Duration) -> Self {
        Debouncer {
            pending: HashMap::new(),
            output_tx,
            duration,
            next_seq: 0,
        }
    }

    pub async fn run(mut self, mut input_rx: UnboundedReceiver<WatchMessage>) {
        loop {
            let next_deadline = self.pending.values().map(|p| p.deadline).min();

            tokio::select! {
                msg = input_rx.recv() => match msg {
                    Some(Ok(event)) => self.push(event),
                    Some(Err(e)) => {
                        if self.output_tx.send(Err(e)).is_err() {
                            return;
                        }
                    }
                    None => {
                        // NOTE: source is gone, flush what is left then stop.
                        self.flush(None);
                        return;
                    }
                },
                _ = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                    if !self.flush(Some(Instant::now())) {
                        return;
                    }
                }
            }
        }
    }

    fn push(&mut self, event: WatchEvent) {
        let deadline = Instant::now() + self.duration;
        let seq = self.next_seq;
        self.next_seq += 1;

        let kind = match self.pending.remove(&event.path) {
            Some(prev) => merge(prev.kind, event.kind),
            None => event.kind,
        };

        self.pending.insert(
            event.path,
            Pending {
                kind,
                deadline,
                seq,
            },
        );
    }

    /// Sends every pending event due at `now` (all of them for `None`) in the
    /// order their timers were last restarted. Returns false once the
    /// receiving side has gone away.
    fn flush(&mut self, now: Option<Instant>) -> bool {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, p)| now.is_none_or(|now| p.deadline <= now))
            .map(|(path, _)| path.clone())
            .collect();

        let mut ready: Vec<(u64, WatchEvent)> = due
            .into_iter()
            .filter_map(|path| {
                self.pending
                    .remove(&path)
                    .map(|p| (p.seq, WatchEvent::new(p.kind, path)))
            })
            .collect();
        ready.sort_by_key(|(seq, _)| *seq);

        for (_, event) in ready {
            if self.output_tx.send(Ok(event)).is_err() {
                return false;
            }
        }
        true
    }
}

/// Folds a newer event kind into the one already pending for a path.
pub fn merge(prev: WatchKind, next: WatchKind) -> WatchKind {
    use WatchKind::*;

    match (prev, next) {
        (Created, Modified) => Created,
        (Created, Deleted) => Deleted,
        (Deleted, Created) | (Deleted, Modified) => Modified,
        (Modified, Created) => Modified,
        (_, next) => next,
    }
}
