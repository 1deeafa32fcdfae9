// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Redraw scheduling.
//!
//! [`Scheduler`] is the one synchronization point between background tasks and the
//! display. Any task may hand it a unit of work; the units are executed one at a time
//! by the single consumer of the paired channel (the UI loop), which holds exclusive
//! `&mut S` access while running each unit. Serialization is therefore a property of
//! ownership, not locking: two units can never observe the shell concurrently.

use tokio::sync::mpsc;

/// A scheduled unit of display work.
pub type Work<S> = Box<dyn FnOnce(&mut S) + Send>;

pub struct Scheduler<S> {
    tx: mpsc::UnboundedSender<Work<S>>,
}

// Manual impl: `S` itself need not be Clone.
impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Creates a scheduler and the work stream its consumer drains.
pub fn channel<S>() -> (Scheduler<S>, mpsc::UnboundedReceiver<Work<S>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Scheduler { tx }, rx)
}

impl<S> Scheduler<S> {
    /// Queues `work` to run on the consumer, after all previously scheduled work.
    ///
    /// Never blocks and is safe to call from any task, including from inside a
    /// running unit. Once the consumer has shut down, work is silently discarded.
    pub fn schedule(&self, work: impl FnOnce(&mut S) + Send + 'static) {
        let _ = self.tx.send(Box::new(work));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::channel;

    #[derive(Default)]
    struct Log {
        entries: Vec<(usize, usize)>,
    }

    #[tokio::test]
    async fn executes_in_submission_order_from_one_task() {
        let (sched, mut rx) = channel::<Log>();
        for i in 0..100 {
            sched.schedule(move |log: &mut Log| log.entries.push((0, i)));
        }
        drop(sched);

        let mut log = Log::default();
        while let Some(work) = rx.recv().await {
            work(&mut log);
        }
        let order: Vec<usize> = log.entries.iter().map(|&(_, i)| i).collect();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn units_never_overlap_under_concurrent_scheduling() {
        const TASKS: usize = 50;
        const PER_TASK: usize = 20;

        let (sched, mut rx) = channel::<Log>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for task in 0..TASKS {
            let sched = sched.clone();
            let in_flight = in_flight.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..PER_TASK {
                    let in_flight = in_flight.clone();
                    sched.schedule(move |log: &mut Log| {
                        // Overlapping execution would be visible as a nested entry.
                        assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                        log.entries.push((task, i));
                        assert_eq!(in_flight.fetch_sub(1, Ordering::SeqCst), 1);
                    });
                    tokio::task::yield_now().await;
                }
            }));
        }
        drop(sched);

        let consumer = tokio::spawn(async move {
            let mut log = Log::default();
            while let Some(work) = rx.recv().await {
                work(&mut log);
            }
            log
        });

        for handle in handles {
            handle.await.expect("producer task");
        }
        let log = consumer.await.expect("consumer task");

        // Nothing dropped, and each task's own units ran in its submission order.
        assert_eq!(log.entries.len(), TASKS * PER_TASK);
        for task in 0..TASKS {
            let seen: Vec<usize> =
                log.entries.iter().filter(|&&(t, _)| t == task).map(|&(_, i)| i).collect();
            assert_eq!(seen, (0..PER_TASK).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn schedule_after_shutdown_is_a_noop() {
        let (sched, rx) = channel::<Log>();
        drop(rx);
        sched.schedule(|log: &mut Log| log.entries.push((0, 0)));
    }
}
