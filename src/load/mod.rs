// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Debounced background loading.
//!
//! [`run`] races a blocking fetch against a debounce timer: fast fetches complete
//! without any visible indicator, slow ones get a "still working" screen that is
//! guaranteed to be gone again by the time the outcome callback runs. The outcome
//! callback runs exactly once, on the UI task, whether the fetch succeeded, failed,
//! or panicked. There is no cancellation; callers that need exclusivity must gate
//! their own triggers.

use std::time::Duration;

use crate::client::ClientError;
use crate::sched::Scheduler;

/// Delay before a slow fetch puts up the busy indicator.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Shell surface toggled while a slow fetch is in flight.
pub trait BusyScreen {
    fn set_busy(&mut self, busy: bool);
}

/// Runs `fetch` on a blocking task and hands its result to `done` via the scheduler,
/// debouncing the busy indicator by [`DEBOUNCE`].
pub fn run<S, T, F, D>(sched: &Scheduler<S>, fetch: F, done: D)
where
    S: BusyScreen + 'static,
    T: Send + 'static,
    F: FnOnce() -> Result<T, ClientError> + Send + 'static,
    D: FnOnce(&mut S, Result<T, ClientError>) + Send + 'static,
{
    run_with_debounce(sched, DEBOUNCE, fetch, done);
}

pub fn run_with_debounce<S, T, F, D>(sched: &Scheduler<S>, debounce: Duration, fetch: F, done: D)
where
    S: BusyScreen + 'static,
    T: Send + 'static,
    F: FnOnce() -> Result<T, ClientError> + Send + 'static,
    D: FnOnce(&mut S, Result<T, ClientError>) + Send + 'static,
{
    let sched = sched.clone();
    tokio::spawn(async move {
        let mut fetch_task = tokio::task::spawn_blocking(fetch);

        let joined = tokio::select! {
            res = &mut fetch_task => res,
            _ = tokio::time::sleep(debounce) => {
                sched.schedule(|shell: &mut S| shell.set_busy(true));
                (&mut fetch_task).await
            }
        };
        let result = match joined {
            Ok(result) => result,
            Err(err) => Err(ClientError::Internal(format!("fetch task failed: {err}"))),
        };

        // One unit clears the indicator and reports the outcome, so the indicator
        // can never outlive the callback nor hide a second one.
        sched.schedule(move |shell: &mut S| {
            shell.set_busy(false);
            done(shell, result);
        });
    });
}

/// Like [`run`] but without the busy indicator, for background refreshes that
/// must not put a modal over whatever page the user is on.
pub fn run_quiet<S, T, F, D>(sched: &Scheduler<S>, fetch: F, done: D)
where
    S: 'static,
    T: Send + 'static,
    F: FnOnce() -> Result<T, ClientError> + Send + 'static,
    D: FnOnce(&mut S, Result<T, ClientError>) + Send + 'static,
{
    let sched = sched.clone();
    tokio::spawn(async move {
        let joined = tokio::task::spawn_blocking(fetch).await;
        let result = match joined {
            Ok(result) => result,
            Err(err) => Err(ClientError::Internal(format!("fetch task failed: {err}"))),
        };
        sched.schedule(move |shell: &mut S| done(shell, result));
    });
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;

    use super::{run_quiet, run_with_debounce, BusyScreen};
    use crate::client::ClientError;
    use crate::sched::{self, Work};

    #[derive(Default)]
    struct Shell {
        events: Vec<&'static str>,
        done: bool,
    }

    impl BusyScreen for Shell {
        fn set_busy(&mut self, busy: bool) {
            self.events.push(if busy { "busy-on" } else { "busy-off" });
        }
    }

    async fn drain_until_done(rx: &mut UnboundedReceiver<Work<Shell>>) -> Shell {
        let mut shell = Shell::default();
        while !shell.done {
            let work = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("scheduled work within deadline")
                .expect("scheduler alive");
            work(&mut shell);
        }
        shell
    }

    #[tokio::test]
    async fn fast_fetch_never_shows_the_indicator() {
        let (sched, mut rx) = sched::channel::<Shell>();
        run_with_debounce(
            &sched,
            Duration::from_millis(400),
            || {
                thread::sleep(Duration::from_millis(10));
                Ok(42)
            },
            |shell, result| {
                assert_eq!(result, Ok(42));
                shell.events.push("done");
                shell.done = true;
            },
        );

        let shell = drain_until_done(&mut rx).await;
        assert_eq!(shell.events, vec!["busy-off", "done"]);
    }

    #[tokio::test]
    async fn slow_fetch_shows_then_removes_the_indicator_before_the_callback() {
        let (sched, mut rx) = sched::channel::<Shell>();
        run_with_debounce(
            &sched,
            Duration::from_millis(50),
            || {
                thread::sleep(Duration::from_millis(300));
                Ok("loaded")
            },
            |shell, result| {
                assert_eq!(result, Ok("loaded"));
                shell.events.push("done");
                shell.done = true;
            },
        );

        let shell = drain_until_done(&mut rx).await;
        assert_eq!(shell.events, vec!["busy-on", "busy-off", "done"]);
    }

    #[tokio::test]
    async fn quiet_run_never_shows_the_indicator_even_when_slow() {
        let (sched, mut rx) = sched::channel::<Shell>();
        run_quiet(
            &sched,
            || {
                thread::sleep(Duration::from_millis(200));
                Ok(7)
            },
            |shell, result| {
                assert_eq!(result, Ok(7));
                shell.events.push("done");
                shell.done = true;
            },
        );

        let shell = drain_until_done(&mut rx).await;
        assert_eq!(shell.events, vec!["done"]);
    }

    #[tokio::test]
    async fn failure_reaches_the_callback_exactly_once() {
        let (sched, mut rx) = sched::channel::<Shell>();
        run_with_debounce(
            &sched,
            Duration::from_millis(400),
            || -> Result<(), ClientError> { Err(ClientError::Network("offline".to_owned())) },
            |shell, result| {
                assert_eq!(result, Err(ClientError::Network("offline".to_owned())));
                shell.events.push("done");
                shell.done = true;
            },
        );

        let mut shell = drain_until_done(&mut rx).await;
        // Nothing further may arrive for this load.
        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(work) = rx.try_recv() {
            work(&mut shell);
        }
        assert_eq!(shell.events, vec!["busy-off", "done"]);
    }

    #[tokio::test]
    async fn panicking_fetch_surfaces_an_internal_error() {
        let (sched, mut rx) = sched::channel::<Shell>();
        run_with_debounce(
            &sched,
            Duration::from_millis(400),
            || -> Result<(), ClientError> { panic!("fetch bug") },
            |shell, result| {
                assert!(matches!(result, Err(ClientError::Internal(_))));
                shell.done = true;
            },
        );

        drain_until_done(&mut rx).await;
    }
}
