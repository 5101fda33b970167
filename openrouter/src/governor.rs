//! Request governor: serializes, rate-limits, and retries API calls.
//!
//! All traffic to the API flows through a [`RequestGovernor`]. It keeps a
//! priority queue of pending tasks and drains them one at a time, enforcing
//! a sliding-window request ceiling and a minimum spacing between request
//! starts. Transient rate-limit failures are retried with capped backoff;
//! every other error propagates to the caller immediately.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::{interval, sleep, Instant};
use tracing::{debug, warn};

use crate::Error;

/// Safety margin added when waiting for the rate window to open up.
const RATE_WINDOW_MARGIN: Duration = Duration::from_millis(500);

/// Cap on the backoff delay between retries of a rate-limited task.
const MAX_RETRY_DELAY: Duration = Duration::from_millis(10_000);

/// Tuning knobs for the governor.
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Minimum spacing between successive request starts.
    pub min_delay: Duration,
    /// Maximum attempts per task before its error propagates.
    pub max_retries: u32,
    /// Ceiling on completed requests within the trailing window.
    pub max_requests_per_window: usize,
    /// Length of the trailing rate-limit window.
    pub window: Duration,
    /// How often old completion timestamps are pruned.
    pub prune_interval: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_retries: 5,
            max_requests_per_window: 20,
            window: Duration::from_secs(60),
            prune_interval: Duration::from_secs(5),
        }
    }
}

/// One attempt of a queued task. Re-invocable so the drain loop can retry.
type AttemptFn = Box<dyn FnMut() -> BoxFuture<'static, Result<(), Error>> + Send>;

/// Delivers the terminal error to the caller when retries are exhausted.
type FailFn = Box<dyn FnOnce(Error) + Send>;

struct Queued {
    priority: i32,
    run: AttemptFn,
    fail: FailFn,
}

struct State {
    queue: Vec<Queued>,
    draining: bool,
    last_request_at: Option<Instant>,
    /// Completion instants within the trailing window. Length is the one
    /// ground truth for "requests used in this window".
    window: Vec<Instant>,
}

struct Shared {
    config: GovernorConfig,
    state: Mutex<State>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("governor state poisoned")
    }
}

/// Serializes all API work through a single rate-limited drain loop.
///
/// Cheap to clone; clones share the same queue and window accounting.
/// Construct one per process and hand it to everything that needs throttled
/// access, rather than reaching for an ambient singleton.
#[derive(Clone)]
pub struct RequestGovernor {
    shared: Arc<Shared>,
}

impl RequestGovernor {
    /// Create a governor. Must be called within a tokio runtime: the
    /// periodic window-pruning task is spawned here.
    pub fn new(config: GovernorConfig) -> Self {
        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(State {
                queue: Vec::new(),
                draining: false,
                last_request_at: None,
                window: Vec::new(),
            }),
        });
        tokio::spawn(prune_loop(Arc::downgrade(&shared)));
        Self { shared }
    }

    /// Enqueue a task at the given priority (higher drains first; ties drain
    /// in arrival order). The task is registered before this returns; await
    /// the returned future for the task's result or terminal error.
    ///
    /// The task closure is invoked once per attempt, so it must be able to
    /// produce a fresh future each time.
    pub fn enqueue<T, F, Fut>(
        &self,
        mut task: F,
        priority: i32,
    ) -> impl Future<Output = Result<T, Error>>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<T, Error>>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let done = Arc::clone(&tx);
        let run: AttemptFn = Box::new(move || {
            let fut = task();
            let done = Arc::clone(&done);
            async move {
                let value = fut.await?;
                if let Some(tx) = done.lock().expect("completion handle poisoned").take() {
                    let _ = tx.send(Ok(value));
                }
                Ok(())
            }
            .boxed()
        });
        let fail: FailFn = Box::new(move |err| {
            if let Some(tx) = tx.lock().expect("completion handle poisoned").take() {
                let _ = tx.send(Err(err));
            }
        });

        {
            let mut state = self.shared.lock_state();
            state.queue.push(Queued {
                priority,
                run,
                fail,
            });
            // Stable sort: equal priorities keep their arrival order.
            state.queue.sort_by_key(|t| std::cmp::Reverse(t.priority));
            if !state.draining {
                state.draining = true;
                tokio::spawn(drain(Arc::clone(&self.shared)));
            }
        }

        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(Error::GovernorShutdown),
            }
        }
    }
}

impl Default for RequestGovernor {
    fn default() -> Self {
        Self::new(GovernorConfig::default())
    }
}

/// The single drain loop. Exactly one task's work is in flight at a time;
/// a new cycle starts immediately after each task settles.
async fn drain(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.lock_state();
            if state.queue.is_empty() {
                state.draining = false;
                return;
            }
            state.queue.remove(0)
        };

        // Admission: hold the drain until the trailing window has room.
        let wait = {
            let now = Instant::now();
            let mut state = shared.lock_state();
            let window = shared.config.window;
            state.window.retain(|t| now.duration_since(*t) < window);
            if state.window.len() >= shared.config.max_requests_per_window {
                state.window.iter().min().map(|oldest| {
                    (*oldest + window + RATE_WINDOW_MARGIN).saturating_duration_since(now)
                })
            } else {
                None
            }
        };
        if let Some(wait) = wait {
            warn!(wait_ms = wait.as_millis() as u64, "request window full, pausing drain");
            sleep(wait).await;
        }

        // Minimum spacing between request starts.
        let gap = {
            let state = shared.lock_state();
            state.last_request_at.map(|last| {
                (last + shared.config.min_delay).saturating_duration_since(Instant::now())
            })
        };
        if let Some(gap) = gap.filter(|g| !g.is_zero()) {
            debug!(delay_ms = gap.as_millis() as u64, "spacing requests");
            sleep(gap).await;
        }

        let Queued { mut run, fail, .. } = task;
        match run_with_retries(&shared.config, &mut run).await {
            Ok(()) => {
                let now = Instant::now();
                let mut state = shared.lock_state();
                state.last_request_at = Some(now);
                state.window.push(now);
            }
            Err(err) => fail(err),
        }
    }
}

async fn run_with_retries(config: &GovernorConfig, run: &mut AttemptFn) -> Result<(), Error> {
    let mut attempt: u32 = 1;
    loop {
        match run().await {
            Ok(()) => return Ok(()),
            Err(err) => {
                if attempt >= config.max_retries || !err.is_rate_limited() {
                    warn!(attempt, error = %err, "task failed");
                    return Err(err);
                }
                let delay =
                    Duration::from_millis(2000 * u64::from(attempt)).min(MAX_RETRY_DELAY);
                warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient API failure, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Periodically prunes completion timestamps older than the window so the
/// tracking list stays bounded. Holds only a weak reference: dropping the
/// last governor handle stops the loop.
async fn prune_loop(shared: Weak<Shared>) {
    let period = match shared.upgrade() {
        Some(shared) => shared.config.prune_interval,
        None => return,
    };
    let mut ticker = interval(period);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else { return };
        let now = Instant::now();
        let window = shared.config.window;
        shared
            .lock_state()
            .window
            .retain(|t| now.duration_since(*t) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn immediate_config() -> GovernorConfig {
        GovernorConfig {
            min_delay: Duration::ZERO,
            ..GovernorConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drains_by_priority_then_arrival() {
        let governor = RequestGovernor::new(immediate_config());
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for (label, priority) in [("a", 0), ("b", 5), ("c", 1), ("d", 5), ("e", 0)] {
            let order = Arc::clone(&order);
            handles.push(governor.enqueue(
                move || {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().unwrap().push(label);
                        Ok::<_, Error>(())
                    }
                },
                priority,
            ));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["b", "d", "c", "a", "e"]);
    }

    #[tokio::test(start_paused = true)]
    async fn enforces_window_ceiling() {
        let governor = RequestGovernor::new(GovernorConfig {
            min_delay: Duration::ZERO,
            max_requests_per_window: 3,
            window: Duration::from_secs(60),
            ..GovernorConfig::default()
        });
        let starts = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let starts = Arc::clone(&starts);
            handles.push(governor.enqueue(
                move || {
                    let starts = Arc::clone(&starts);
                    async move {
                        starts.lock().unwrap().push(Instant::now());
                        Ok::<_, Error>(())
                    }
                },
                0,
            ));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let starts = starts.lock().unwrap();
        // First three fit the window; the fourth waits for it to open up.
        assert!(starts[2] - starts[0] < Duration::from_secs(1));
        assert!(starts[3] - starts[0] >= Duration::from_secs(60));
        // Pruning frees the whole window, so the fifth follows right away.
        assert!(starts[4] - starts[3] < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_request_starts() {
        let governor = RequestGovernor::new(GovernorConfig {
            min_delay: Duration::from_millis(1000),
            ..GovernorConfig::default()
        });
        let starts = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let starts = Arc::clone(&starts);
            handles.push(governor.enqueue(
                move || {
                    let starts = Arc::clone(&starts);
                    async move {
                        starts.lock().unwrap().push(Instant::now());
                        Ok::<_, Error>(())
                    }
                },
                0,
            ));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let starts = starts.lock().unwrap();
        assert!(starts[1] - starts[0] >= Duration::from_millis(1000));
        assert!(starts[2] - starts[1] >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limited_tasks_with_backoff() {
        let governor = RequestGovernor::new(immediate_config());
        let attempts = Arc::new(Mutex::new(0u32));
        let begin = Instant::now();

        let seen = Arc::clone(&attempts);
        let result = governor
            .enqueue(
                move || {
                    let seen = Arc::clone(&seen);
                    async move {
                        let mut n = seen.lock().unwrap();
                        *n += 1;
                        if *n <= 2 {
                            Err(Error::Api {
                                status: 429,
                                message: "too many requests".into(),
                            })
                        } else {
                            Ok(*n)
                        }
                    }
                },
                0,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(*attempts.lock().unwrap(), 3);
        // Backoff before retry i is min(2000 * i, 10000) ms.
        assert!(begin.elapsed() >= Duration::from_millis(2000 + 4000));
    }

    #[tokio::test(start_paused = true)]
    async fn non_rate_limit_errors_fail_immediately() {
        let governor = RequestGovernor::new(immediate_config());
        let attempts = Arc::new(Mutex::new(0u32));

        let seen = Arc::clone(&attempts);
        let result: Result<(), Error> = governor
            .enqueue(
                move || {
                    let seen = Arc::clone(&seen);
                    async move {
                        *seen.lock().unwrap() += 1;
                        Err(Error::Api {
                            status: 500,
                            message: "server fell over".into(),
                        })
                    }
                },
                0,
            )
            .await;

        assert_eq!(*attempts.lock().unwrap(), 1);
        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_the_last_error() {
        let governor = RequestGovernor::new(GovernorConfig {
            min_delay: Duration::ZERO,
            max_retries: 3,
            ..GovernorConfig::default()
        });
        let attempts = Arc::new(Mutex::new(0u32));

        let seen = Arc::clone(&attempts);
        let result: Result<(), Error> = governor
            .enqueue(
                move || {
                    let seen = Arc::clone(&seen);
                    async move {
                        *seen.lock().unwrap() += 1;
                        Err(Error::Api {
                            status: 429,
                            message: "rate limit".into(),
                        })
                    }
                },
                0,
            )
            .await;

        assert_eq!(*attempts.lock().unwrap(), 3);
        assert!(matches!(result, Err(Error::Api { status: 429, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tasks_do_not_count_against_the_window() {
        let governor = RequestGovernor::new(GovernorConfig {
            min_delay: Duration::ZERO,
            max_requests_per_window: 1,
            window: Duration::from_secs(60),
            ..GovernorConfig::default()
        });

        let failed: Result<(), Error> = governor
            .enqueue(
                || async {
                    Err(Error::Api {
                        status: 500,
                        message: "boom".into(),
                    })
                },
                0,
            )
            .await;
        assert!(failed.is_err());

        // The failure left the window empty, so this runs without waiting.
        let begin = Instant::now();
        governor
            .enqueue(|| async { Ok::<_, Error>(()) }, 0)
            .await
            .unwrap();
        assert!(begin.elapsed() < Duration::from_secs(1));
    }
}
