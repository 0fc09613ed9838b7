//! Runs detection strategies on a bounded worker pool.
//!
//! Workers report `Started` and `Finished` events over a channel. The
//! caller thread watches per-strategy deadlines measured from each
//! `Started` event; a strategy that misses its deadline, panics or is
//! cancelled is recorded with an empty finding set.

use crate::analyzers::{CancellationToken, DetectionStrategy, SourceInput, StrategyOutput};
use crate::core::{StrategyId, StrategyStatus};
use crate::errors::{Error, Result};
use crossbeam::channel::{self, RecvTimeoutError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One strategy's output plus how long it ran
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub strategy: StrategyId,
    pub output: StrategyOutput,
    pub elapsed: Duration,
}

enum DispatchEvent {
    Started { slot: usize, at: Instant },
    Finished { slot: usize, output: StrategyOutput, elapsed: Duration },
}

enum Slot {
    Queued,
    Running { started: Instant, deadline: Instant },
    Done(StrategyRun),
}

/// Dispatches strategies either on a rayon pool or inline
pub struct Dispatcher {
    workers: usize,
    parallel: bool,
    default_deadline: Duration,
}

impl Dispatcher {
    pub fn new(workers: usize, parallel: bool, default_deadline: Duration) -> Self {
        Self {
            workers: workers.max(1),
            parallel,
            default_deadline,
        }
    }

    fn deadline_for(&self, strategy: &dyn DetectionStrategy) -> Duration {
        strategy.deadline().unwrap_or(self.default_deadline)
    }

    /// Run every strategy against `input`. Output order follows `strategies`.
    pub fn run(
        &self,
        strategies: &[Arc<dyn DetectionStrategy>],
        input: &SourceInput,
        cancel: &CancellationToken,
    ) -> Result<Vec<StrategyRun>> {
        if strategies.is_empty() {
            return Ok(Vec::new());
        }
        if self.parallel && strategies.len() > 1 {
            self.run_parallel(strategies, input, cancel)
        } else {
            Ok(self.run_sequential(strategies, input, cancel))
        }
    }

    /// Run on the caller thread; deadlines are checked after the fact
    pub fn run_sequential(
        &self,
        strategies: &[Arc<dyn DetectionStrategy>],
        input: &SourceInput,
        cancel: &CancellationToken,
    ) -> Vec<StrategyRun> {
        strategies
            .iter()
            .map(|strategy| {
                let id = strategy.id();
                if cancel.is_cancelled() {
                    return StrategyRun {
                        strategy: id,
                        output: StrategyOutput::empty(StrategyStatus::Cancelled),
                        elapsed: Duration::ZERO,
                    };
                }
                let start = Instant::now();
                let output = run_guarded(strategy.as_ref(), input, cancel);
                let elapsed = start.elapsed();
                // Inline runs cannot be preempted; late results are discarded
                let output = if elapsed > self.deadline_for(strategy.as_ref()) {
                    tracing::warn!(strategy = %id, ?elapsed, "strategy missed its deadline");
                    StrategyOutput::empty(StrategyStatus::TimedOut)
                } else {
                    output
                };
                StrategyRun {
                    strategy: id,
                    output,
                    elapsed,
                }
            })
            .collect()
    }

    fn run_parallel(
        &self,
        strategies: &[Arc<dyn DetectionStrategy>],
        input: &SourceInput,
        cancel: &CancellationToken,
    ) -> Result<Vec<StrategyRun>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.min(strategies.len()))
            .thread_name(|i| format!("importscope-strategy-{}", i))
            .build()
            .map_err(|e| Error::Concurrency(format!("failed to build strategy pool: {}", e)))?;

        let (tx, rx) = channel::unbounded::<DispatchEvent>();
        // Each strategy gets its own token so a timeout stops only that one
        let tokens: Vec<CancellationToken> =
            strategies.iter().map(|_| CancellationToken::new()).collect();

        for (slot, strategy) in strategies.iter().enumerate() {
            let strategy = Arc::clone(strategy);
            let input = input.clone();
            let token = tokens[slot].clone();
            let tx = tx.clone();
            pool.spawn(move || {
                let at = Instant::now();
                if tx.send(DispatchEvent::Started { slot, at }).is_err() {
                    return;
                }
                let output = run_guarded(strategy.as_ref(), &input, &token);
                let _ = tx.send(DispatchEvent::Finished {
                    slot,
                    output,
                    elapsed: at.elapsed(),
                });
            });
        }
        drop(tx);

        let mut slots: Vec<Slot> = strategies.iter().map(|_| Slot::Queued).collect();
        let deadlines: Vec<Duration> = strategies
            .iter()
            .map(|s| self.deadline_for(s.as_ref()))
            .collect();

        loop {
            if slots.iter().all(|s| matches!(s, Slot::Done(_))) {
                break;
            }

            if cancel.is_cancelled() {
                for (slot, state) in slots.iter_mut().enumerate() {
                    tokens[slot].cancel();
                    if let Slot::Queued | Slot::Running { .. } = state {
                        *state = Slot::Done(abandoned(
                            strategies[slot].id(),
                            state,
                            StrategyStatus::Cancelled,
                        ));
                    }
                }
                break;
            }

            let now = Instant::now();
            for (slot, state) in slots.iter_mut().enumerate() {
                if let Slot::Running { deadline, .. } = state {
                    if *deadline <= now {
                        tracing::warn!(strategy = %strategies[slot].id(), "strategy missed its deadline");
                        tokens[slot].cancel();
                        *state = Slot::Done(abandoned(
                            strategies[slot].id(),
                            state,
                            StrategyStatus::TimedOut,
                        ));
                    }
                }
            }

            let wait = slots
                .iter()
                .filter_map(|s| match s {
                    Slot::Running { deadline, .. } => Some(deadline.saturating_duration_since(now)),
                    _ => None,
                })
                .min()
                .unwrap_or(POLL_INTERVAL)
                .min(POLL_INTERVAL);

            match rx.recv_timeout(wait) {
                Ok(DispatchEvent::Started { slot, at }) => {
                    if let Slot::Queued = slots[slot] {
                        slots[slot] = Slot::Running {
                            started: at,
                            deadline: at + deadlines[slot],
                        };
                    }
                }
                Ok(DispatchEvent::Finished {
                    slot,
                    output,
                    elapsed,
                }) => {
                    // Results arriving after a timeout or cancel are dropped
                    if !matches!(slots[slot], Slot::Done(_)) {
                        slots[slot] = Slot::Done(StrategyRun {
                            strategy: strategies[slot].id(),
                            output,
                            elapsed,
                        });
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    for (slot, state) in slots.iter_mut().enumerate() {
                        if !matches!(state, Slot::Done(_)) {
                            *state = Slot::Done(abandoned(
                                strategies[slot].id(),
                                state,
                                StrategyStatus::Failed("worker exited without a result".into()),
                            ));
                        }
                    }
                    break;
                }
            }
        }

        Ok(slots
            .into_iter()
            .filter_map(|s| match s {
                Slot::Done(run) => Some(run),
                _ => None,
            })
            .collect())
    }
}

fn abandoned(strategy: StrategyId, state: &Slot, status: StrategyStatus) -> StrategyRun {
    let elapsed = match state {
        Slot::Running { started, .. } => started.elapsed(),
        _ => Duration::ZERO,
    };
    StrategyRun {
        strategy,
        output: StrategyOutput::empty(status),
        elapsed,
    }
}

/// Run one strategy, turning a panic into a failed output
fn run_guarded(
    strategy: &dyn DetectionStrategy,
    input: &SourceInput,
    cancel: &CancellationToken,
) -> StrategyOutput {
    match panic::catch_unwind(AssertUnwindSafe(|| strategy.analyze(input, cancel))) {
        Ok(output) => output,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(strategy = %strategy.id(), %message, "strategy panicked");
            StrategyOutput::failed(format!("panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
