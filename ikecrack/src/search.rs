//! The search coordinator.
//!
//! The keyspace is split into one contiguous range per worker. Workers run on
//! a dedicated rayon pool and report to the coordinator over a channel. The
//! first worker to find the password sets the cancellation flag of the run
//! and the others stop at their next batch boundary.

use std::{any::Any, sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use hmac::{digest::KeyInit, Mac};
use log::{debug, error, info, warn};

use crate::{
    error::{CrackError, Result},
    handshake::Handshake,
    keyspace::Keyspace,
    oracle::{HashAlgorithm, HmacMd5, HmacSha1},
    partition::partition,
    progress::{NoProgress, ProgressSink, Throughput},
    worker::{CancelFlag, Event, Job, Worker, WorkerState},
};

/// The most candidates a worker tests between two cancellation checks,
/// unless configured otherwise.
pub const MAX_BATCH_SIZE: u64 = 10_000;

/// How often the coordinator checks for a stop request while no event arrives.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Search parameters.
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    workers: usize,
    batch_size: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            batch_size: None,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of workers. Defaults to the number of logical CPUs.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);

        self
    }

    /// Sets the number of candidates tested between two cancellation checks.
    /// By default, a worker checks every 1% of its range, capped to
    /// `MAX_BATCH_SIZE` candidates.
    pub fn batch_size(mut self, batch_size: Option<u64>) -> Self {
        self.batch_size = batch_size.map(|size| size.max(1));

        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    fn batch_size_for(&self, range_len: u128) -> u64 {
        self.batch_size.unwrap_or_else(|| {
            u64::try_from(range_len / 100)
                .unwrap_or(u64::MAX)
                .clamp(1, MAX_BATCH_SIZE)
        })
    }
}

/// How a search ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Found(String),
    /// Every candidate was tested.
    NotFound,
    /// The search was cancelled from the outside before a match.
    Interrupted,
}

/// The result and statistics of a search.
#[derive(Clone, Debug)]
pub struct SearchReport {
    pub outcome: Outcome,
    /// Candidates tested, over all workers.
    pub attempts: u64,
    pub elapsed: Duration,
    /// Workers actually spawned.
    pub workers: usize,
}

impl SearchReport {
    pub fn password(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Found(password) => Some(password.as_str()),
            _ => None,
        }
    }

    /// Average candidates tested per second.
    pub fn rate(&self) -> f64 {
        crate::progress::rate(self.attempts, self.elapsed)
    }
}

/// A brute-force search of a keyspace against a handshake.
///
/// Each run gets its own cancellation flag, so a `Search` can be run again
/// after a match. Stopping it from the outside goes through `stop_handle`.
pub struct Search {
    config: SearchConfig,
    stop: CancelFlag,
}

impl Search {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            stop: CancelFlag::new(),
        }
    }

    /// A handle to stop the search from another thread.
    ///
    /// Stopping is permanent: the current run and every later one end with
    /// `Outcome::Interrupted` unless a match was already found.
    pub fn stop_handle(&self) -> CancelFlag {
        self.stop.clone()
    }

    pub fn run(&self, keyspace: &Keyspace, handshake: &Handshake) -> Result<SearchReport> {
        self.run_with_progress(keyspace, handshake, &mut NoProgress)
    }

    pub fn run_with_progress(
        &self,
        keyspace: &Keyspace,
        handshake: &Handshake,
        progress: &mut dyn ProgressSink,
    ) -> Result<SearchReport> {
        // resolve the hash function once, the workers are monomorphised
        match handshake.algorithm() {
            HashAlgorithm::Md5 => self.run_with::<HmacMd5>(keyspace, handshake, progress),
            HashAlgorithm::Sha1 => self.run_with::<HmacSha1>(keyspace, handshake, progress),
        }
    }

    fn run_with<M: Mac + KeyInit + 'static>(
        &self,
        keyspace: &Keyspace,
        handshake: &Handshake,
        progress: &mut dyn ProgressSink,
    ) -> Result<SearchReport> {
        let mut throughput = Throughput::new();
        let ranges = partition(keyspace.total(), self.config.workers);

        info!(
            "Searching {} with {} {} worker(s)",
            keyspace,
            ranges.len(),
            handshake.algorithm()
        );
        progress.start(keyspace.total());

        if ranges.is_empty() {
            progress.finish();
            return Ok(SearchReport {
                outcome: Outcome::NotFound,
                attempts: 0,
                elapsed: throughput.elapsed(),
                workers: 0,
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ranges.len())
            .thread_name(|i| format!("ikecrack-worker-{i}"))
            .panic_handler(|panic| error!("Worker panicked: {}", panic_message(&*panic)))
            .build()?;

        let job = Arc::new(Job::<M>::new(keyspace.clone(), handshake));
        let (sender, receiver) = crossbeam_channel::unbounded();
        let cancel = CancelFlag::new();
        if self.stop.is_cancelled() {
            cancel.cancel();
        }

        for (id, range) in ranges.iter().cloned().enumerate() {
            let batch_size = self.config.batch_size_for(range.end - range.start);
            let worker = Worker::new(
                id,
                range,
                batch_size,
                Arc::clone(&job),
                cancel.clone(),
                sender.clone(),
            );

            pool.spawn(move || {
                worker.run();
            });
        }

        // only the workers hold senders now, so a disconnect means they are all gone
        drop(sender);

        let collected = collect(
            &receiver,
            ranges.len(),
            &cancel,
            &self.stop,
            progress,
            &mut throughput,
        );
        progress.finish();

        let attempts = collected.attempts;
        let outcome = collected.outcome()?;

        let report = SearchReport {
            outcome,
            attempts,
            elapsed: throughput.elapsed(),
            workers: ranges.len(),
        };
        info!(
            "Search finished after {} attempts in {:.2}s",
            report.attempts,
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }
}

/// What the coordinator learned from the workers' events.
#[derive(Debug)]
struct Collected {
    found: Option<String>,
    attempts: u64,
    states: Vec<Option<WorkerState>>,
}

impl Collected {
    /// Workers that never reported they were done.
    fn failed(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.is_none())
            .map(|(worker, _)| worker)
            .collect()
    }

    fn cancelled(&self) -> bool {
        self.states.contains(&Some(WorkerState::Cancelled))
    }

    /// Decides how the run ended. A match wins over failed workers, otherwise
    /// any worker that never reported `Done` fails the whole search.
    fn outcome(self) -> Result<Outcome> {
        let failed = self.failed();
        let cancelled = self.cancelled();

        match self.found {
            Some(password) => {
                if !failed.is_empty() {
                    error!("Worker(s) {failed:?} failed, but the password was already found");
                }
                Ok(Outcome::Found(password))
            }
            None if !failed.is_empty() => {
                error!("Worker(s) {failed:?} did not finish their range");
                Err(CrackError::WorkerFailure { workers: failed })
            }
            None if cancelled => {
                warn!("Search interrupted");
                Ok(Outcome::Interrupted)
            }
            None => Ok(Outcome::NotFound),
        }
    }
}

/// Consumes events until all `workers` are done, or until every sender is
/// dropped. A request on `stop` is forwarded to the workers through `cancel`.
fn collect(
    receiver: &Receiver<Event>,
    workers: usize,
    cancel: &CancelFlag,
    stop: &CancelFlag,
    progress: &mut dyn ProgressSink,
    throughput: &mut Throughput,
) -> Collected {
    let mut collected = Collected {
        found: None,
        attempts: 0,
        states: vec![None; workers],
    };
    let mut done = 0;

    while done < workers {
        if stop.is_cancelled() && cancel.cancel() {
            warn!("Stop requested, cancelling the workers");
        }

        let event = match receiver.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match event {
            Event::Progress { count, .. } => {
                collected.attempts += count;
                progress.update(collected.attempts, throughput.sample(collected.attempts));
            }
            Event::Found {
                worker,
                password,
                count,
            } => {
                collected.attempts += count;
                progress.update(collected.attempts, throughput.sample(collected.attempts));

                if collected.found.is_none() {
                    info!("Worker {worker} found the password");
                    collected.found = Some(password);
                } else {
                    warn!("Worker {worker} also found a password, keeping the first one");
                }
                cancel.cancel();
            }
            Event::Done { worker, state } => match collected.states.get_mut(worker) {
                Some(slot) if slot.is_none() => {
                    debug!("Worker {worker} is done: {state:?}");
                    *slot = Some(state);
                    done += 1;
                }
                _ => warn!("Unexpected done event from worker {worker}"),
            },
        }
    }

    collected
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crossbeam_channel::unbounded;

    use super::*;

    fn collect_events(events: Vec<Event>, workers: usize) -> (Collected, CancelFlag) {
        let (sender, receiver) = unbounded();
        for event in events {
            sender.send(event).unwrap();
        }
        drop(sender);

        let cancel = CancelFlag::new();
        let collected = collect(
            &receiver,
            workers,
            &cancel,
            &CancelFlag::new(),
            &mut NoProgress,
            &mut Throughput::new(),
        );
        (collected, cancel)
    }

    fn collected(found: Option<&str>, states: Vec<Option<WorkerState>>) -> Collected {
        Collected {
            found: found.map(str::to_owned),
            attempts: 10,
            states,
        }
    }

    fn done(worker: usize, state: WorkerState) -> Event {
        Event::Done { worker, state }
    }

    #[test]
    fn test_batch_size() {
        let config = SearchConfig::new();
        assert_eq!(config.batch_size_for(50), 1);
        assert_eq!(config.batch_size_for(676), 6);
        assert_eq!(config.batch_size_for(u128::MAX), MAX_BATCH_SIZE);

        let config = config.batch_size(Some(0));
        assert_eq!(config.batch_size_for(676), 1);
    }

    #[test]
    fn test_default_workers() {
        assert_eq!(SearchConfig::default().worker_count(), num_cpus::get());
        assert_eq!(SearchConfig::new().workers(0).worker_count(), 1);
    }

    #[test]
    fn test_collect_exhausted() {
        let (collected, cancel) = collect_events(
            vec![
                Event::Progress { worker: 0, count: 5 },
                Event::Progress { worker: 1, count: 7 },
                done(1, WorkerState::Exhausted),
                done(0, WorkerState::Exhausted),
            ],
            2,
        );

        assert_eq!(collected.attempts, 12);
        assert!(collected.found.is_none());
        assert!(collected.failed().is_empty());
        assert!(!collected.cancelled());
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_collect_keeps_first_found() {
        let (collected, cancel) = collect_events(
            vec![
                Event::Found {
                    worker: 1,
                    password: "first".to_owned(),
                    count: 3,
                },
                Event::Found {
                    worker: 0,
                    password: "second".to_owned(),
                    count: 4,
                },
                done(1, WorkerState::Found),
                done(0, WorkerState::Found),
            ],
            2,
        );

        assert_eq!(collected.found.as_deref(), Some("first"));
        assert_eq!(collected.attempts, 7);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_collect_detects_missing_workers() {
        let (collected, _) = collect_events(
            vec![
                Event::Progress { worker: 0, count: 5 },
                done(0, WorkerState::Exhausted),
                Event::Progress { worker: 2, count: 5 },
            ],
            3,
        );

        assert_eq!(collected.failed(), vec![1, 2]);
    }

    #[test]
    fn test_collect_ignores_duplicate_done() {
        let (collected, _) = collect_events(
            vec![
                done(0, WorkerState::Exhausted),
                done(0, WorkerState::Exhausted),
                done(7, WorkerState::Exhausted),
            ],
            2,
        );

        assert_eq!(collected.failed(), vec![1]);
    }

    #[test]
    fn test_collect_stops_once_all_done() {
        let (sender, receiver) = unbounded();
        sender.send(done(0, WorkerState::Cancelled)).unwrap();

        // the sender is still alive, so this would block if done events were not counted
        let collected = collect(
            &receiver,
            1,
            &CancelFlag::new(),
            &CancelFlag::new(),
            &mut NoProgress,
            &mut Throughput::new(),
        );

        assert!(collected.cancelled());
        drop(sender);
    }

    #[test]
    fn test_collect_forwards_stop_request() {
        let (sender, receiver) = unbounded();
        let cancel = CancelFlag::new();
        let stop = CancelFlag::new();
        stop.cancel();

        // a worker that only stops once the run is cancelled
        let worker = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                while !cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(1));
                }
                sender.send(done(0, WorkerState::Cancelled)).unwrap();
            })
        };

        let collected = collect(
            &receiver,
            1,
            &cancel,
            &stop,
            &mut NoProgress,
            &mut Throughput::new(),
        );
        worker.join().unwrap();

        assert!(cancel.is_cancelled());
        assert!(matches!(collected.outcome(), Ok(Outcome::Interrupted)));
    }

    #[test]
    fn test_outcome_missing_worker_without_match() {
        let outcome = collected(None, vec![Some(WorkerState::Exhausted), None, None]).outcome();

        match outcome {
            Err(CrackError::WorkerFailure { workers }) => assert_eq!(workers, vec![1, 2]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_outcome_match_wins_over_missing_worker() {
        let outcome = collected(Some("42"), vec![None, Some(WorkerState::Found)]).outcome();

        assert_eq!(outcome.unwrap(), Outcome::Found("42".to_owned()));
    }

    #[test]
    fn test_outcome_cancelled_without_match() {
        let outcome = collected(
            None,
            vec![Some(WorkerState::Cancelled), Some(WorkerState::Exhausted)],
        )
        .outcome();

        assert_eq!(outcome.unwrap(), Outcome::Interrupted);
    }

    #[test]
    fn test_outcome_exhausted() {
        let outcome = collected(
            None,
            vec![Some(WorkerState::Exhausted), Some(WorkerState::Exhausted)],
        )
        .outcome();

        assert_eq!(outcome.unwrap(), Outcome::NotFound);
    }

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*panic), "boom");

        let panic: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*panic), "bang");

        let panic: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(&*panic), "unknown panic");
    }
}
