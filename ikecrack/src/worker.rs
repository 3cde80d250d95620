//! The per-range search loop.

use std::{
    ops::Range,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crossbeam_channel::Sender;
use hmac::{digest::KeyInit, Mac};
use log::debug;

use crate::{handshake::Handshake, keyspace::Keyspace, oracle::Oracle};

/// A flag shared by every worker of a search, telling them to stop.
/// Once set, it stays set.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns `true` only for the call that actually set it.
    pub fn cancel(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a worker ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// The worker found the password.
    Found,
    /// The whole range was tested without a match.
    Exhausted,
    /// The cancellation flag was set by someone else.
    Cancelled,
}

/// An event sent by a worker to the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// `count` more candidates were tested.
    Progress { worker: usize, count: u64 },
    /// The password was found after `count` candidates not yet reported.
    ///
    /// `count` is a delta like the one of `Progress`, the match included, not
    /// the total tested by the worker. Summing the counts of every event gives
    /// the number of candidates tested.
    Found {
        worker: usize,
        password: String,
        count: u64,
    },
    /// The worker stopped. This is always its last event.
    Done { worker: usize, state: WorkerState },
}

/// Everything a worker reads but never writes, shared by all workers.
pub struct Job<M> {
    keyspace: Keyspace,
    oracle: Oracle<M>,
    target: Vec<u8>,
}

impl<M: Mac + KeyInit> Job<M> {
    pub fn new(keyspace: Keyspace, handshake: &Handshake) -> Self {
        Self {
            keyspace,
            oracle: Oracle::new(handshake.exchange()),
            target: handshake.target().to_vec(),
        }
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Tests a candidate against the captured hash.
    #[inline]
    pub fn matches(&self, password: &[u8]) -> bool {
        self.oracle.compute(password).as_slice() == self.target.as_slice()
    }
}

/// Tests every candidate of a range, in increasing order.
pub struct Worker<M> {
    id: usize,
    range: Range<u128>,
    batch_size: u64,
    job: Arc<Job<M>>,
    cancel: CancelFlag,
    events: Sender<Event>,
}

impl<M: Mac + KeyInit> Worker<M> {
    pub fn new(
        id: usize,
        range: Range<u128>,
        batch_size: u64,
        job: Arc<Job<M>>,
        cancel: CancelFlag,
        events: Sender<Event>,
    ) -> Self {
        Self {
            id,
            range,
            batch_size: batch_size.max(1),
            job,
            cancel,
            events,
        }
    }

    /// Runs the worker to completion.
    ///
    /// Candidates are tested in batches of `batch_size`. The cancellation flag
    /// is checked and progress is reported between batches.
    pub fn run(self) -> WorkerState {
        debug!("Worker {} searching {:?}", self.id, self.range);

        let keyspace = self.job.keyspace();
        let mut password = vec![0; keyspace.len()];
        let mut state = WorkerState::Exhausted;
        let mut start = self.range.start;

        'batches: while start < self.range.end {
            if self.cancel.is_cancelled() {
                state = WorkerState::Cancelled;
                break;
            }

            let end = start
                .saturating_add(u128::from(self.batch_size))
                .min(self.range.end);
            for index in start..end {
                keyspace.decode_into(index, &mut password);

                if self.job.matches(&password) {
                    self.send(Event::Found {
                        worker: self.id,
                        password: String::from_utf8_lossy(&password).into_owned(),
                        // a batch never exceeds `batch_size`
                        count: (index - start + 1) as u64,
                    });
                    self.cancel.cancel();
                    state = WorkerState::Found;
                    break 'batches;
                }
            }

            self.send(Event::Progress {
                worker: self.id,
                count: (end - start) as u64,
            });
            start = end;
        }

        self.send(Event::Done {
            worker: self.id,
            state,
        });
        debug!("Worker {} finished: {:?}", self.id, state);

        state
    }

    // The coordinator may already be gone, there is nobody left to tell.
    fn send(&self, event: Event) {
        let _ = self.events.send(event);
    }
}
