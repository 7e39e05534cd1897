//! In-flight read coalescing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, Shared};

use crate::application::error::ClientError;

use super::keys::QueryKey;
use super::lock::mutex_lock;
use super::store::{Generation, QueryValue};

const SOURCE: &str = "cache::inflight";

pub(crate) type SharedLoad = Shared<BoxFuture<'static, Result<QueryValue, ClientError>>>;

struct Flight {
    ticket: u64,
    started: Generation,
    load: SharedLoad,
}

#[derive(Default)]
struct Flights {
    by_key: HashMap<QueryKey, Flight>,
    /// Start generations of every running load, including superseded loads
    /// that were replaced in `by_key` but have not finished yet.
    live: BTreeMap<Generation, usize>,
}

impl Flights {
    fn oldest_live(&self) -> Option<Generation> {
        self.live.keys().next().copied()
    }
}

/// One pending boundary read per key, shared by every waiter.
pub(crate) struct InFlight {
    flights: Mutex<Flights>,
    tickets: AtomicU64,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            flights: Mutex::new(Flights::default()),
            tickets: AtomicU64::new(0),
        }
    }

    /// Join the pending read for `key`, or start one with `start`.
    ///
    /// `joinable` decides whether a pending read begun at a given generation
    /// may still be shared; a superseded read keeps its own waiters but new
    /// callers get a fresh one. `current` is read under the flight lock so a
    /// concurrent [`InFlight::finish`] cannot compact past a starting read.
    /// Returns the load and whether it was joined.
    pub(crate) fn join_or_start(
        &self,
        key: &QueryKey,
        current: impl FnOnce() -> Generation,
        joinable: impl FnOnce(Generation) -> bool,
        start: impl FnOnce(u64, Generation) -> SharedLoad,
    ) -> (SharedLoad, bool) {
        let mut flights = mutex_lock(&self.flights, SOURCE, "join_or_start");
        if let Some(flight) = flights.by_key.get(key)
            && joinable(flight.started)
        {
            return (flight.load.clone(), true);
        }

        let started = current();
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let load = start(ticket, started);
        flights.by_key.insert(
            key.clone(),
            Flight {
                ticket,
                started,
                load: load.clone(),
            },
        );
        *flights.live.entry(started).or_default() += 1;
        (load, false)
    }

    /// Retire the load identified by `ticket`, then hand the oldest start
    /// generation still running to `compact`.
    pub(crate) fn finish(
        &self,
        key: &QueryKey,
        ticket: u64,
        started: Generation,
        compact: impl FnOnce(Option<Generation>),
    ) {
        let mut flights = mutex_lock(&self.flights, SOURCE, "finish");
        if flights
            .by_key
            .get(key)
            .is_some_and(|flight| flight.ticket == ticket)
        {
            flights.by_key.remove(key);
        }
        if let Some(count) = flights.live.get_mut(&started) {
            *count -= 1;
            if *count == 0 {
                flights.live.remove(&started);
            }
        }
        compact(flights.oldest_live());
    }

    /// Run `compact` with the oldest start generation still running.
    pub(crate) fn with_oldest_live(&self, compact: impl FnOnce(Option<Generation>)) {
        let flights = mutex_lock(&self.flights, SOURCE, "with_oldest_live");
        compact(flights.oldest_live());
    }

    pub(crate) fn len(&self) -> usize {
        mutex_lock(&self.flights, SOURCE, "len").by_key.len()
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}
