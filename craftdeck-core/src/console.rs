//! State behind the server list view: three independent data sources, the search box, the
//! disclosure window and the probe. Every async result comes back with a ticket and is dropped
//! if a newer fetch replaced it or the view has been torn down.

use crate::disclosure::{Disclosure, SentinelSession};
use crate::error::Result;
use crate::probe::{PollSchedule, ProbeMachine, ProbeResult, ProbeState, ProbeTicket, ProbeTrigger};
use crate::server::{self, DisplayRecord, ServerMetadata, StorageSample};
use log::{debug, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Loadable::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Servers,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    source: Source,
    generation: u64,
}

impl FetchTicket {
    pub fn source(&self) -> Source {
        self.source
    }
}

pub struct ServerConsole {
    servers: Loadable<Vec<ServerMetadata>>,
    storage: Loadable<Vec<StorageSample>>,
    server_generation: u64,
    storage_generation: u64,
    live: bool,
    disclosure: Disclosure,
    probe: ProbeMachine,
    schedule: PollSchedule,
    filtered: Vec<DisplayRecord>,
}

impl Default for ServerConsole {
    fn default() -> Self {
        Self::with_poll_interval(crate::probe::POLL_INTERVAL)
    }
}

impl ServerConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(interval: Duration) -> Self {
        Self {
            servers: Loadable::Loading,
            storage: Loadable::Loading,
            server_generation: 0,
            storage_generation: 0,
            live: true,
            disclosure: Disclosure::new(),
            probe: ProbeMachine::new(),
            schedule: PollSchedule::new(interval),
            filtered: Vec::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    // --- list sources ---

    /// Starts a fetch of `source`. Earlier tickets for the same source go stale. Data already on
    /// screen stays there until the new result lands.
    pub fn begin_fetch(&mut self, source: Source) -> FetchTicket {
        let generation = match source {
            Source::Servers => {
                self.server_generation += 1;
                self.server_generation
            }
            Source::Storage => {
                self.storage_generation += 1;
                self.storage_generation
            }
        };
        FetchTicket { source, generation }
    }

    fn is_current(&self, ticket: FetchTicket) -> bool {
        let current = match ticket.source {
            Source::Servers => self.server_generation,
            Source::Storage => self.storage_generation,
        };
        self.live && ticket.generation == current
    }

    pub fn apply_servers(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<ServerMetadata>>,
    ) -> bool {
        if ticket.source != Source::Servers || !self.is_current(ticket) {
            debug!("Console: dropping stale server list");
            return false;
        }
        self.servers = match result {
            Ok(servers) => {
                debug!("Console: {} servers loaded", servers.len());
                Loadable::Ready(servers)
            }
            Err(e) => {
                warn!("Console: server list unavailable: {}", e);
                Loadable::Failed(e.to_string())
            }
        };
        self.recompute();
        true
    }

    pub fn apply_storage(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<StorageSample>>,
    ) -> bool {
        if ticket.source != Source::Storage || !self.is_current(ticket) {
            debug!("Console: dropping stale storage sizes");
            return false;
        }
        self.storage = match result {
            Ok(samples) => Loadable::Ready(samples),
            Err(e) => {
                warn!("Console: storage sizes unavailable: {}", e);
                Loadable::Failed(e.to_string())
            }
        };
        self.recompute();
        true
    }

    pub fn servers(&self) -> &Loadable<Vec<ServerMetadata>> {
        &self.servers
    }

    pub fn storage(&self) -> &Loadable<Vec<StorageSample>> {
        &self.storage
    }

    fn recompute(&mut self) {
        let meta = self.servers.ready().map(Vec::as_slice).unwrap_or(&[]);
        let samples = self.storage.ready().map(Vec::as_slice).unwrap_or(&[]);
        let joined = server::aggregate_by_location(meta, samples);
        self.filtered = server::filter_sort(&joined, self.disclosure.query());
    }

    /// Servers known so far; `None` until the first list arrives. A failed fetch counts as none.
    pub fn server_count(&self) -> Option<usize> {
        match &self.servers {
            Loadable::Loading => None,
            Loadable::Failed(_) => Some(0),
            Loadable::Ready(servers) => Some(servers.len()),
        }
    }

    pub fn total_storage_gb(&self) -> Option<f64> {
        match &self.storage {
            Loadable::Loading => None,
            Loadable::Failed(_) => Some(0.0),
            Loadable::Ready(samples) => Some(server::total_storage_gb(samples)),
        }
    }

    /// Nothing in the working directory at all, as opposed to a search that matches nothing.
    pub fn has_no_servers(&self) -> bool {
        self.server_count() == Some(0)
    }

    // --- search and disclosure ---

    pub fn query(&self) -> &str {
        self.disclosure.query()
    }

    pub fn set_query(&mut self, query: &str) {
        if self.disclosure.set_query(query) {
            self.recompute();
        }
    }

    pub fn filtered(&self) -> &[DisplayRecord] {
        &self.filtered
    }

    pub fn displayed(&self) -> &[DisplayRecord] {
        self.disclosure.displayed(&self.filtered)
    }

    pub fn display_count(&self) -> usize {
        self.disclosure.display_count()
    }

    pub fn has_more(&self) -> bool {
        self.disclosure.has_more(self.filtered.len())
    }

    /// Sentinel to render below the list this frame, if any.
    pub fn sync_sentinel(&mut self) -> Option<SentinelSession> {
        if !self.live {
            return None;
        }
        self.disclosure.sync_sentinel(self.filtered.len())
    }

    pub fn on_sentinel_visible(&mut self, session: SentinelSession) -> bool {
        self.live && self.disclosure.on_sentinel_visible(session, self.filtered.len())
    }

    pub fn settle(&mut self, rendered: usize) {
        self.disclosure.settle(rendered, self.filtered.len());
    }

    // --- probe ---

    /// Polls the 45 s timer. Returns a ticket when a probe call should go out now.
    pub fn tick(&mut self, now: Instant) -> Option<ProbeTicket> {
        if !self.live || !self.schedule.poll(now) {
            return None;
        }
        self.probe.request(ProbeTrigger::Timer)
    }

    /// Operator asked for a fresh probe. Shares the in-flight slot with the timer.
    pub fn reprobe(&mut self) -> Option<ProbeTicket> {
        if !self.live {
            return None;
        }
        self.probe.request(ProbeTrigger::Operator)
    }

    pub fn apply_probe(&mut self, ticket: ProbeTicket, outcome: Result<ProbeResult>) -> bool {
        if !self.live {
            return false;
        }
        self.probe.complete(ticket, outcome).is_some()
    }

    pub fn probe_state(&self) -> ProbeState {
        self.probe.state()
    }

    pub fn probe_result(&self) -> Option<ProbeResult> {
        self.probe.last_result()
    }

    pub fn is_probing(&self) -> bool {
        self.probe.is_in_flight()
    }

    pub fn probe_error(&self) -> Option<&str> {
        self.probe.last_error()
    }

    pub fn time_until_poll(&self, now: Instant) -> Duration {
        self.schedule.time_until_due(now)
    }

    /// The view is going away: stop the timer and ignore anything still in flight.
    pub fn teardown(&mut self) {
        if !self.live {
            return;
        }
        debug!("Console: teardown");
        self.live = false;
        self.disclosure.teardown();
        self.probe.cancel();
        self.schedule.cancel();
    }
}

impl Drop for ServerConsole {
    fn drop(&mut self) {
        self.teardown();
    }
}
