//! Liveness probe state: one in-flight slot shared by the poll timer and the operator.

use crate::error::CoreError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_secs(45);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub online: bool,
    /// Round trip in milliseconds. Only meaningful while `online`.
    pub latency_ms: u64,
}

impl ProbeResult {
    pub fn online(latency_ms: u64) -> Self {
        Self { online: true, latency_ms }
    }

    pub fn offline() -> Self {
        Self { online: false, latency_ms: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    /// A probe is outstanding; `last` is whatever was resolved before it.
    Pending { last: Option<ProbeResult> },
    Resolved(ProbeResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTrigger {
    Timer,
    Operator,
}

/// Issued with each probe call; the completion must hand it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTicket(u64);

/// What a completed probe settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: ProbeResult,
    pub satisfied: Vec<ProbeTrigger>,
}

#[derive(Debug)]
pub struct ProbeMachine {
    state: ProbeState,
    issued: u64,
    in_flight: Option<ProbeTicket>,
    waiting: Vec<ProbeTrigger>,
    last_error: Option<String>,
}

impl Default for ProbeMachine {
    fn default() -> Self {
        Self {
            state: ProbeState::Idle,
            issued: 0,
            in_flight: None,
            waiting: Vec::new(),
            last_error: None,
        }
    }
}

impl ProbeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Last resolved result, kept while a newer probe is pending.
    pub fn last_result(&self) -> Option<ProbeResult> {
        match self.state {
            ProbeState::Idle => None,
            ProbeState::Pending { last } => last,
            ProbeState::Resolved(result) => Some(result),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Diagnostic from the most recent failed probe; cleared by a successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Asks for a probe. Returns a ticket when the caller should issue the probe call, or
    /// `None` when one is already in flight and this trigger rides along with it.
    pub fn request(&mut self, trigger: ProbeTrigger) -> Option<ProbeTicket> {
        self.waiting.push(trigger);
        if self.in_flight.is_some() {
            debug!("Probe: {:?} coalesced into in-flight probe", trigger);
            return None;
        }
        self.issued += 1;
        let ticket = ProbeTicket(self.issued);
        self.in_flight = Some(ticket);
        self.state = ProbeState::Pending {
            last: self.last_result(),
        };
        debug!("Probe: {:?} issued probe #{}", trigger, ticket.0);
        Some(ticket)
    }

    /// Applies a finished probe. Failures resolve as offline. Stale tickets change nothing.
    pub fn complete(
        &mut self,
        ticket: ProbeTicket,
        outcome: Result<ProbeResult, CoreError>,
    ) -> Option<Resolution> {
        if self.in_flight != Some(ticket) {
            debug!("Probe: dropping stale completion #{}", ticket.0);
            return None;
        }
        self.in_flight = None;
        let result = match outcome {
            Ok(result) => {
                self.last_error = None;
                result
            }
            Err(e) => {
                warn!("Probe #{} failed, reporting offline: {}", ticket.0, e);
                self.last_error = Some(e.to_string());
                ProbeResult::offline()
            }
        };
        self.state = ProbeState::Resolved(result);
        Some(Resolution {
            result,
            satisfied: std::mem::take(&mut self.waiting),
        })
    }

    /// Forgets the in-flight probe so its completion is ignored.
    pub fn cancel(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            debug!("Probe: cancelled in-flight probe #{}", ticket.0);
            self.waiting.clear();
            self.state = match self.last_result() {
                Some(result) => ProbeState::Resolved(result),
                None => ProbeState::Idle,
            };
        }
    }
}

/// Fixed-cadence poll timer. Fires on the first poll, then every `interval` on a grid anchored
/// at the start; manual probes never move it.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    next_due: Option<Instant>,
    started: bool,
}

impl PollSchedule {
    /// A zero `interval` is raised to [`MIN_POLL_INTERVAL`].
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            next_due: None,
            started: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when a tick is due at `now`. Missed ticks collapse into one.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.started {
            self.started = true;
            self.next_due = Some(now + self.interval);
            return true;
        }
        match self.next_due {
            Some(due) if now >= due => {
                let missed = (now - due).as_nanos() / self.interval.as_nanos();
                let steps = u32::try_from(missed + 1).unwrap_or(u32::MAX);
                self.next_due = Some(due + self.interval.saturating_mul(steps));
                true
            }
            _ => false,
        }
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        match (self.started, self.next_due) {
            (true, Some(due)) => due.saturating_duration_since(now),
            _ => Duration::ZERO,
        }
    }

    /// Stops the timer; it never fires again.
    pub fn cancel(&mut self) {
        self.started = true;
        self.next_due = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.started && self.next_due.is_none()
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> CoreError {
        CoreError::Probe {
            target: "localhost:25565".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        }
    }

    #[test]
    fn idle_to_pending_to_resolved() {
        let mut probe = ProbeMachine::new();
        assert_eq!(probe.state(), ProbeState::Idle);
        assert_eq!(probe.last_result(), None);

        let ticket = probe.request(ProbeTrigger::Timer).unwrap();
        assert_eq!(probe.state(), ProbeState::Pending { last: None });
        assert!(probe.is_in_flight());

        let resolution = probe.complete(ticket, Ok(ProbeResult::online(42))).unwrap();
        assert_eq!(resolution.result, ProbeResult::online(42));
        assert_eq!(probe.state(), ProbeState::Resolved(ProbeResult::online(42)));
        assert!(!probe.is_in_flight());
    }

    #[test]
    fn timer_during_manual_probe_is_coalesced() {
        let mut probe = ProbeMachine::new();
        let ticket = probe.request(ProbeTrigger::Operator).unwrap();
        assert_eq!(probe.request(ProbeTrigger::Timer), None);
        assert_eq!(probe.request(ProbeTrigger::Operator), None);

        let resolution = probe.complete(ticket, Ok(ProbeResult::online(7))).unwrap();
        assert_eq!(
            resolution.satisfied,
            vec![ProbeTrigger::Operator, ProbeTrigger::Timer, ProbeTrigger::Operator]
        );
        assert!(probe.request(ProbeTrigger::Timer).is_some());
    }

    #[test]
    fn last_result_survives_reprobe() {
        let mut probe = ProbeMachine::new();
        let first = probe.request(ProbeTrigger::Timer).unwrap();
        probe.complete(first, Ok(ProbeResult::online(12)));

        let second = probe.request(ProbeTrigger::Operator).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            probe.state(),
            ProbeState::Pending { last: Some(ProbeResult::online(12)) }
        );
        assert_eq!(probe.last_result(), Some(ProbeResult::online(12)));
        assert!(probe.is_in_flight());
    }

    #[test]
    fn failure_resolves_offline() {
        let mut probe = ProbeMachine::new();
        let ticket = probe.request(ProbeTrigger::Timer).unwrap();
        let resolution = probe.complete(ticket, Err(io_error())).unwrap();
        assert_eq!(resolution.result, ProbeResult { online: false, latency_ms: 0 });
        assert_eq!(probe.state(), ProbeState::Resolved(ProbeResult::offline()));
        assert!(probe.last_error().unwrap().contains("refused"));

        let ticket = probe.request(ProbeTrigger::Timer).unwrap();
        probe.complete(ticket, Ok(ProbeResult::online(3)));
        assert_eq!(probe.last_error(), None);
    }

    #[test]
    fn stale_and_cancelled_completions_are_ignored() {
        let mut probe = ProbeMachine::new();
        let first = probe.request(ProbeTrigger::Timer).unwrap();
        probe.complete(first, Ok(ProbeResult::online(5)));
        assert!(probe.complete(first, Ok(ProbeResult::offline())).is_none());
        assert_eq!(probe.last_result(), Some(ProbeResult::online(5)));

        let second = probe.request(ProbeTrigger::Operator).unwrap();
        probe.cancel();
        assert!(!probe.is_in_flight());
        assert_eq!(probe.state(), ProbeState::Resolved(ProbeResult::online(5)));
        assert!(probe.complete(second, Ok(ProbeResult::offline())).is_none());
    }

    #[test]
    fn schedule_fires_immediately_then_every_interval() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(Duration::from_secs(45));
        assert!(schedule.poll(start));
        assert!(!schedule.poll(start + Duration::from_secs(10)));
        assert_eq!(
            schedule.time_until_due(start + Duration::from_secs(10)),
            Duration::from_secs(35)
        );
        assert!(schedule.poll(start + Duration::from_secs(45)));
        assert!(!schedule.poll(start + Duration::from_secs(46)));
        // Two missed ticks collapse into one; the grid stays anchored.
        assert!(schedule.poll(start + Duration::from_secs(140)));
        assert!(!schedule.poll(start + Duration::from_secs(179)));
        assert!(schedule.poll(start + Duration::from_secs(180)));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(Duration::ZERO);
        assert_eq!(schedule.interval(), MIN_POLL_INTERVAL);
        assert!(schedule.poll(start));
        assert!(schedule.poll(start + Duration::from_secs(1)));
        assert_eq!(
            schedule.time_until_due(start + Duration::from_secs(1)),
            MIN_POLL_INTERVAL
        );
        assert!(!schedule.poll(start + Duration::from_secs(1)));
    }

    #[test]
    fn long_gap_lands_on_the_grid() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(Duration::from_secs(45));
        assert!(schedule.poll(start));
        // 10 hours asleep: one tick, next due on the original grid.
        let woke = start + Duration::from_secs(36_000 + 10);
        assert!(schedule.poll(woke));
        assert_eq!(schedule.time_until_due(woke), Duration::from_secs(35));
    }

    #[test]
    fn cancelled_schedule_never_fires() {
        let start = Instant::now();
        let mut schedule = PollSchedule::default();
        assert_eq!(schedule.interval(), POLL_INTERVAL);
        schedule.cancel();
        assert!(schedule.is_cancelled());
        assert!(!schedule.poll(start));
        assert!(!schedule.poll(start + Duration::from_secs(3600)));
    }
}
