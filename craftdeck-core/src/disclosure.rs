//! Progressive reveal of the server list ("infinite scroll").
//!
//! The view shows `display_count` records and renders a sentinel row underneath while more are
//! hidden. Each time the sentinel scrolls into view the page grows by [`PAGE_SIZE`]. A growth
//! stays latched until the longer page has actually been rendered, so a sentinel that is still
//! on screen in the meantime cannot extend the list twice.
//!
//! After [`Disclosure::settle`] the sentinel has been laid out again, and seeing it on screen then
//! is a fresh sighting. A window taller than the list therefore fills one page per rendered frame.

use log::debug;

pub const PAGE_SIZE: usize = 10;

/// Handle for one mounted sentinel. Events carrying a handle from an earlier mount are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelSession(u64);

#[derive(Debug)]
pub struct Disclosure {
    display_count: usize,
    query: String,
    session: Option<SentinelSession>,
    sessions_started: u64,
    extending: bool,
}

impl Default for Disclosure {
    fn default() -> Self {
        Self {
            display_count: PAGE_SIZE,
            query: String::new(),
            session: None,
            sessions_started: 0,
            extending: false,
        }
    }
}

impl Disclosure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_count(&self) -> usize {
        self.display_count
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Records a new search query. A different query starts over at the first page.
    pub fn set_query(&mut self, query: &str) -> bool {
        if self.query == query {
            return false;
        }
        debug!(
            "Disclosure: query changed ({:?} -> {:?}), resetting {} -> {}",
            self.query, query, self.display_count, PAGE_SIZE
        );
        self.query = query.to_string();
        self.display_count = PAGE_SIZE;
        self.extending = false;
        true
    }

    pub fn has_more(&self, total: usize) -> bool {
        total > self.display_count
    }

    pub fn visible_len(&self, total: usize) -> usize {
        self.display_count.min(total)
    }

    pub fn displayed<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible_len(items.len())]
    }

    pub fn session(&self) -> Option<SentinelSession> {
        self.session
    }

    /// Mounts the sentinel while records are hidden and unmounts it once everything is shown.
    /// Returns the live session, if any.
    pub fn sync_sentinel(&mut self, total: usize) -> Option<SentinelSession> {
        match (self.has_more(total), self.session) {
            (true, None) => {
                self.sessions_started += 1;
                let session = SentinelSession(self.sessions_started);
                debug!("Disclosure: sentinel mounted (session {})", session.0);
                self.session = Some(session);
            }
            (false, Some(session)) => {
                debug!("Disclosure: sentinel unmounted (session {})", session.0);
                self.session = None;
                self.extending = false;
            }
            _ => {}
        }
        self.session
    }

    /// Sentinel became visible. Grows the page by one step unless the event is stale, a growth
    /// is still waiting to be rendered, or nothing is hidden.
    pub fn on_sentinel_visible(&mut self, session: SentinelSession, total: usize) -> bool {
        if self.session != Some(session) {
            debug!("Disclosure: ignoring event from ended session {}", session.0);
            return false;
        }
        if self.extending || !self.has_more(total) {
            return false;
        }
        self.display_count += PAGE_SIZE;
        self.extending = true;
        debug!(
            "Disclosure: showing {} of {} records",
            self.visible_len(total),
            total
        );
        true
    }

    /// The view rendered `rendered` records. Once that covers the grown page the next sentinel
    /// event counts again.
    pub fn settle(&mut self, rendered: usize, total: usize) {
        if self.extending && rendered >= self.visible_len(total) {
            self.extending = false;
        }
    }

    pub fn is_extending(&self) -> bool {
        self.extending
    }

    /// Ends any observation. Later events from the old session are dropped.
    pub fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("Disclosure: torn down (session {})", session.0);
        }
        self.extending = false;
    }
}
