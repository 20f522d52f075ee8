// Core library for Craftdeck.
// Everything the server console decides lives here, separate from any UI.

pub mod backend;
pub mod config;
pub mod console;
pub mod disclosure;
pub mod error;
pub mod probe;
pub mod scan;
pub mod server;
pub mod slp;

pub use backend::{Backend, LocalBackend};
pub use config::{AppConfig, SettingsDraft, Validation};
pub use console::{FetchTicket, Loadable, ServerConsole, Source};
pub use disclosure::{Disclosure, SentinelSession, PAGE_SIZE};
pub use error::{CoreError, Result};
pub use probe::{PollSchedule, ProbeMachine, ProbeResult, ProbeState, ProbeTicket, ProbeTrigger};
pub use server::{
    aggregate, aggregate_by_location, filter_sort, DisplayRecord, ServerMetadata, StorageSample,
};
