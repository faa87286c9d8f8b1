//! # Application Module
//!
//! Services that drive the domain through the outbound node port: gap
//! backfill, metric sampling, poll scheduling, and the session loop.

pub mod backfill;
pub mod runner;
pub mod sampler;
pub mod schedule;
pub mod session;

pub use backfill::{fetch_with_retry, ClosedGap, GapTracker};
pub use runner::{SessionHandle, SessionRunner, EVENT_CHANNEL_CAPACITY};
pub use sampler::Sampler;
pub use schedule::PollSchedule;
pub use session::{DashboardSession, IngestOutcome, SessionEvent, SessionView};
