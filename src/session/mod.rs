//! Explicit per-user session state and its persistence wrapper.

mod context;
mod recorder;

pub use context::{MoodSession, Observation};
pub use recorder::{SessionEvent, SessionRecorder};
