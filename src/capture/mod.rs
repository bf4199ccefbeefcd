//! Camera-side plumbing: frame sources, producers and the periodic capture task.

mod controller;
mod loop_worker;
mod producer;
pub mod vision;

pub use controller::CaptureController;
pub use loop_worker::capture_loop;
pub use producer::{Capture, ReplayProducer, SampleProducer, VisionProducer};
