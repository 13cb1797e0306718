//! Recording lifecycle
//!
//! This module provides the `Recorder` state machine and its handle:
//! - Stream acquisition and release
//! - Audio mixing when more than one source is captured
//! - Chunked recording and artifact assembly
//! - Elapsed-time bookkeeping across pause/resume

mod clock;
mod controller;
mod status;

pub use clock::SessionClock;
pub use controller::{Recorder, RecorderHandle};
pub use status::{RecorderSnapshot, Status};
