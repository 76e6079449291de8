//! In-process progress event delivery for pipeline runs.

pub mod bus;

pub use bus::{ProgressBus, ProgressEvent};
