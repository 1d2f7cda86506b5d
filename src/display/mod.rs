//! Human readable views of a model.
pub mod trace;

pub use trace::format_trace;
