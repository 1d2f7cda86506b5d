//! Structural queries over the node arena.
pub mod topology;
