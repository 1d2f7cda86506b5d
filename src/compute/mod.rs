//! Lazy generation of sample batches: arrays, deferred values, the per-node
//! segment ledger and the engine driving them.
pub mod data;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod ledger;
pub mod payload;
pub mod seeding;

pub use data::Data;
pub use deferred::{compute_all, Deferred, TaskKey, TaskTable};
pub use error::ComputationError;
pub use kernel::{ComparatorFn, OperationFn, SimulatorFn, StatisticFn};
pub use ledger::{Ledger, OutputRecord};
pub use payload::{Input, Output, PayloadStep, PendingInput};
pub use seeding::{set_substream, RandomState, SubstreamCounter};
