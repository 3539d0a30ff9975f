//! Fan-out collection: a closed work queue drained by a bounded worker pool,
//! orchestrated per metric family by a [`CollectionRun`].

pub mod pool;
pub mod queue;
pub mod run;

pub use pool::{ItemProcessor, PoolReport};
pub use queue::WorkQueue;
pub use run::{CollectionRun, Family, RunOutcome};
