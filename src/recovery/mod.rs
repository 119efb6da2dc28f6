//! recovery — dataset input, result aggregation, and run orchestration.
//!
//! Purpose
//! -------
//! Tie the per-gene fitting state machine to the execution engines: the
//! validated read-only [`AbundanceDataset`], the gene selection that must
//! resolve before any task is dispatched, the single-writer
//! [`RecoveryResult`] aggregator, and [`recover_dynamics`], the entry point
//! that runs one model per selected gene over the chosen engine.
//!
//! Conventions
//! -----------
//! - Output tables are gene-indexed and NaN-filled for genes that were not
//!   fit or not recoverable; `collect` writes only the columns of its own
//!   gene, making aggregation commutative over arrival order.
//! - The stored splicing rate is de-scaled (`beta / scaling`) and the
//!   stored steady unspliced level re-scaled (`steady_u * scaling`), so
//!   downstream consumers read both signals in spliced units.

pub mod dataset;
pub mod errors;
pub mod result;
pub mod run;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::dataset::{AbundanceDataset, GeneSelection};
pub use self::errors::{RecoveryError, RecoveryResultOf};
pub use self::result::{GeneFit, LossTraceMatrix, RecoveryResult};
pub use self::run::recover_dynamics;
