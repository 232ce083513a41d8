//! cohort-engine
//!
//! Longitudinal attribute resolution engine. Rules compute one derived
//! field each from a visit's raw values, already-derived values and the
//! subject's history; this crate supplies everything they share:
//!
//! - `Resolver`: carry-forward resolution across visit history
//! - `MissingnessEvaluator`: gate recoding, cascades and slot reordering
//! - `aggregate()`: monotonic group status reduction
//! - `require_derived()`: dependency ordering checks
//! - `Pipeline`: one derivation pass per visit, in registry order
//!
//! Synchronous and single-threaded. Different subjects may be processed
//! in parallel; visits of one subject must be fed in chronological order.

pub mod codes;
pub mod config;
pub mod context;
pub mod dependency;
pub mod error;
pub mod group;
pub mod missingness;
pub mod pipeline;
pub mod registry;
pub mod resolve;

pub use crate::codes::CodeTable;
pub use crate::config::EngineConfig;
pub use crate::context::VisitContext;
pub use crate::dependency::{require_all, require_derived};
pub use crate::error::EngineError;
pub use crate::group::{GroupStatus, aggregate, aggregate_values};
pub use crate::missingness::{GateTable, MissingnessEvaluator};
pub use crate::pipeline::{Pipeline, VisitReport, chain_visit};
pub use crate::registry::{Derivation, RuleRegistry, Target};
pub use crate::resolve::{Resolution, Resolver, Source, record_working};
