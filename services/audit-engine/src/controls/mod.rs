//! Control evaluation: result-table lookup, severity classification and the
//! per-control orchestration that ties them together.

pub mod classifier;
pub mod evaluator;
pub mod resolver;

pub use classifier::{classify, Severity, CRITICAL_THRESHOLD};
pub use evaluator::{ControlEvaluation, ControlEvaluator, DegradedCount};
pub use resolver::{AnomalyTable, AnomalyTableResolver, RESULT_TABLE_PREFIX};
