//! Workflow-execution summary client for the iris dashboard.
//!
//! Unlike the best-effort analytics feeds, execution data is operationally
//! critical: failures surface as categorized errors instead of degrading to
//! zeroed output.

pub mod executions_summary;

pub use executions_summary::{
    summarize_executions, ExecutionsClient, ExecutionsClientConfig, ExecutionsError,
    ExecutionsErrorCode, ExecutionsResult, ExecutionsSummary,
};
