//! Fragment runtime state consumed by the scan path: runtime bitmap filters,
//! the debug-action policy and the fragment error log.

#![forbid(unsafe_code)]

pub mod bitmap_filter;
pub mod debug_action;
pub mod error_log;
pub mod runtime_filters;

pub use bitmap_filter::BitmapFilter;
pub use debug_action::{DebugAction, DebugActions, ExecNodePhase};
pub use error_log::{
    DEFAULT_MAX_ERRORS, DiagnosticsSink, FailurePhase, FragmentErrorLog, ScanDiagnostic,
};
pub use runtime_filters::{RuntimeFilterRegistry, RuntimeFilterSource};
