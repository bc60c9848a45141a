//! Exception condition collection for symbolic exploration runs.
//!
//! Observes exception events raised by an exploration engine, captures the
//! symbolic path condition active at each one, rewrites it into the source
//! predicate a test author would recognize and reports the result as JSON.

pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod report;
pub mod signature;
pub mod site;
pub mod trace;

pub use collector::ExceptionSiteCollector;
pub use config::{ExcondConfig, LogConfig, ReportSettings};
pub use engine::{
    EngineContext, InstructionRef, MethodContext, PathConditionSource, ResolvedMethod,
    RunListener, ThreadContext, ThrownValue,
};
pub use error::{ExcondError, Result};
pub use normalize::{format_condition, normalize, normalize_opt};
pub use report::Report;
pub use site::{ExceptionSite, LineNumber, UNKNOWN};
pub use trace::{replay, ReplayEngine, ReplaySummary, Trace, TraceEvent};

/// Version of the excond workspace
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
