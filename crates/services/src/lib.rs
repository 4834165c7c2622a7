#![forbid(unsafe_code)]

pub mod aggregator;
pub mod assignment;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod remote;
pub mod report;
pub mod session;

pub use translate_core::Clock;

pub use aggregator::{DEFAULT_DONE_THRESHOLD, RemoteAggregator, UnitCount};
pub use assignment::WorkAssignmentSelector;
pub use config::AppConfig;
pub use context::AppContext;
pub use dashboard::{DashboardView, StatsDashboard};
pub use error::{AppendError, ConfigError, ContextError, FetchError, SelectionError, SessionError};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use report::{Report, ReportRow};
pub use session::{SessionPosition, StepOutcome, TranslationSession};
