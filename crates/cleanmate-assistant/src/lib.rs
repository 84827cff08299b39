//! Application layer around the cleanup core.
//!
//! Everything here is optional for the core operations. The shell samples
//! [`SystemMetrics`], builds an explicit [`AssistantContext`] from them and
//! from stored [`Report`]s, and passes it to an [`Advisor`]. Actions the
//! advisor proposes go through the [`ActionInterpreter`] before anything
//! runs.

mod action;
mod advisor;
mod context;
mod monitor;
mod session;
mod store;

pub use action::{ActionInterpreter, ActionKind, ActionRejected, ActionSuggestion, ReadyAction};
pub use advisor::{
    Advisor, AdvisorReply, BoxFuture, Intent, SUGGESTED_CLEAN_TARGETS, ScriptedAdvisor,
};
pub use context::{AnalysisSnapshot, AssistantContext, ChatMode, CleanupSnapshot};
pub use monitor::{HealthStatus, SystemMetrics, SystemMonitor};
pub use session::{ADVISOR_TIMEOUT, ChatSession, ChatTurn};
pub use store::{
    ChatEntry, HISTORY_FILE, HistoryStore, LoadSnapshot, REPORTS_FILE, Report, ReportKind,
    ReportStats, ReportStore, Role, StoreError,
};
