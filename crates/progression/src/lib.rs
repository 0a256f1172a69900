//! XP event ingestion.
//!
//! [`EventIngestionOrchestrator`] runs one user action through the ledger,
//! stats, level, reward and notification collaborators inside a single
//! unit of work, then attempts real-time delivery once the work is committed.

pub mod fanout;
pub mod orchestrator;
pub mod rewards;

pub use fanout::{build_notifications, DeliveryReport, NotificationFanout};
pub use orchestrator::{
    EventIngestionOrchestrator, IngestionOutcome, IngestionSummary, OrchestratorBuilder,
};
pub use rewards::RewardDispatcher;
