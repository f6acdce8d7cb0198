//! Database models.
//!
//! Timestamps are RFC3339 strings and JSON payloads are TEXT columns;
//! each model exposes typed accessors for its JSON fields.

mod file_asset;
mod integration_account;
mod log;
mod node_run;
mod run;
mod workflow;

pub use file_asset::FileAsset;
pub use integration_account::IntegrationAccount;
pub use log::LogEntry;
pub use node_run::NodeRun;
pub use run::Run;
pub use workflow::Workflow;
