//! Repository layer: one unit struct of static async fns per table.
//!
//! Visibility policy: rows with a NULL `user_id` are shared and
//! visible to any caller; owned rows are visible only to their owner.
//! The same filter gates mutations.

mod file_asset_repo;
mod integration_account_repo;
mod log_repo;
mod node_run_repo;
mod run_repo;
mod workflow_repo;

pub use file_asset_repo::FileAssetRepository;
pub use integration_account_repo::IntegrationAccountRepository;
pub use log_repo::LogRepository;
pub use node_run_repo::NodeRunRepository;
pub use run_repo::RunRepository;
pub use workflow_repo::WorkflowRepository;
