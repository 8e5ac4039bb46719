// Gateway module for the orchestrator - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod billing;
mod ledger;
mod orchestrator;
mod types;

// Public re-exports - the ONLY way to access gateway functionality
pub use billing::{BillingPolicy, Charge};
pub use ledger::{CreditLedger, InMemoryLedger, InMemoryUsageLog, JsonlUsageLog, UsageSink};
pub use orchestrator::Gateway;
pub use types::{ChatOutcome, ChatState, ConnectionTest, GatewayStatus, ModelsListing, UsageRecord};
