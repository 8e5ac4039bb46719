pub mod agents;
pub mod app;
pub mod cli;
pub mod constants;
pub mod context;
pub mod gateway;
pub mod limits;
pub mod models;
pub mod provider;
pub mod registry;
pub mod server;
pub mod transport;
pub mod utils;

pub use app::{load_config, Config};
pub use gateway::{ChatOutcome, CreditLedger, Gateway, UsageRecord, UsageSink};
pub use models::{ChatRequest, GenerateRequest, ProjectContext, StreamEvent};
pub use provider::ProviderKind;
pub use utils::GatewayError;
