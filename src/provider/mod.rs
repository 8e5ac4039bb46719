/// Provider adapters - Gateway
mod client;
mod dialect;
mod kind;

pub use client::{HealthStatus, ProviderClient};
pub use dialect::{Dialect, Endpoint, OpenAiVariant, StreamFrame};
pub use kind::ProviderKind;
