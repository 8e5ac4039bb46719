/// Agent personas - Gateway
mod personas;

pub use personas::{all_agents, find_agent, list_agents, AgentPersona, AgentSummary};
