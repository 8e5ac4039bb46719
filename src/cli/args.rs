use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "neural-bridge")]
#[command(version)]
#[command(about = "A metered gateway between agent personas and local or hosted LLM providers", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Address to bind, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show provider and health
    Status,
    /// List models served by the provider
    Models {
        /// Bypass the model cache
        #[arg(long)]
        refresh: bool,
    },
    /// Send a minimal prompt to check connectivity
    Test,
    /// Generate text from a raw prompt
    Generate {
        prompt: String,

        #[arg(long)]
        system: Option<String>,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long)]
        temperature: Option<f32>,

        #[arg(long)]
        max_tokens: Option<u32>,

        /// Print chunks as they arrive
        #[arg(long)]
        stream: bool,
    },
    /// Chat with an agent persona
    Chat {
        /// Persona id (see `agents`)
        #[arg(short, long, default_value = "code")]
        agent: String,

        message: String,

        /// Send to the cloud provider instead of local inference
        #[arg(long)]
        cloud: bool,

        #[arg(short, long)]
        model: Option<String>,

        /// Identity to meter the request against
        #[arg(long, env = "NEURAL_BRIDGE_USER", default_value = "local")]
        user: String,
    },
    /// List agent personas
    Agents,
    /// Initialize configuration
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat() {
        let cli = Cli::parse_from(["neural-bridge", "-v", "chat", "--agent", "review", "--cloud", "check this"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Chat { agent, message, cloud, .. } => {
                assert_eq!(agent, "review");
                assert_eq!(message, "check this");
                assert!(cloud);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["neural-bridge", "models", "--refresh", "--config", "gw.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("gw.toml")));
        assert!(matches!(cli.command, Commands::Models { refresh: true }));
    }
}
