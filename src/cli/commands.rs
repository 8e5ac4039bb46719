use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;

use crate::{
    agents::all_agents,
    app::{init_config, Config},
    gateway::Gateway,
    models::{ChatRequest, GenerateRequest, StreamEvent},
    provider::HealthStatus,
    server,
};

use super::Commands;

/// Handle CLI subcommands
pub async fn handle_command(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Init => {
            println!("Initializing neural-bridge configuration...");
            match init_config()? {
                Some(path) => println!("Configuration written to {}", path.display().to_string().green()),
                None => println!("Configuration already exists, leaving it untouched"),
            }
            Ok(())
        }
        Commands::Agents => {
            show_agents();
            Ok(())
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::serve(config).await
        }
        Commands::Status => show_status(&gateway(config)?).await,
        Commands::Models { refresh } => list_models(&gateway(config)?, refresh).await,
        Commands::Test => test_connection(&gateway(config)?).await,
        Commands::Generate {
            prompt,
            system,
            model,
            temperature,
            max_tokens,
            stream,
        } => {
            let request = GenerateRequest {
                prompt,
                system_prompt: system,
                model,
                temperature,
                max_tokens,
            };
            generate(&gateway(config)?, request, stream).await
        }
        Commands::Chat {
            agent,
            message,
            cloud,
            model,
            user,
        } => {
            let mut request = ChatRequest::new(agent, message);
            request.model = model;
            if cloud {
                request = request.prefer_cloud();
            }
            chat(&gateway(config)?, &user, request).await
        }
    }
}

fn gateway(config: Config) -> Result<Gateway> {
    Gateway::from_config(config).context("Failed to initialize gateway")
}

/// Show provider identity and health
async fn show_status(gateway: &Gateway) -> Result<()> {
    let status = gateway.status().await;

    println!("neural-bridge Status:");
    println!();
    println!("  Provider:      {}", status.provider.to_string().cyan());
    println!("  Base URL:      {}", status.base_url);
    println!("  Default model: {}", status.default_model);
    match status.health {
        HealthStatus::Online => println!("  [OK] Health: {}", "online".green()),
        HealthStatus::Offline => println!("  [ERROR] Health: {}", "offline".red()),
        HealthStatus::Error { code } => println!("  [WARNING] Health: {} (HTTP {})", "error".yellow(), code),
    }

    let fallback = &gateway.config().fallback;
    if fallback.is_usable() {
        println!("  [OK] Cloud fallback: {} ({})", fallback.provider, fallback.model);
    } else {
        println!("  Cloud fallback: disabled");
    }
    println!();
    Ok(())
}

/// List available models
async fn list_models(gateway: &Gateway, refresh: bool) -> Result<()> {
    let listing = gateway.models(refresh).await;
    if listing.models.is_empty() {
        println!("{}", "No models reported by the provider".yellow());
        return Ok(());
    }

    println!("Available models:");
    for model in &listing.models {
        let marker = if model.name == listing.default_model { " (default)" } else { "" };
        match &model.size_or_owner {
            Some(detail) => println!("  • {}{} [{}]", model.name.green(), marker, detail),
            None => println!("  • {}{}", model.name.green(), marker),
        }
    }
    Ok(())
}

async fn test_connection(gateway: &Gateway) -> Result<()> {
    let result = gateway.test_connection().await;
    if result.success {
        println!("[OK] {}", result.message.green());
        if let Some(response) = result.response {
            println!("     Model said: {}", response);
        }
        Ok(())
    } else {
        anyhow::bail!("Connection test failed: {}", result.message)
    }
}

async fn generate(gateway: &Gateway, request: GenerateRequest, stream: bool) -> Result<()> {
    let user = "local";
    if !stream {
        let text = gateway.generate(user, &request).await?;
        println!("{}", text);
        return Ok(());
    }

    let mut rx = gateway.generate_stream(user, &request)?;
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Delta(chunk) => {
                print!("{}", chunk);
                stdout.flush()?;
            }
            StreamEvent::End => break,
        }
    }
    println!();
    Ok(())
}

async fn chat(gateway: &Gateway, user: &str, request: ChatRequest) -> Result<()> {
    let outcome = gateway.chat(user, &request).await?;

    println!("{}", outcome.response);
    println!();
    let via = if outcome.fallback_used {
        format!("{} (fallback)", outcome.provider).yellow()
    } else {
        outcome.provider.to_string().normal()
    };
    println!(
        "{}",
        format!(
            "model {} via {} | {} credits charged | balance {}",
            outcome.model, via, outcome.credits_charged, outcome.balance
        )
        .dimmed()
    );
    Ok(())
}

/// List agent personas
pub fn show_agents() {
    println!("Agents:");
    for agent in all_agents() {
        println!("  • {:<12} {}", agent.id.cyan(), agent.description);
    }
}
