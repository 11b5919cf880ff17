//! `sera serve` starts the HTTP gateway.

use sera_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Sera gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Backend:   {} ({})", config.provider.kind, config.provider.model);
    println!("   Sessions:  {}", config.sessions.backend);
    println!("   Token cap: {}", config.max_tokens_limit);

    sera_gateway::start(config).await?;

    Ok(())
}
