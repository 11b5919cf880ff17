//! `sera config` prints the effective configuration.

use sera_config::AppConfig;

/// Render `config` as TOML with secrets masked.
fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("***".into());
    }
    toml::to_string_pretty(&shown)
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = AppConfig::load().map_err(|e| format!("Config error: {e}"))?;

    if config_path.exists() {
        println!("# Loaded from {}", config_path.display());
    } else {
        println!("# No config file at {}, showing defaults", config_path.display());
    }
    if !config.has_api_key() {
        println!("# No API key set (SERA_API_KEY or OPENAI_API_KEY)");
    }
    println!();
    print!("{}", render_redacted(&config)?);

    Ok(())
}
