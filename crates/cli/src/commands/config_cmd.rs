//! `optimus config`: Configuration management commands.

use optimus_config::{AppConfig, HttpMode};
use optimus_providers::SUPPORTED_PROVIDERS;

const REDACTED: &str = "***";

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.default_model);
            println!("   Gateway:   {}:{}{}", config.gateway.host, config.gateway.port, config.gateway.api_prefix);
            println!(
                "   Database:  {}",
                if config.database.url.is_some() { "postgres" } else { "in-memory" }
            );
            println!("   HTTP:      {:?}", config.tools.http_mode);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Settings that load fine but will fail or degrade at request time.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let has_key = |name: &str| {
        config
            .provider(name)
            .and_then(|p| p.api_key.as_deref())
            .is_some_and(|k| !k.is_empty())
    };

    if !SUPPORTED_PROVIDERS.contains(&config.default_provider.to_lowercase().as_str()) {
        warnings.push(format!("Unsupported default provider: {}", config.default_provider));
    } else if !has_key(&config.default_provider.to_lowercase()) {
        warnings.push(format!("No API key for default provider {}", config.default_provider));
    }

    if !has_key(&config.rag.embedding_provider.to_lowercase()) {
        warnings.push(format!(
            "No API key for embedding provider {}; retrieval is unavailable",
            config.rag.embedding_provider
        ));
    }

    if config.database.url.is_none() {
        warnings.push("DATABASE_URL not set; sql_fetch is disabled and documents are not persisted".into());
    }

    if config.tools.http_mode == HttpMode::Live && config.tools.http_allowlist.is_empty() {
        warnings.push("http_request is live but the allowlist is empty; every call will be refused".into());
    }

    warnings
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&redacted(config))?;
    println!("{toml_str}");
    Ok(())
}

/// Replace credentials with a placeholder before printing.
fn redacted(mut config: AppConfig) -> AppConfig {
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some(REDACTED.into());
        }
    }
    if config.database.url.is_some() {
        config.database.url = Some(REDACTED.into());
    }
    config
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("OPTIMUS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| AppConfig::config_dir().join("config.toml"));
    println!("{}", config_path.display());
    Ok(())
}
