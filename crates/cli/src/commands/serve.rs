//! `optimus serve`: Start the HTTP API server.

use crate::runtime::Runtime;

pub async fn run(
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    let gateway = config.gateway.clone();
    let runtime = Runtime::build(config).await?;

    println!("🤖 {}", runtime.config.app_name);
    println!("   Listening: {}:{}", gateway.host, gateway.port);
    println!("   API:       {}", gateway.api_prefix);
    println!("   Tools:     {}", runtime.registry.names().join(", "));
    println!(
        "   Default:   {}/{}",
        runtime.config.default_provider, runtime.config.default_model
    );

    optimus_gateway::serve(&gateway, runtime.gateway_state()).await?;

    Ok(())
}
