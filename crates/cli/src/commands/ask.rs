//! `optimus ask`: Run a single query through the agent.

use crate::runtime::Runtime;

pub async fn run(
    query: String,
    provider: Option<String>,
    model: Option<String>,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let provider = provider.unwrap_or_else(|| config.default_provider.clone());
    let model = model.unwrap_or_else(|| config.default_model.clone());
    let runtime = Runtime::build(config).await?;

    if !stream {
        let answer = runtime.agent.run_once(&query, &provider, &model).await?;
        println!("{answer}");
        return Ok(());
    }

    let mut frames = runtime.agent.run_streaming(&query, &provider, &model).await?;
    while let Some(frame) = frames.recv().await {
        print!("{frame}");
    }

    Ok(())
}
