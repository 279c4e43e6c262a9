//! Provider factory: builds a model provider by name from configuration.
//!
//! Only the providers the assistant supports are known here: `openai` and
//! `google` (Gemini through its OpenAI-compatible endpoint). A missing
//! credential or unknown name is a configuration error, raised before any
//! request is sent.

use std::collections::HashMap;
use std::sync::Arc;

use optimus_config::AppConfig;
use optimus_core::error::ProviderError;
use optimus_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// Provider names accepted by [`ProviderFactory::create`].
pub const SUPPORTED_PROVIDERS: [&str; 2] = ["openai", "google"];

#[derive(Clone, Default)]
struct ProviderSettings {
    api_key: Option<String>,
    api_url: Option<String>,
}

/// Creates providers on demand from resolved settings.
#[derive(Clone, Default)]
pub struct ProviderFactory {
    settings: HashMap<String, ProviderSettings>,
}

impl ProviderFactory {
    /// Snapshot the provider sections of the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let settings = config
            .providers
            .iter()
            .map(|(name, p)| {
                (
                    name.to_lowercase(),
                    ProviderSettings {
                        api_key: p.api_key.clone().filter(|k| !k.is_empty()),
                        api_url: p.api_url.clone(),
                    },
                )
            })
            .collect();
        Self { settings }
    }

    /// Set the API key for a provider (builder style, used by tests and the CLI).
    pub fn with_api_key(mut self, provider: &str, api_key: impl Into<String>) -> Self {
        self.settings.entry(provider.to_lowercase()).or_default().api_key = Some(api_key.into());
        self
    }

    /// Build the named provider.
    pub fn create(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        let name = name.trim().to_lowercase();
        let label = credential_label(&name)
            .ok_or_else(|| ProviderError::UnsupportedProvider(name.clone()))?;

        let settings = self.settings.get(&name).cloned().unwrap_or_default();
        let api_key = settings
            .api_key
            .ok_or_else(|| ProviderError::MissingCredential(label.into()))?;
        let base_url = settings
            .api_url
            .unwrap_or_else(|| default_base_url(&name).to_string());

        debug!(provider = %name, base_url = %base_url, "Creating provider");
        Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)?))
    }
}

/// Human name used in "Missing … API key" errors.
fn credential_label(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("OpenAI"),
        "google" => Some("Google"),
        _ => None,
    }
}

/// Default base URL for the supported providers.
fn default_base_url(provider_name: &str) -> &'static str {
    match provider_name {
        "google" => "https://generativelanguage.googleapis.com/v1beta/openai",
        _ => "https://api.openai.com/v1",
    }
}
