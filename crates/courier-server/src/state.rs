use courier::providers::configs::ProviderConfig;

/// Shared application state, immutable after startup
#[derive(Clone)]
pub struct AppState {
    pub provider_config: ProviderConfig,
    pub tool_host_url: String,
    pub system_prompt: Option<String>,
}
