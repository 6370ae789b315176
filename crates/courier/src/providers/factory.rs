use anyhow::Result;

use super::anthropic::AnthropicProvider;
use super::base::Provider;
use super::configs::ProviderConfig;
use super::openai::OpenAiProvider;

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider>> {
    match config {
        ProviderConfig::Anthropic(config) => Ok(Box::new(AnthropicProvider::new(config)?)),
        ProviderConfig::OpenAi(config) => Ok(Box::new(OpenAiProvider::new(config)?)),
    }
}
