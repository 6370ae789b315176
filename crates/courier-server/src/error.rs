use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: set {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a dotted settings field path to the environment variable that sets it
pub fn to_env_var(field: &str) -> String {
    format!("COURIER_{}", field.replace('.', "__").to_uppercase())
}
