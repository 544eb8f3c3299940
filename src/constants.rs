// Constants, loaded from the environment where an override makes sense.

use std::env;

/// Environment variable names read by the environment config source.
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_DEPLOYMENT_NAME: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";

/// Built-in defaults used to fill partial configurations.
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_DEPLOYMENT_NAME: &str = "gpt-4o";

pub const DEFAULT_PORT: u16 = 5000;

// Use lazy_static to initialize static variables safely.
lazy_static::lazy_static! {
    pub static ref CONFIG_FILE: String = env::var("PE_RESEARCH_CONFIG_FILE").unwrap_or_else(|_| "azure-config.json".to_string());
    // Mounted secret directory (Docker/Kubernetes secrets, vault agent), one file per field.
    pub static ref SECRETS_DIR: String = env::var("PE_RESEARCH_SECRETS_DIR").unwrap_or_else(|_| "/run/secrets/pe-research".to_string());
    pub static ref TEMPLATES_DIR: String = env::var("PE_RESEARCH_TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_string());
    pub static ref STATIC_DIR: String = env::var("PE_RESEARCH_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
}
