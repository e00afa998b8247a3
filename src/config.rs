use crate::error::{AssistantError, Result};
use crate::streaming::DecoderLimits;
use serde::Deserialize;
use std::env;
use std::fs;
use std::str::FromStr;

pub const DEFAULT_GATEWAY_ENDPOINT: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
pub const DEFAULT_GATEWAY_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// LLM gateway used by the functions service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Connect timeout and longest silence between reads
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_GATEWAY_ENDPOINT.to_string(),
            model: DEFAULT_GATEWAY_MODEL.to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

/// Chat client side: where the functions live and how to decode their streams
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub functions_url: String,
    pub publishable_key: String,
    /// Connect timeout and longest silence between reads of the reply stream
    pub timeout_secs: u64,
    pub max_pending_bytes: usize,
    pub max_rebuffer_attempts: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        let limits = DecoderLimits::default();
        Self {
            functions_url: "http://127.0.0.1:8080".to_string(),
            publishable_key: String::new(),
            timeout_secs: 120,
            max_pending_bytes: limits.max_pending_bytes,
            max_rebuffer_attempts: limits.max_rebuffer_attempts,
        }
    }
}

impl AssistantConfig {
    pub fn decoder_limits(&self) -> DecoderLimits {
        DecoderLimits {
            max_pending_bytes: self.max_pending_bytes,
            max_rebuffer_attempts: self.max_rebuffer_attempts,
        }
    }

    /// URL of a named function under this deployment
    pub fn function_url(&self, name: &str) -> String {
        format!(
            "{}/functions/v1/{}",
            self.functions_url.trim_end_matches('/'),
            name
        )
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| AssistantError::ConfigError(format!("Invalid {} value: {}", key, e))),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults_gateway = GatewayConfig::default();
        let defaults_assistant = AssistantConfig::default();

        let listen_addr =
            env::var("FOCUS_LISTEN_ADDR").unwrap_or_else(|_| ServerConfig::default().listen_addr);

        let gateway = GatewayConfig {
            api_key: env::var("AI_GATEWAY_API_KEY").unwrap_or_default(),
            endpoint: env::var("AI_GATEWAY_ENDPOINT").unwrap_or(defaults_gateway.endpoint),
            model: env::var("AI_GATEWAY_MODEL").unwrap_or(defaults_gateway.model),
            temperature: defaults_gateway.temperature,
            timeout_secs: parse_env("AI_GATEWAY_TIMEOUT_SECS", defaults_gateway.timeout_secs)?,
        };

        let assistant = AssistantConfig {
            functions_url: env::var("FOCUS_FUNCTIONS_URL")
                .unwrap_or(defaults_assistant.functions_url),
            publishable_key: env::var("FOCUS_PUBLISHABLE_KEY").unwrap_or_default(),
            timeout_secs: parse_env("FOCUS_TIMEOUT_SECS", defaults_assistant.timeout_secs)?,
            ..defaults_assistant
        };

        Ok(AppConfig {
            server: ServerConfig { listen_addr },
            gateway,
            assistant,
        })
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml_str(&contents)?;

        // Secrets from the environment win over the file
        if let Ok(api_key) = env::var("AI_GATEWAY_API_KEY") {
            config.gateway.api_key = api_key;
        }
        if let Ok(key) = env::var("FOCUS_PUBLISHABLE_KEY") {
            config.assistant.publishable_key = key;
        }

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Validate what `serve` needs
    pub fn validate_server(&self) -> Result<()> {
        if self.server.listen_addr.is_empty() {
            return Err(AssistantError::ConfigError(
                "Listen address is empty".to_string(),
            ));
        }

        if self.gateway.api_key.is_empty() {
            return Err(AssistantError::ConfigError(
                "AI_GATEWAY_API_KEY not set".to_string(),
            ));
        }

        if self.gateway.endpoint.is_empty() {
            return Err(AssistantError::ConfigError(
                "Gateway endpoint is empty".to_string(),
            ));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(AssistantError::ConfigError(
                "Gateway timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate what `chat` needs
    pub fn validate_client(&self) -> Result<()> {
        if self.assistant.functions_url.is_empty() {
            return Err(AssistantError::ConfigError(
                "Functions URL is empty".to_string(),
            ));
        }

        if self.assistant.publishable_key.is_empty() {
            return Err(AssistantError::ConfigError(
                "FOCUS_PUBLISHABLE_KEY not set".to_string(),
            ));
        }

        if self.assistant.timeout_secs == 0 {
            return Err(AssistantError::ConfigError(
                "Assistant timeout must be greater than 0".to_string(),
            ));
        }

        if self.assistant.max_pending_bytes == 0 {
            return Err(AssistantError::ConfigError(
                "max_pending_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_validation() {
        let mut config = AppConfig {
            server: ServerConfig::default(),
            gateway: GatewayConfig {
                api_key: "test-key".to_string(),
                ..Default::default()
            },
            assistant: AssistantConfig::default(),
        };

        assert!(config.validate_server().is_ok());

        config.gateway.api_key.clear();
        assert!(config.validate_server().is_err());

        config.gateway.api_key = "test-key".to_string();
        config.gateway.timeout_secs = 0;
        assert!(config.validate_server().is_err());
    }

    #[test]
    fn test_client_validation() {
        let mut config = AppConfig {
            server: ServerConfig::default(),
            gateway: GatewayConfig::default(),
            assistant: AssistantConfig::default(),
        };

        // No publishable key yet
        assert!(config.validate_client().is_err());

        config.assistant.publishable_key = "pk".to_string();
        assert!(config.validate_client().is_ok());

        config.assistant.timeout_secs = 0;
        assert!(config.validate_client().is_err());
    }

    #[test]
    fn test_toml_partial_sections_use_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [gateway]
            api_key = "abc"

            [assistant]
            functions_url = "https://project.example.co/"
            max_rebuffer_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.gateway.api_key, "abc");
        assert_eq!(config.gateway.model, DEFAULT_GATEWAY_MODEL);
        assert_eq!(config.assistant.max_rebuffer_attempts, 2);
        assert_eq!(config.assistant.max_pending_bytes, 64 * 1024);
        assert_eq!(
            config.assistant.function_url("ai-assistant"),
            "https://project.example.co/functions/v1/ai-assistant"
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml_str("[gateway\napi_key=").unwrap_err();
        assert!(matches!(err, AssistantError::ConfigError(_)));
    }
}
