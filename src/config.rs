use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub paging: PagingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Page size requested when the caller does not set one
    pub default_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            paging: PagingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self { default_limit: 10 }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and `BIOBANK_` variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        config = config.add_source(
            config::Environment::with_prefix("BIOBANK")
                .separator("__")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// The API base URL, with `BIOBANK_API_URL` overriding the configured one
    pub fn api_base_url(&self) -> String {
        if let Ok(url) = std::env::var("BIOBANK_API_URL") {
            if !url.is_empty() {
                return url;
            }
        }
        self.api.base_url.clone()
    }

    /// `ApiConfig` with the effective base URL
    pub fn effective_api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url(),
            timeout_secs: self.api.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:9000/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.paging.default_limit, 10);
    }

    #[test]
    fn test_load_without_overrides_uses_defaults() {
        let config = AppConfig::load().unwrap();
        assert!(config.api.timeout_secs > 0);
        assert!(!config.api_base_url().is_empty());
    }
}
