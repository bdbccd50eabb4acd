use std::env;
use std::path::PathBuf;

/// Tenant id used whenever a caller leaves the tenant blank.
pub const DEFAULT_TENANT_ID: &str = "default-tenant";

/// Display name given to the default tenant when it is created lazily.
pub const DEFAULT_TENANT_NAME: &str = "Default Tenant";

/// Configuration for the fee-engine CLI tool
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory path (default: `.fee-engine/` in current directory)
    pub data_dir: PathBuf,

    /// Output format: "human" (default) or "json"
    pub output_format: String,

    /// Log level: "info", "debug", "warn", "error" (default: "info")
    pub log_level: String,

    /// Tenant used when a request carries no tenant id
    pub default_tenant_id: String,

    /// Name assigned to the default tenant on first use
    pub default_tenant_name: String,
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        let data_dir = env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".fee-engine");

        Config {
            data_dir,
            output_format: "human".to_string(),
            log_level: "info".to_string(),
            default_tenant_id: DEFAULT_TENANT_ID.to_string(),
            default_tenant_name: DEFAULT_TENANT_NAME.to_string(),
        }
    }

    /// Create config with custom data directory
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Config {
            data_dir,
            ..Config::new()
        }
    }

    pub fn get_data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn set_data_dir(&mut self, dir: PathBuf) {
        self.data_dir = dir;
    }

    pub fn get_output_format(&self) -> &str {
        &self.output_format
    }

    /// Set output format ("human" or "json")
    pub fn set_output_format(&mut self, format: String) {
        self.output_format = format;
    }

    pub fn get_log_level(&self) -> &str {
        &self.log_level
    }

    pub fn set_log_level(&mut self, level: String) {
        self.log_level = level;
    }

    /// Resolve the effective tenant id: a blank or missing id maps to the default tenant.
    pub fn effective_tenant_id(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.default_tenant_id.clone(),
        }
    }

    /// Name given to a tenant created lazily under `tenant_id`.
    pub fn tenant_name_for(&self, tenant_id: &str) -> String {
        if tenant_id == self.default_tenant_id {
            self.default_tenant_name.clone()
        } else {
            tenant_id.to_string()
        }
    }

    /// Get command log path
    pub fn get_command_log_path(&self) -> PathBuf {
        self.data_dir.join("commands.log")
    }

    /// Get registry snapshot path
    pub fn get_registry_path(&self) -> PathBuf {
        self.data_dir.join("registry.json")
    }

    /// Load config from environment variables
    ///
    /// Environment variables:
    /// - `FEE_ENGINE_DATA_DIR`: override data directory
    /// - `FEE_ENGINE_OUTPUT_FORMAT`: "human" or "json"
    /// - `FEE_ENGINE_LOG_LEVEL`: log level
    /// - `FEE_ENGINE_DEFAULT_TENANT`: tenant id used for blank requests
    /// - `FEE_ENGINE_DEFAULT_TENANT_NAME`: display name of that tenant
    pub fn from_env() -> Self {
        let mut config = Config::new();

        if let Ok(dir) = env::var("FEE_ENGINE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(format) = env::var("FEE_ENGINE_OUTPUT_FORMAT") {
            config.output_format = format;
        }

        if let Ok(level) = env::var("FEE_ENGINE_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(tenant) = env::var("FEE_ENGINE_DEFAULT_TENANT") {
            if !tenant.trim().is_empty() {
                config.default_tenant_id = tenant;
            }
        }

        if let Ok(name) = env::var("FEE_ENGINE_DEFAULT_TENANT_NAME") {
            config.default_tenant_name = name;
        }

        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.output_format, "human");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_tenant_id, "default-tenant");
        assert!(config.data_dir.ends_with(".fee-engine"));
    }

    #[test]
    fn test_config_paths() {
        let config = Config::with_data_dir(PathBuf::from("/tmp/fees"));
        assert!(config.get_command_log_path().ends_with("commands.log"));
        assert!(config.get_registry_path().ends_with("registry.json"));
        assert_eq!(config.get_data_dir(), &PathBuf::from("/tmp/fees"));
    }

    #[test]
    fn test_config_setters() {
        let mut config = Config::new();
        config.set_output_format("json".to_string());
        assert_eq!(config.get_output_format(), "json");

        config.set_log_level("debug".to_string());
        assert_eq!(config.get_log_level(), "debug");
    }

    #[test]
    fn test_effective_tenant_id() {
        let config = Config::new();
        assert_eq!(config.effective_tenant_id(None), "default-tenant");
        assert_eq!(config.effective_tenant_id(Some("   ")), "default-tenant");
        assert_eq!(config.effective_tenant_id(Some(" acme ")), "acme");
    }

    #[test]
    fn test_tenant_name_for() {
        let config = Config::new();
        assert_eq!(config.tenant_name_for("default-tenant"), "Default Tenant");
        assert_eq!(config.tenant_name_for("acme"), "acme");
    }
}
