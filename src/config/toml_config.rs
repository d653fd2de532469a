use crate::adapters::uploads::{DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_FILE_SIZE};
use crate::config::cli::CliArgs;
use crate::core::ConfigProvider;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            host: "0.0.0.0".to_string(),
            port,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub url: String,
    /// 本地 session 的識別名稱
    pub client_id: String,
    pub poll_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3100".to_string(),
            client_id: "SICAPIT".to_string(),
            poll_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    pub dir: String,
    pub max_file_size: usize,
    pub allowed_types: String,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: DEFAULT_ALLOWED_TYPES.to_string(),
        }
    }
}

impl RelayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RelayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            Self::from_file(path)
        } else {
            tracing::info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RelayError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BRIDGE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RelayError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
            tracing::info!("🔧 Port overridden to: {}", port);
        }
        if let Some(url) = &args.bridge_url {
            self.bridge.url = url.clone();
            tracing::info!("🔧 Bridge URL overridden to: {}", url);
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_positive_number("server.port", self.server.port as usize, 1)?;

        validation::validate_url("bridge.url", &self.bridge.url)?;
        validation::validate_non_empty_string("bridge.client_id", &self.bridge.client_id)?;
        validation::validate_positive_number(
            "bridge.poll_interval_ms",
            self.bridge.poll_interval_ms as usize,
            1,
        )?;

        validation::validate_path("uploads.dir", &self.uploads.dir)?;
        validation::validate_positive_number("uploads.max_file_size", self.uploads.max_file_size, 1)?;
        validation::validate_pattern("uploads.allowed_types", &self.uploads.allowed_types)?;

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|e| RelayError::InvalidConfigValueError {
            field: "server.host".to_string(),
            value: addr.clone(),
            reason: format!("{}", e),
        })
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.bridge.poll_interval_ms)
    }
}

impl ConfigProvider for RelayConfig {
    fn bridge_url(&self) -> &str {
        &self.bridge.url
    }

    fn client_id(&self) -> &str {
        &self.bridge.client_id
    }

    fn upload_dir(&self) -> &str {
        &self.uploads.dir
    }

    fn max_file_size(&self) -> usize {
        self.uploads.max_file_size
    }

    fn allowed_types(&self) -> &str {
        &self.uploads.allowed_types
    }
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8080

[bridge]
url = "http://bridge.local:3100"
client_id = "OFFICE"
poll_interval_ms = 500

[uploads]
dir = "/var/lib/wa-relay/uploads"
max_file_size = 1048576
allowed_types = "png|pdf"
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.bridge_url(), "http://bridge.local:3100");
        assert_eq!(config.client_id(), "OFFICE");
        assert_eq!(config.max_file_size(), 1048576);
        assert_eq!(config.allowed_types(), "png|pdf");
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = RelayConfig::from_toml_str("[server]\nport = 9000\n").unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.client_id(), "SICAPIT");
        assert_eq!(config.upload_dir(), "uploads");
        assert_eq!(config.max_file_size(), 5 * 1024 * 1024);
        assert_eq!(config.allowed_types(), "jpeg|jpg|png|gif|pdf|doc|docx");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WA_RELAY_TEST_BRIDGE", "http://10.0.0.5:3100");

        let toml_content = r#"
[bridge]
url = "${WA_RELAY_TEST_BRIDGE}"
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.bridge.url, "http://10.0.0.5:3100");

        std::env::remove_var("WA_RELAY_TEST_BRIDGE");
    }

    #[test]
    fn test_config_validation() {
        let config = RelayConfig::from_toml_str("[bridge]\nurl = \"invalid-url\"\n").unwrap();
        assert!(config.validate().is_err());

        let config = RelayConfig::from_toml_str("[uploads]\nmax_file_size = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = RelayConfig::from_toml_str("[uploads]\nallowed_types = \"(png\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(RelayConfig::from_toml_str("[server\nport = 1").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[bridge]\nclient_id = \"FILE\"\n")
            .unwrap();

        let config = RelayConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.client_id(), "FILE");
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = RelayConfig::load_or_default("/nonexistent/relay.toml").unwrap();
        assert_eq!(config.bridge.url, "http://127.0.0.1:3100");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = RelayConfig::default();
        let args = CliArgs {
            config: "relay.toml".to_string(),
            port: Some(4000),
            bridge_url: Some("http://other:3100".to_string()),
            verbose: false,
            json_logs: false,
        };

        config.apply_overrides(&args);

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.bridge.url, "http://other:3100");
    }
}
