//! 应用运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub proxy_host: String,
    pub proxy_port: u16,
    pub upstream_host: String,
    pub upstream_port: u16,
    pub api_host: String,
    pub api_port: u16,
    pub upstream_connect_timeout_ms: u64,
    pub relay_linger_ms: u64,
    pub shutdown_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            proxy_host: "0.0.0.0".to_string(),
            proxy_port: 65001,
            upstream_host: "cloud.iregul.com".to_string(),
            upstream_port: 65001,
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            upstream_connect_timeout_ms: 5000,
            relay_linger_ms: 5000,
            shutdown_timeout_seconds: 10,
        }
    }
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（测试时避免修改进程环境）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let vars = Vars { lookup };

        Ok(Self {
            proxy_host: vars.string_or("PROXY_HOST", defaults.proxy_host),
            proxy_port: vars.u16_or("PROXY_PORT", defaults.proxy_port)?,
            upstream_host: vars.string_or("UPSTREAM_HOST", defaults.upstream_host),
            upstream_port: vars.u16_or("UPSTREAM_PORT", defaults.upstream_port)?,
            api_host: vars.string_or("API_HOST", defaults.api_host),
            api_port: vars.u16_or("API_PORT", defaults.api_port)?,
            upstream_connect_timeout_ms: vars.u64_or(
                "UPSTREAM_CONNECT_TIMEOUT_MS",
                defaults.upstream_connect_timeout_ms,
            )?,
            relay_linger_ms: vars.u64_or("RELAY_LINGER_MS", defaults.relay_linger_ms)?,
            shutdown_timeout_seconds: vars
                .u64_or("SHUTDOWN_TIMEOUT_SECONDS", defaults.shutdown_timeout_seconds)?,
        })
    }

    /// 中继监听地址（host:port）。
    pub fn proxy_addr(&self) -> String {
        format!("{}:{}", self.proxy_host, self.proxy_port)
    }

    /// 上游地址（host:port）。
    pub fn upstream_addr(&self) -> String {
        format!("{}:{}", self.upstream_host, self.upstream_port)
    }

    /// 状态 API 监听地址（host:port）。
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_connect_timeout_ms)
    }

    pub fn relay_linger(&self) -> Duration {
        Duration::from_millis(self.relay_linger_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 空值视为未设置。
    fn read_optional(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            _ => None,
        }
    }

    fn string_or(&self, key: &str, default: String) -> String {
        self.read_optional(key).unwrap_or(default)
    }

    fn u16_or(&self, key: &str, default: u16) -> Result<u16, ConfigError> {
        let value = match self.read_optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        let value = match self.read_optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }
}
