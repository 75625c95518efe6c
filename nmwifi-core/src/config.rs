use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const BUILTIN_TOML: &str = include_str!("../../configs/nmwifi.toml");

static BUILTIN_CONFIG: Lazy<ServiceConfig> = Lazy::new(|| {
    toml::from_str(BUILTIN_TOML).expect("Failed to parse built-in configs/nmwifi.toml")
});

/// Well-known NetworkManager names plus the knobs of this tool.
///
/// Loaded once and shared read-only. The built-in `configs/nmwifi.toml`
/// supplies every key a user file leaves out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    // === D-Bus 地址 ===
    pub service: String,
    pub manager_path: String,
    pub settings_path: String,

    // === D-Bus 接口名 ===
    pub manager_iface: String,
    pub properties_iface: String,
    pub settings_iface: String,
    pub settings_connection_iface: String,
    pub device_iface: String,
    pub wireless_iface: String,
    pub access_point_iface: String,

    /// `DeviceType` value of a Wi-Fi device (NM_DEVICE_TYPE_WIFI).
    pub wireless_device_type: u32,
    /// Upper bound for every single remote call.
    pub call_timeout_ms: u64,

    /// `connection.id` for new profiles; the SSID is used when unset.
    pub profile_label: Option<String>,
    pub reject_duplicate_profiles: bool,

    /// Listen address of `nmwifi serve`.
    pub bind_addr: SocketAddr,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        BUILTIN_CONFIG.clone()
    }
}

fn config_error(e: impl std::fmt::Display) -> Error {
    Error::Config(e.to_string())
}

impl ServiceConfig {
    /// Parses `s` as overrides on top of the built-in configuration.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let overrides: toml::Table = toml::from_str(s).map_err(config_error)?;
        let mut merged: toml::Table = toml::from_str(BUILTIN_TOML).map_err(config_error)?;
        merged.extend(overrides);
        toml::Value::Table(merged)
            .try_into()
            .map_err(config_error)
    }

    /// 从磁盘读取 TOML 配置文件
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.wireless_device_type, 2);
        assert_eq!(config.call_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = ServiceConfig::from_toml_str(
            r#"
            call_timeout_ms = 250
            profile_label = "Connection 1"
            bind_addr = "0.0.0.0:80"
            "#,
        )
        .unwrap();
        assert_eq!(config.call_timeout(), Duration::from_millis(250));
        assert_eq!(config.profile_label.as_deref(), Some("Connection 1"));
        assert_eq!(config.bind_addr.port(), 80);
        assert_eq!(config.service, "org.freedesktop.NetworkManager");
    }

    #[test]
    fn builtin_file_carries_the_networkmanager_names() {
        let config = ServiceConfig::default();
        assert_eq!(config.service, "org.freedesktop.NetworkManager");
        assert_eq!(config.properties_iface, "org.freedesktop.DBus.Properties");
        assert_eq!(
            config.access_point_iface,
            "org.freedesktop.NetworkManager.AccessPoint"
        );
        assert_eq!(config.profile_label, None);
        assert!(config.reject_duplicate_profiles);
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let err = ServiceConfig::from_toml_str("call_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
