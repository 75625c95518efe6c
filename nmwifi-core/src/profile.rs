use crate::config::ServiceConfig;
use crate::structs::{ConnectionProfile, ObjectId, Security};
use crate::traits::RemoteCallClient;
use crate::{Error, Result};
use uuid::Uuid;

/// Builds WPA-PSK connection profiles and submits them to NetworkManager.
pub struct ConnectionProfileBuilder<'a> {
    client: &'a dyn RemoteCallClient,
    config: &'a ServiceConfig,
}

impl<'a> ConnectionProfileBuilder<'a> {
    pub fn new(client: &'a dyn RemoteCallClient, config: &'a ServiceConfig) -> Self {
        Self { client, config }
    }

    /// A fresh profile with a new v4 UUID on every call.
    pub fn build(&self, ssid: &[u8], password: &str) -> ConnectionProfile {
        let id = self
            .config
            .profile_label
            .clone()
            .unwrap_or_else(|| String::from_utf8_lossy(ssid).into_owned());
        ConnectionProfile {
            uuid: Uuid::new_v4().hyphenated().to_string(),
            id,
            ssid: ssid.to_vec(),
            psk: password.to_string(),
        }
    }

    /// Submits a WPA-PSK profile for `ssid`. Returns the path NetworkManager
    /// assigned to the stored profile.
    pub async fn connect(&self, ssid: &[u8], password: &str) -> Result<ObjectId> {
        let ssid_name = String::from_utf8_lossy(ssid).into_owned();

        if self.config.reject_duplicate_profiles {
            if let Some(path) = self.find_existing(ssid).await? {
                tracing::info!(ssid = %ssid_name, path = %path, "profile already exists");
                return Err(Error::DuplicateProfile {
                    ssid: ssid_name,
                    path,
                });
            }
        }

        let profile = self.build(ssid, password);
        tracing::info!(ssid = %ssid_name, uuid = %profile.uuid, "submitting connection profile");

        match self.client.add_connection(&profile).await {
            Ok(path) => {
                tracing::info!(ssid = %ssid_name, path = %path, "connection profile created");
                Ok(path)
            }
            Err(Error::CallFailed {
                name: Some(name),
                message,
                ..
            }) => {
                tracing::warn!(ssid = %ssid_name, name = %name, message = %message, "AddConnection rejected");
                Err(Error::ConnectError { name, message })
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`connect`](Self::connect) but refuses, before any remote call,
    /// security classes other than WPA-PSK.
    pub async fn connect_with_security(
        &self,
        ssid: &[u8],
        security: Security,
        password: &str,
    ) -> Result<ObjectId> {
        if security != Security::WpaPsk {
            return Err(Error::UnsupportedSecurity(security));
        }
        self.connect(ssid, password).await
    }

    /// Path of a stored profile whose `802-11-wireless.ssid` equals `ssid`.
    async fn find_existing(&self, ssid: &[u8]) -> Result<Option<ObjectId>> {
        let connections = match self.client.list_connections().await {
            Ok(connections) => connections,
            Err(e) if e.is_skippable() => {
                tracing::warn!(error = %e, "cannot list stored profiles, skipping duplicate check");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        for path in connections {
            let settings = match self.client.get_connection_settings(&path).await {
                Ok(settings) => settings,
                Err(e) if e.is_skippable() => {
                    tracing::debug!(path = %path, error = %e, "skipping unreadable profile");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let stored = settings
                .get("802-11-wireless")
                .and_then(|s| s.get("ssid"))
                .and_then(|v| v.as_bytes());
            if stored == Some(ssid) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockNetworkManager;
    use crate::structs::Variant;

    #[test]
    fn builds_wpa_psk_profile() {
        let nm = MockNetworkManager::new();
        let config = ServiceConfig::default();
        let profile = ConnectionProfileBuilder::new(&nm, &config).build(b"HomeNet", "s3cr3t!");
        let settings = profile.settings();

        assert_eq!(
            settings["802-11-wireless"]["ssid"],
            Variant::Bytes(b"HomeNet".to_vec())
        );
        assert_eq!(
            settings["802-11-wireless"]["mode"],
            Variant::Str("infrastructure".into())
        );
        let security = &settings["802-11-wireless-security"];
        assert_eq!(security["psk"], Variant::Str("s3cr3t!".into()));
        assert_eq!(security["key-mgmt"], Variant::Str("wpa-psk".into()));
        assert_eq!(security["auth-alg"], Variant::Str("open".into()));
        assert_eq!(settings["ipv4"]["method"], Variant::Str("auto".into()));
        assert_eq!(settings["ipv6"]["method"], Variant::Str("ignore".into()));
        assert_eq!(
            settings["connection"]["type"],
            Variant::Str("802-11-wireless".into())
        );
        assert_eq!(settings["connection"]["id"], Variant::Str("HomeNet".into()));
    }

    #[test]
    fn every_profile_gets_a_new_uuid() {
        let nm = MockNetworkManager::new();
        let config = ServiceConfig::default();
        let builder = ConnectionProfileBuilder::new(&nm, &config);

        let a = builder.build(b"HomeNet", "pw");
        let b = builder.build(b"HomeNet", "pw");

        assert_ne!(a.uuid, b.uuid);
        assert!(Uuid::parse_str(&a.uuid).is_ok());
        assert!(!a.uuid.contains('{'));
    }

    #[test]
    fn configured_label_is_used_as_id() {
        let nm = MockNetworkManager::new();
        let config = ServiceConfig {
            profile_label: Some("Connection 1".into()),
            ..ServiceConfig::default()
        };

        let profile = ConnectionProfileBuilder::new(&nm, &config).build(b"HomeNet", "pw");

        assert_eq!(profile.id, "Connection 1");
    }

    #[tokio::test]
    async fn connect_returns_service_assigned_path() {
        let nm = MockNetworkManager::new();
        let config = ServiceConfig::default();

        let path = ConnectionProfileBuilder::new(&nm, &config)
            .connect(b"HomeNet", "s3cr3t!")
            .await
            .unwrap();

        assert_eq!(path.as_str(), "/org/freedesktop/NetworkManager/Settings/1");
        let added = nm.added_profiles();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].ssid, b"HomeNet");
        assert_eq!(added[0].psk, "s3cr3t!");
    }

    #[tokio::test]
    async fn rejected_profile_carries_error_verbatim() {
        let nm = MockNetworkManager::new().rejecting_add(
            "org.freedesktop.NetworkManager.Error.InvalidArguments",
            "bad psk",
        );
        let config = ServiceConfig::default();

        let err = ConnectionProfileBuilder::new(&nm, &config)
            .connect(b"HomeNet", "s3cr3t!")
            .await
            .unwrap_err();

        match err {
            Error::ConnectError { name, message } => {
                assert_eq!(name, "org.freedesktop.NetworkManager.Error.InvalidArguments");
                assert_eq!(message, "bad psk");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(nm.call_count("AddConnection"), 1);
    }

    #[tokio::test]
    async fn existing_profile_for_ssid_is_a_duplicate() {
        let nm = MockNetworkManager::new()
            .with_connection("/org/freedesktop/NetworkManager/Settings/7", b"Other")
            .with_connection("/org/freedesktop/NetworkManager/Settings/8", b"HomeNet");
        let config = ServiceConfig::default();

        let err = ConnectionProfileBuilder::new(&nm, &config)
            .connect(b"HomeNet", "s3cr3t!")
            .await
            .unwrap_err();

        match err {
            Error::DuplicateProfile { ssid, path } => {
                assert_eq!(ssid, "HomeNet");
                assert_eq!(path.as_str(), "/org/freedesktop/NetworkManager/Settings/8");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(nm.call_count("AddConnection"), 0);
    }

    #[tokio::test]
    async fn duplicate_check_can_be_disabled() {
        let nm = MockNetworkManager::new()
            .with_connection("/org/freedesktop/NetworkManager/Settings/1", b"HomeNet");
        let config = ServiceConfig {
            reject_duplicate_profiles: false,
            ..ServiceConfig::default()
        };

        ConnectionProfileBuilder::new(&nm, &config)
            .connect(b"HomeNet", "s3cr3t!")
            .await
            .unwrap();

        assert_eq!(nm.call_count("ListConnections"), 0);
        assert_eq!(nm.added_profiles().len(), 1);
    }

    #[tokio::test]
    async fn non_psk_security_is_refused_without_remote_calls() {
        let nm = MockNetworkManager::new();
        let config = ServiceConfig::default();
        let builder = ConnectionProfileBuilder::new(&nm, &config);

        for security in [Security::Open, Security::Wep, Security::Enterprise] {
            let err = builder
                .connect_with_security(b"CorpNet", security, "pw")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::UnsupportedSecurity(s) if s == security));
        }
        assert!(nm.calls().is_empty());
    }
}
