use crate::config::ServiceConfig;
use crate::structs::{AccessPoint, ObjectId, Security, Variant};
use crate::traits::RemoteCallClient;
use crate::{Error, Result};

/// Reads the access points an adapter can see.
///
/// Every property is its own `Get` round-trip; NetworkManager is queried
/// exactly the way the settings UI always has, one object at a time.
pub struct AccessPointRepository<'a> {
    client: &'a dyn RemoteCallClient,
    config: &'a ServiceConfig,
}

impl<'a> AccessPointRepository<'a> {
    pub fn new(client: &'a dyn RemoteCallClient, config: &'a ServiceConfig) -> Self {
        Self { client, config }
    }

    /// Fresh snapshot in discovery order. Hidden (empty SSID) entries are
    /// dropped; entries that vanish mid-listing are skipped.
    pub async fn list_access_points(&self, adapter: &ObjectId) -> Result<Vec<AccessPoint>> {
        let paths = self.client.get_all_access_points(adapter).await?;
        let mut access_points = Vec::with_capacity(paths.len());

        for path in paths {
            match self.fetch(&path).await {
                Ok(ap) if ap.ssid.is_empty() => {
                    tracing::trace!(path = %path, "ignoring hidden access point");
                }
                Ok(ap) => access_points.push(ap),
                Err(e) if e.is_skippable() => {
                    tracing::warn!(path = %path, error = %e, "skipping access point");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(
            adapter = %adapter,
            count = access_points.len(),
            "listed access points"
        );
        Ok(access_points)
    }

    async fn fetch(&self, path: &ObjectId) -> Result<AccessPoint> {
        let ssid = self
            .property(path, "Ssid")
            .await?
            .into_bytes()
            .ok_or_else(|| Error::unexpected_type("Get Ssid"))?;
        let strength = self
            .property(path, "Strength")
            .await?
            .as_u8()
            .ok_or_else(|| Error::unexpected_type("Get Strength"))?;

        let flags = self.flag(path, "Flags").await?;
        let wpa_flags = self.flag(path, "WpaFlags").await?;
        let rsn_flags = self.flag(path, "RsnFlags").await?;

        Ok(AccessPoint {
            path: path.clone(),
            ssid,
            strength: strength.min(100),
            security: Security::from_flags(flags, wpa_flags, rsn_flags),
        })
    }

    async fn property(&self, path: &ObjectId, name: &str) -> Result<Variant> {
        self.client
            .get_property(path, &self.config.access_point_iface, name)
            .await
    }

    /// Security flags degrade to 0 rather than losing the whole entry.
    async fn flag(&self, path: &ObjectId, name: &str) -> Result<u32> {
        match self.property(path, name).await {
            Ok(value) => Ok(value.as_u32().unwrap_or(0)),
            Err(e) if e.is_skippable() => Ok(0),
            Err(e) => Err(e),
        }
    }
}
