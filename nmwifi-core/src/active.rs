use crate::config::ServiceConfig;
use crate::structs::ObjectId;
use crate::traits::RemoteCallClient;
use crate::{Error, Result};

/// Works out which access point the adapter is associated with.
pub struct ActiveConnectionResolver<'a> {
    client: &'a dyn RemoteCallClient,
    config: &'a ServiceConfig,
}

impl<'a> ActiveConnectionResolver<'a> {
    pub fn new(client: &'a dyn RemoteCallClient, config: &'a ServiceConfig) -> Self {
        Self { client, config }
    }

    /// `None` when the adapter reports the null path, i.e. not connected.
    pub async fn active_access_point(&self, adapter: &ObjectId) -> Result<Option<ObjectId>> {
        let path = self
            .client
            .get_property(adapter, &self.config.wireless_iface, "ActiveAccessPoint")
            .await?
            .into_object_path()
            .ok_or_else(|| Error::unexpected_type("Get ActiveAccessPoint"))?;

        if path.is_null() {
            tracing::debug!(adapter = %adapter, "adapter is not associated");
            return Ok(None);
        }
        Ok(Some(path))
    }

    pub async fn active_ssid(&self, access_point: &ObjectId) -> Result<Vec<u8>> {
        self.client
            .get_property(access_point, &self.config.access_point_iface, "Ssid")
            .await?
            .into_bytes()
            .ok_or_else(|| Error::unexpected_type("Get Ssid"))
    }
}
