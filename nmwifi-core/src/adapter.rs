use crate::config::ServiceConfig;
use crate::structs::ObjectId;
use crate::traits::RemoteCallClient;
use crate::{Error, Result};

/// Finds the wireless adapter among the devices NetworkManager manages.
pub struct AdapterLocator<'a> {
    client: &'a dyn RemoteCallClient,
    config: &'a ServiceConfig,
}

impl<'a> AdapterLocator<'a> {
    pub fn new(client: &'a dyn RemoteCallClient, config: &'a ServiceConfig) -> Self {
        Self { client, config }
    }

    /// Returns the first device, in service order, whose `DeviceType` is the
    /// wireless type. [`Error::NotFound`] when there is none.
    pub async fn find_wireless_adapter(&self) -> Result<ObjectId> {
        let devices = self.client.get_devices().await?;
        tracing::debug!(count = devices.len(), "enumerated devices");

        for device in devices {
            let device_type = match self
                .client
                .get_property(&device, &self.config.device_iface, "DeviceType")
                .await
            {
                Ok(value) => value.as_u32(),
                Err(e) if e.is_skippable() => {
                    tracing::warn!(path = %device, error = %e, "skipping device");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if device_type == Some(self.config.wireless_device_type) {
                tracing::info!(adapter = %device, "found wireless adapter");
                return Ok(device);
            }
        }

        Err(Error::NotFound)
    }
}
