use crate::Result;
use crate::structs::ObjectId;
use crate::traits::RemoteCallClient;

/// Fire-and-forget scan trigger.
pub struct ScanRequester<'a> {
    client: &'a dyn RemoteCallClient,
}

impl<'a> ScanRequester<'a> {
    pub fn new(client: &'a dyn RemoteCallClient) -> Self {
        Self { client }
    }

    /// Asks the adapter to scan. NetworkManager scans in the background; the
    /// next access point query sees whatever snapshot it has cached.
    pub async fn request_scan(&self, adapter: &ObjectId) -> Result<()> {
        self.client.request_scan(adapter).await?;
        tracing::debug!(adapter = %adapter, "scan requested");
        Ok(())
    }
}
