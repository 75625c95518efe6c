use crate::structs::{ConnectionProfile, Network, ObjectId, ProfileSettings, Variant};
use async_trait::async_trait;

// 在这里定义后端 (NetworkManager 访问) 和前端 (展示层) 的 trait。

/// Request/response transport towards the network management service.
///
/// Each method is exactly one remote round-trip. Implementations map error
/// replies to [`crate::Error::CallFailed`], an unreachable service to
/// [`crate::Error::ServiceUnavailable`], and enforce a per-call timeout.
#[async_trait]
pub trait RemoteCallClient: Send + Sync {
    /// `GetDevices` on the manager object.
    async fn get_devices(&self) -> crate::Result<Vec<ObjectId>>;

    /// `org.freedesktop.DBus.Properties.Get(interface, name)` on `path`.
    async fn get_property(
        &self,
        path: &ObjectId,
        interface: &str,
        name: &str,
    ) -> crate::Result<Variant>;

    /// `GetAllAccessPoints` on a wireless device.
    async fn get_all_access_points(&self, adapter: &ObjectId) -> crate::Result<Vec<ObjectId>>;

    /// `RequestScan` with an empty options map. Returns without waiting for
    /// the scan to finish.
    async fn request_scan(&self, adapter: &ObjectId) -> crate::Result<()>;

    /// `ListConnections` on the settings object.
    async fn list_connections(&self) -> crate::Result<Vec<ObjectId>>;

    /// `GetSettings` on a stored connection profile.
    async fn get_connection_settings(&self, path: &ObjectId) -> crate::Result<ProfileSettings>;

    /// `AddConnection` on the settings object; returns the new profile's path.
    async fn add_connection(&self, profile: &ConnectionProfile) -> crate::Result<ObjectId>;
}

/// 展示层接口：渲染网络列表并收集用户凭据。
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn render_network_list(&self, networks: &[Network]);

    /// Shown instead of the list when the host has no wireless adapter.
    async fn render_no_adapter(&self);

    /// Lets the user pick one row; `None` means the user backed out.
    async fn choose_network(&self, networks: &[Network]) -> Option<Network>;

    async fn prompt_for_password(&self, ssid: &[u8]) -> crate::Result<String>;

    async fn report_connected(&self, profile: &ObjectId);

    async fn report_error(&self, error: &crate::Error);
}
