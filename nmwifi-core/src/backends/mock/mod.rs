use crate::structs::{ConnectionProfile, ObjectId, ProfileSettings, Variant};
use crate::traits::RemoteCallClient;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const DEVICE_TYPE_ETHERNET: u32 = 1;
pub const DEVICE_TYPE_WIFI: u32 = 2;

/// An access point as the mock service stores it.
#[derive(Debug, Clone)]
pub struct MockAccessPoint {
    pub path: ObjectId,
    pub ssid: Vec<u8>,
    pub strength: u8,
    pub flags: u32,
    pub wpa_flags: u32,
    pub rsn_flags: u32,
}

impl MockAccessPoint {
    /// An open access point.
    pub fn new(path: &str, ssid: &[u8], strength: u8) -> Self {
        Self {
            path: ObjectId::from(path),
            ssid: ssid.to_vec(),
            strength,
            flags: 0,
            wpa_flags: 0,
            rsn_flags: 0,
        }
    }

    pub fn wpa_psk(mut self) -> Self {
        self.flags = 0x1;
        self.rsn_flags = 0x100 | 0x8 | 0x80;
        self
    }

    pub fn enterprise(mut self) -> Self {
        self.flags = 0x1;
        self.rsn_flags = 0x200 | 0x8 | 0x80;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<(ObjectId, u32)>,
    access_points: HashMap<ObjectId, Vec<MockAccessPoint>>,
    active: HashMap<ObjectId, ObjectId>,
    connections: Vec<(ObjectId, ProfileSettings)>,
    failing_properties: HashSet<(ObjectId, String)>,
    scan_error: Option<(String, String)>,
    add_error: Option<(String, String)>,
    unavailable: bool,
    timing_out: bool,
    latency: Option<Duration>,
    added: Vec<ConnectionProfile>,
    calls: Vec<String>,
}

/// A deterministic in-memory stand-in for NetworkManager.
///
/// Configured with builder methods, then shared as `Arc<dyn RemoteCallClient>`.
/// Every call is recorded so tests can assert on the protocol shape.
#[derive(Debug, Default)]
pub struct MockNetworkManager {
    state: Mutex<MockState>,
}

impl MockNetworkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed demo data used by the `backend_mock` build of the daemon.
    pub fn demo() -> Self {
        let adapter = "/org/freedesktop/NetworkManager/Devices/2";
        Self::new()
            .with_device("/org/freedesktop/NetworkManager/Devices/1", DEVICE_TYPE_ETHERNET)
            .with_device(adapter, DEVICE_TYPE_WIFI)
            .with_access_point(
                adapter,
                MockAccessPoint::new("/org/freedesktop/NetworkManager/AccessPoint/1", b"MyHomeWiFi", 95)
                    .wpa_psk(),
            )
            .with_access_point(
                adapter,
                MockAccessPoint::new("/org/freedesktop/NetworkManager/AccessPoint/2", b"CafeGuest", 78),
            )
            .with_access_point(
                adapter,
                MockAccessPoint::new("/org/freedesktop/NetworkManager/AccessPoint/3", b"MyHomeWiFi", 55)
                    .wpa_psk(),
            )
            .with_access_point(
                adapter,
                MockAccessPoint::new("/org/freedesktop/NetworkManager/AccessPoint/4", b"CorpNet", 88)
                    .enterprise(),
            )
            .with_access_point(
                adapter,
                MockAccessPoint::new("/org/freedesktop/NetworkManager/AccessPoint/5", b"", 42),
            )
            .with_active(adapter, "/org/freedesktop/NetworkManager/AccessPoint/3")
    }

    fn with_state(self, f: impl FnOnce(&mut MockState)) -> Self {
        f(&mut self.lock());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_device(self, path: &str, device_type: u32) -> Self {
        self.with_state(|s| s.devices.push((ObjectId::from(path), device_type)))
    }

    pub fn with_access_point(self, adapter: &str, ap: MockAccessPoint) -> Self {
        self.with_state(|s| {
            s.access_points
                .entry(ObjectId::from(adapter))
                .or_default()
                .push(ap)
        })
    }

    pub fn with_active(self, adapter: &str, ap: &str) -> Self {
        self.with_state(|s| {
            s.active.insert(ObjectId::from(adapter), ObjectId::from(ap));
        })
    }

    /// A stored profile for `ssid`.
    pub fn with_connection(self, path: &str, ssid: &[u8]) -> Self {
        let mut wireless = HashMap::new();
        wireless.insert("ssid".to_string(), Variant::Bytes(ssid.to_vec()));
        let mut settings = ProfileSettings::new();
        settings.insert("802-11-wireless".to_string(), wireless);
        self.with_state(|s| s.connections.push((ObjectId::from(path), settings)))
    }

    /// `Get` on this object/property answers with an error reply.
    pub fn failing_property(self, path: &str, name: &str) -> Self {
        self.with_state(|s| {
            s.failing_properties
                .insert((ObjectId::from(path), name.to_string()));
        })
    }

    pub fn failing_scan(self, name: &str, message: &str) -> Self {
        self.with_state(|s| s.scan_error = Some((name.to_string(), message.to_string())))
    }

    pub fn rejecting_add(self, name: &str, message: &str) -> Self {
        self.with_state(|s| s.add_error = Some((name.to_string(), message.to_string())))
    }

    /// Behaves as if NetworkManager were not on the bus.
    pub fn unavailable(self) -> Self {
        self.with_state(|s| s.unavailable = true)
    }

    /// Every call fails as if NetworkManager never answered in time.
    pub fn timing_out(self) -> Self {
        self.with_state(|s| s.timing_out = true)
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.with_state(|s| s.latency = Some(latency))
    }

    pub fn added_profiles(&self) -> Vec<ConnectionProfile> {
        self.lock().added.clone()
    }

    /// Number of recorded calls whose description starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    async fn enter(&self, call: String) -> Result<()> {
        let latency = {
            let mut state = self.lock();
            if state.timing_out {
                return Err(Error::Timeout { operation: call });
            }
            state.calls.push(call);
            if state.unavailable {
                return Err(Error::ServiceUnavailable(
                    "org.freedesktop.DBus.Error.ServiceUnknown: The name is not activatable"
                        .to_string(),
                ));
            }
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

fn error_reply(operation: &str, name: &str, message: &str) -> Error {
    Error::CallFailed {
        operation: operation.to_string(),
        name: Some(name.to_string()),
        message: message.to_string(),
    }
}

fn unknown_object(operation: &str, path: &ObjectId) -> Error {
    error_reply(
        operation,
        "org.freedesktop.DBus.Error.UnknownObject",
        &format!("No such object path '{path}'"),
    )
}

#[async_trait]
impl RemoteCallClient for MockNetworkManager {
    async fn get_devices(&self) -> Result<Vec<ObjectId>> {
        self.enter("GetDevices".to_string()).await?;
        Ok(self.lock().devices.iter().map(|(p, _)| p.clone()).collect())
    }

    async fn get_property(&self, path: &ObjectId, interface: &str, name: &str) -> Result<Variant> {
        let operation = format!("Get {name}");
        self.enter(format!("Get {name} {path} {interface}")).await?;
        let state = self.lock();
        if state
            .failing_properties
            .contains(&(path.clone(), name.to_string()))
        {
            return Err(error_reply(
                &operation,
                "org.freedesktop.DBus.Error.UnknownObject",
                "object vanished",
            ));
        }

        if let Some((_, device_type)) = state.devices.iter().find(|(p, _)| p == path) {
            match name {
                "DeviceType" => return Ok(Variant::U32(*device_type)),
                "ActiveAccessPoint" if *device_type == DEVICE_TYPE_WIFI => {
                    let active = state
                        .active
                        .get(path)
                        .cloned()
                        .unwrap_or_else(|| ObjectId::from("/"));
                    return Ok(Variant::ObjectPath(active));
                }
                _ => {}
            }
        }

        let ap = state
            .access_points
            .values()
            .flatten()
            .find(|ap| &ap.path == path);
        if let Some(ap) = ap {
            let value = match name {
                "Ssid" => Some(Variant::Bytes(ap.ssid.clone())),
                "Strength" => Some(Variant::U8(ap.strength)),
                "Flags" => Some(Variant::U32(ap.flags)),
                "WpaFlags" => Some(Variant::U32(ap.wpa_flags)),
                "RsnFlags" => Some(Variant::U32(ap.rsn_flags)),
                _ => None,
            };
            if let Some(value) = value {
                return Ok(value);
            }
        }

        Err(unknown_object(&operation, path))
    }

    async fn get_all_access_points(&self, adapter: &ObjectId) -> Result<Vec<ObjectId>> {
        self.enter(format!("GetAllAccessPoints {adapter}")).await?;
        let state = self.lock();
        match state.access_points.get(adapter) {
            Some(aps) => Ok(aps.iter().map(|ap| ap.path.clone()).collect()),
            None if state.devices.iter().any(|(p, _)| p == adapter) => Ok(Vec::new()),
            None => Err(unknown_object("GetAllAccessPoints", adapter)),
        }
    }

    async fn request_scan(&self, adapter: &ObjectId) -> Result<()> {
        self.enter(format!("RequestScan {adapter}")).await?;
        match &self.lock().scan_error {
            Some((name, message)) => Err(error_reply("RequestScan", name, message)),
            None => Ok(()),
        }
    }

    async fn list_connections(&self) -> Result<Vec<ObjectId>> {
        self.enter("ListConnections".to_string()).await?;
        Ok(self
            .lock()
            .connections
            .iter()
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn get_connection_settings(&self, path: &ObjectId) -> Result<ProfileSettings> {
        self.enter(format!("GetSettings {path}")).await?;
        self.lock()
            .connections
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, settings)| settings.clone())
            .ok_or_else(|| unknown_object("GetSettings", path))
    }

    async fn add_connection(&self, profile: &ConnectionProfile) -> Result<ObjectId> {
        self.enter("AddConnection".to_string()).await?;
        let mut state = self.lock();
        if let Some((name, message)) = &state.add_error {
            return Err(error_reply("AddConnection", name, message));
        }
        let path = ObjectId::new(format!(
            "/org/freedesktop/NetworkManager/Settings/{}",
            state.connections.len() + 1
        ));
        state.connections.push((path.clone(), profile.settings()));
        state.added.push(profile.clone());
        Ok(path)
    }
}
