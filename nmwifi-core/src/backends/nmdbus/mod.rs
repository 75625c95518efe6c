use crate::config::ServiceConfig;
use crate::structs::{ConnectionProfile, ObjectId, ProfileSettings, Variant};
use crate::traits::RemoteCallClient;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use zbus::zvariant::{DynamicType, ObjectPath, OwnedObjectPath, OwnedValue, Type, Value};
use zbus::{Connection, Proxy};

// Pure D-Bus flow against NetworkManager. Every method is a single
// request/response round-trip bounded by `call_timeout_ms`.

/// Error names meaning nobody answers on the bus for NetworkManager.
const UNAVAILABLE_ERRORS: &[&str] = &[
    "org.freedesktop.DBus.Error.ServiceUnknown",
    "org.freedesktop.DBus.Error.NameHasNoOwner",
    "org.freedesktop.DBus.Error.NoServer",
    "org.freedesktop.DBus.Error.Disconnected",
];

#[derive(Debug)]
pub struct NmDbusClient {
    config: Arc<ServiceConfig>,
    // Hold a zbus connection (lazy-init on first use)
    conn: Mutex<Option<Connection>>,
}

impl NmDbusClient {
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    async fn ensure_conn(&self) -> Result<Connection> {
        let mut guard = self.conn.lock().await;
        if let Some(c) = guard.as_ref() {
            return Ok(c.clone());
        }
        let c = self
            .bounded("connect to system bus", async {
                Connection::system()
                    .await
                    .map_err(|e| Error::ServiceUnavailable(format!("DBus connect failed: {}", e)))
            })
            .await?;
        tracing::debug!("connected to the system bus");
        *guard = Some(c.clone());
        Ok(c)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.call_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, "remote call timed out");
                Err(Error::Timeout {
                    operation: operation.to_string(),
                })
            }
        }
    }

    /// Calls `interface.method(body)` on `path` and decodes the reply.
    async fn call<B, R>(
        &self,
        operation: &str,
        path: &str,
        interface: &str,
        method: &str,
        body: &B,
    ) -> Result<R>
    where
        B: Serialize + DynamicType,
        R: DeserializeOwned + Type,
    {
        let conn = self.ensure_conn().await?;
        self.bounded(operation, async {
            let proxy = Proxy::new(&conn, self.config.service.as_str(), path, interface)
                .await
                .map_err(|e| classify(operation, e))?;
            let reply: R = proxy
                .call(method, body)
                .await
                .map_err(|e| classify(operation, e))?;
            Ok(reply)
        })
        .await
    }
}

/// Maps a zbus failure onto the crate's error taxonomy.
fn classify(operation: &str, err: zbus::Error) -> Error {
    match err {
        zbus::Error::MethodError(name, message, _) => {
            classify_error_reply(operation, name.as_str(), message.unwrap_or_default())
        }
        zbus::Error::InputOutput(e) => Error::ServiceUnavailable(e.to_string()),
        other => Error::CallFailed {
            operation: operation.to_string(),
            name: None,
            message: other.to_string(),
        },
    }
}

/// An error reply is fatal only when it says NetworkManager is not on the bus.
fn classify_error_reply(operation: &str, name: &str, message: String) -> Error {
    if UNAVAILABLE_ERRORS.contains(&name) {
        Error::ServiceUnavailable(format!("{}: {}", name, message))
    } else {
        Error::CallFailed {
            operation: operation.to_string(),
            name: Some(name.to_string()),
            message,
        }
    }
}

fn variant_from_value(value: &Value<'_>) -> Option<Variant> {
    match value {
        Value::Bool(b) => Some(Variant::Bool(*b)),
        Value::U8(v) => Some(Variant::U8(*v)),
        Value::U32(v) => Some(Variant::U32(*v)),
        Value::Str(s) => Some(Variant::Str(s.as_str().to_string())),
        Value::ObjectPath(p) => Some(Variant::ObjectPath(ObjectId::new(p.as_str()))),
        Value::Value(inner) => variant_from_value(inner),
        // `ay` (SSIDs) is the only array type read back.
        Value::Array(array) => array
            .iter()
            .map(|v| match v {
                Value::U8(b) => Some(*b),
                _ => None,
            })
            .collect::<Option<Vec<u8>>>()
            .map(Variant::Bytes),
        _ => None,
    }
}

fn value_from_variant(variant: &Variant) -> Result<Value<'_>> {
    Ok(match variant {
        Variant::Bool(b) => Value::from(*b),
        Variant::U8(v) => Value::from(*v),
        Variant::U32(v) => Value::from(*v),
        Variant::Str(s) => Value::from(s.as_str()),
        Variant::Bytes(b) => Value::new(b.as_slice()),
        Variant::ObjectPath(p) => {
            let path = ObjectPath::try_from(p.as_str()).map_err(|e| Error::CallFailed {
                operation: "encode settings".to_string(),
                name: None,
                message: e.to_string(),
            })?;
            Value::from(path)
        }
    })
}

fn paths(list: Vec<OwnedObjectPath>) -> Vec<ObjectId> {
    list.into_iter()
        .map(|p| ObjectId::new(p.as_str()))
        .collect()
}

#[async_trait]
impl RemoteCallClient for NmDbusClient {
    async fn get_devices(&self) -> Result<Vec<ObjectId>> {
        let cfg = &self.config;
        let devices: Vec<OwnedObjectPath> = self
            .call("GetDevices", &cfg.manager_path, &cfg.manager_iface, "GetDevices", &())
            .await?;
        Ok(paths(devices))
    }

    async fn get_property(&self, path: &ObjectId, interface: &str, name: &str) -> Result<Variant> {
        let operation = format!("Get {}", name);
        let value: OwnedValue = self
            .call(
                &operation,
                path.as_str(),
                &self.config.properties_iface,
                "Get",
                &(interface, name),
            )
            .await?;
        variant_from_value(&value).ok_or_else(|| Error::unexpected_type(operation))
    }

    async fn get_all_access_points(&self, adapter: &ObjectId) -> Result<Vec<ObjectId>> {
        let aps: Vec<OwnedObjectPath> = self
            .call(
                "GetAllAccessPoints",
                adapter.as_str(),
                &self.config.wireless_iface,
                "GetAllAccessPoints",
                &(),
            )
            .await?;
        Ok(paths(aps))
    }

    async fn request_scan(&self, adapter: &ObjectId) -> Result<()> {
        // RequestScan with empty options
        let opts: HashMap<String, OwnedValue> = HashMap::new();
        self.call::<_, ()>(
            "RequestScan",
            adapter.as_str(),
            &self.config.wireless_iface,
            "RequestScan",
            &opts,
        )
        .await
    }

    async fn list_connections(&self) -> Result<Vec<ObjectId>> {
        let cfg = &self.config;
        let connections: Vec<OwnedObjectPath> = self
            .call(
                "ListConnections",
                &cfg.settings_path,
                &cfg.settings_iface,
                "ListConnections",
                &(),
            )
            .await?;
        Ok(paths(connections))
    }

    async fn get_connection_settings(&self, path: &ObjectId) -> Result<ProfileSettings> {
        let raw: HashMap<String, HashMap<String, OwnedValue>> = self
            .call(
                "GetSettings",
                path.as_str(),
                &self.config.settings_connection_iface,
                "GetSettings",
                &(),
            )
            .await?;
        // Keys with value types outside `Variant` are dropped.
        Ok(raw
            .into_iter()
            .map(|(section, entries)| {
                let entries = entries
                    .iter()
                    .filter_map(|(k, v)| variant_from_value(v).map(|v| (k.clone(), v)))
                    .collect();
                (section, entries)
            })
            .collect())
    }

    async fn add_connection(&self, profile: &ConnectionProfile) -> Result<ObjectId> {
        let settings = profile.settings();
        let mut body: HashMap<&str, HashMap<&str, Value<'_>>> = HashMap::new();
        for (section, entries) in &settings {
            let mut encoded = HashMap::new();
            for (key, value) in entries {
                encoded.insert(key.as_str(), value_from_variant(value)?);
            }
            body.insert(section.as_str(), encoded);
        }

        let cfg = &self.config;
        let path: OwnedObjectPath = self
            .call(
                "AddConnection",
                &cfg.settings_path,
                &cfg.settings_iface,
                "AddConnection",
                &body,
            )
            .await?;
        tracing::debug!(path = %path.as_str(), "AddConnection accepted");
        Ok(ObjectId::new(path.as_str()))
    }
}
