use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An opaque D-Bus object path as handed out by NetworkManager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// NetworkManager reports "nothing" as the root path `/`.
    pub fn is_null(&self) -> bool {
        self.0.is_empty() || self.0 == "/"
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ObjectId {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// The subset of D-Bus variant values this crate reads or writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Bool(bool),
    U8(u8),
    U32(u32),
    Str(String),
    Bytes(Vec<u8>),
    ObjectPath(ObjectId),
}

impl Variant {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Variant::U32(v) => Some(*v),
            Variant::U8(v) => Some(u32::from(*v)),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Variant::U8(v) => Some(*v),
            Variant::U32(v) => u8::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Variant::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Variant::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_object_path(self) -> Option<ObjectId> {
        match self {
            Variant::ObjectPath(p) => Some(p),
            _ => None,
        }
    }
}

/// Settings sections of a connection profile, keyed `section -> key -> value`.
pub type ProfileSettings = HashMap<String, HashMap<String, Variant>>;

/// Security class advertised by an access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Security {
    Open,
    Wep,
    WpaPsk,
    Enterprise,
}

// NM80211ApFlags / NM80211ApSecurityFlags
const AP_FLAGS_PRIVACY: u32 = 0x1;
const AP_SEC_KEY_MGMT_PSK: u32 = 0x100;
const AP_SEC_KEY_MGMT_802_1X: u32 = 0x200;
const AP_SEC_KEY_MGMT_SAE: u32 = 0x400;

impl Security {
    /// Derives the security class from the `Flags`, `WpaFlags` and
    /// `RsnFlags` access point properties.
    pub fn from_flags(flags: u32, wpa_flags: u32, rsn_flags: u32) -> Self {
        let key_mgmt = wpa_flags | rsn_flags;
        if key_mgmt & AP_SEC_KEY_MGMT_802_1X != 0 {
            Security::Enterprise
        } else if key_mgmt & (AP_SEC_KEY_MGMT_PSK | AP_SEC_KEY_MGMT_SAE) != 0 {
            Security::WpaPsk
        } else if flags & AP_FLAGS_PRIVACY != 0 {
            Security::Wep
        } else {
            Security::Open
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Security::Open => "open",
            Security::Wep => "WEP",
            Security::WpaPsk => "WPA-PSK",
            Security::Enterprise => "WPA-Enterprise",
        };
        f.write_str(name)
    }
}

/// One radio endpoint seen in the latest scan snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPoint {
    pub path: ObjectId,
    pub ssid: Vec<u8>,
    pub strength: u8, // 0 到 100
    pub security: Security,
}

/// One row of the presented network list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    /// Raw SSID octets, serialized as an array of numbers.
    pub ssid: Vec<u8>,
    /// SSID decoded for display; invalid UTF-8 is replaced.
    pub name: String,
    pub strength: u8,
    /// Strength rounded to the nearest multiple of 25.
    pub bucket: u8,
    pub security: Security,
    pub connected: bool,
}

impl Network {
    pub fn from_access_point(ap: AccessPoint, connected: bool) -> Self {
        Self {
            name: String::from_utf8_lossy(&ap.ssid).into_owned(),
            bucket: strength_bucket(ap.strength),
            strength: ap.strength,
            security: ap.security,
            ssid: ap.ssid,
            connected,
        }
    }
}

/// Rounds `strength / 25` half-up and scales back, so 37 -> 25 and 38 -> 50.
pub fn strength_bucket(strength: u8) -> u8 {
    let s = u32::from(strength.min(100));
    ((2 * s + 25) / 50 * 25) as u8
}

/// A WPA-PSK infrastructure profile, ready to hand to `AddConnection`.
#[derive(Clone, PartialEq)]
pub struct ConnectionProfile {
    pub uuid: String,
    /// Human readable label (`connection.id`).
    pub id: String,
    pub ssid: Vec<u8>,
    pub psk: String,
}

impl ConnectionProfile {
    /// Renders the profile as the nested settings dictionary NetworkManager expects.
    pub fn settings(&self) -> ProfileSettings {
        fn section(entries: Vec<(&str, Variant)>) -> HashMap<String, Variant> {
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect()
        }

        let mut settings = ProfileSettings::new();
        settings.insert(
            "connection".into(),
            section(vec![
                ("type", Variant::Str("802-11-wireless".into())),
                ("uuid", Variant::Str(self.uuid.clone())),
                ("id", Variant::Str(self.id.clone())),
            ]),
        );
        settings.insert(
            "802-11-wireless".into(),
            section(vec![
                ("ssid", Variant::Bytes(self.ssid.clone())),
                ("mode", Variant::Str("infrastructure".into())),
            ]),
        );
        settings.insert(
            "802-11-wireless-security".into(),
            section(vec![
                ("key-mgmt", Variant::Str("wpa-psk".into())),
                ("auth-alg", Variant::Str("open".into())),
                ("psk", Variant::Str(self.psk.clone())),
            ]),
        );
        settings.insert(
            "ipv4".into(),
            section(vec![("method", Variant::Str("auto".into()))]),
        );
        settings.insert(
            "ipv6".into(),
            section(vec![("method", Variant::Str("ignore".into()))]),
        );
        settings
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("uuid", &self.uuid)
            .field("id", &self.id)
            .field("ssid", &String::from_utf8_lossy(&self.ssid))
            .field("psk", &"********")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_rounds_half_up() {
        assert_eq!(strength_bucket(37), 25);
        assert_eq!(strength_bucket(38), 50);
        assert_eq!(strength_bucket(0), 0);
        assert_eq!(strength_bucket(12), 0);
        assert_eq!(strength_bucket(13), 25);
        assert_eq!(strength_bucket(62), 50);
        assert_eq!(strength_bucket(63), 75);
        assert_eq!(strength_bucket(100), 100);
    }

    #[test]
    fn security_prefers_enterprise_then_psk_then_privacy() {
        assert_eq!(Security::from_flags(1, 0, 0x200 | 0x100), Security::Enterprise);
        assert_eq!(Security::from_flags(1, 0x100, 0), Security::WpaPsk);
        assert_eq!(Security::from_flags(1, 0, 0x400), Security::WpaPsk);
        assert_eq!(Security::from_flags(1, 0, 0), Security::Wep);
        assert_eq!(Security::from_flags(0, 0, 0), Security::Open);
    }

    #[test]
    fn null_object_paths() {
        assert!(ObjectId::from("/").is_null());
        assert!(ObjectId::from("").is_null());
        assert!(!ObjectId::from("/org/freedesktop/NetworkManager/AccessPoint/3").is_null());
    }

    #[test]
    fn profile_debug_hides_psk() {
        let profile = ConnectionProfile {
            uuid: "u".into(),
            id: "HomeNet".into(),
            ssid: b"HomeNet".to_vec(),
            psk: "s3cr3t!".into(),
        };
        let printed = format!("{profile:?}");
        assert!(!printed.contains("s3cr3t!"));
        assert!(printed.contains("HomeNet"));
    }
}
