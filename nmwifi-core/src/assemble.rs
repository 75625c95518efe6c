use crate::structs::{AccessPoint, Network, ObjectId};
use std::collections::HashSet;

/// Merges a scan snapshot with the active access point into one row per SSID.
///
/// Rows are ordered by strength, strongest first; ties keep discovery order.
/// When several access points share an SSID the strongest one is shown,
/// except for the active network, which is always represented by the access
/// point the adapter is actually associated with.
pub fn assemble(
    mut access_points: Vec<AccessPoint>,
    active: Option<&ObjectId>,
    active_ssid: &[u8],
) -> Vec<Network> {
    // `sort_by` is stable.
    access_points.sort_by(|a, b| b.strength.cmp(&a.strength));

    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    // Only reserve the SSID when its access point is in this snapshot, or the
    // network would vanish from the list entirely.
    if let Some(active) = active {
        if access_points.iter().any(|ap| &ap.path == active) {
            seen.insert(active_ssid.to_vec());
        }
    }

    let mut networks = Vec::with_capacity(access_points.len());
    for ap in access_points {
        let connected = active == Some(&ap.path);
        if seen.contains(&ap.ssid) && !connected {
            continue;
        }
        seen.insert(ap.ssid.clone());
        networks.push(Network::from_access_point(ap, connected));
    }
    networks
}
