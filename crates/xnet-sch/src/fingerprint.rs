//! Topology fingerprint: a 16-hex-character identifier of a traversed
//! circuit, stable across query starting points.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::group::TracedComponent;

/// Fingerprint of an empty traversal.
pub const EMPTY_HASH: &str = "0000000000000000";

#[derive(Serialize)]
struct CanonicalConnection<'a> {
    pins: Vec<&'a str>,
    net: &'a str,
}

#[derive(Serialize)]
struct CanonicalComponent<'a> {
    refdes: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpn: Option<&'a str>,
    connections: Vec<CanonicalConnection<'a>>,
}

/// Hash the canonical form of a component set. Components are sorted by
/// natural refdes order, connections by net name and pins naturally, so any
/// two traversals of the same circuit produce the same value.
pub fn circuit_hash(components: &[TracedComponent]) -> String {
    if components.is_empty() {
        return EMPTY_HASH.to_string();
    }

    let mut canonical: Vec<CanonicalComponent> = components
        .iter()
        .map(|component| {
            let mut connections: Vec<CanonicalConnection> = component
                .connections
                .iter()
                .map(|connection| {
                    let mut pins: Vec<&str> =
                        connection.pins.iter().map(String::as_str).collect();
                    pins.sort_by(|a, b| natord::compare(a, b));
                    CanonicalConnection {
                        pins,
                        net: &connection.net,
                    }
                })
                .collect();
            connections.sort_by(|a, b| a.net.cmp(b.net));
            CanonicalComponent {
                refdes: &component.refdes,
                mpn: component.mpn.as_deref(),
                connections,
            }
        })
        .collect();
    canonical.sort_by(|a, b| natord::compare(a.refdes, b.refdes));

    let serialized = serde_json::to_string(&canonical).expect("canonical form serializes");
    let digest = Sha256::digest(serialized.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
