//! Universal netlist model and XNET traversal engine.
//!
//! Both schematic decoders (Altium and Cadence) project their output onto the
//! structures in this crate. The model keeps two inversely-indexed views of
//! the same connectivity relation so that both directions are O(1):
//!
//! * [`Netlist::nets`] – net name → refdes → pin list.
//! * [`Netlist::components`] – refdes → [`Component`] with a per-pin
//!   [`PinEntry`] embedding the pin's net.
//!
//! On top of the model, [`trace_from_net`] and [`trace_from_pin`] answer
//! XNET queries: breadth-first exploration that continues through series
//! passive components and terminates at power/ground rails and active
//! devices.

pub mod aggregate;
pub mod classify;
pub mod fingerprint;
pub mod group;
pub mod trace;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use aggregate::{MpnGroup, Orientation, TraceResult};
pub use fingerprint::circuit_hash;
pub use group::{Connection, TracedComponent};
pub use trace::{trace_from_net, trace_from_pin, PinVisit, TraceError, TraceOptions};

/// Sentinel net name for unconnected pins.
pub const NC_NET: &str = "NC";

/// One pin's slot in a [`Component`]: either a bare net name, or a
/// `{name, net}` pair when the pin's logical name (e.g. `VIN`) differs from
/// its identifier (e.g. `1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinEntry {
    Net(String),
    Named { name: String, net: String },
}

impl PinEntry {
    pub fn net(&self) -> &str {
        match self {
            PinEntry::Net(net) => net,
            PinEntry::Named { net, .. } => net,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            PinEntry::Net(_) => None,
            PinEntry::Named { name, .. } => Some(name),
        }
    }

    /// Replace the embedded net, keeping the logical pin name if any.
    pub fn set_net(&mut self, new_net: impl Into<String>) {
        match self {
            PinEntry::Net(net) => *net = new_net.into(),
            PinEntry::Named { net, .. } => *net = new_net.into(),
        }
    }
}

/// A schematic component instance keyed by reference designator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub mpn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub pins: BTreeMap<String, PinEntry>,
}

/// The universal netlist: the common output of both decoders and the input
/// to the traversal engine. Immutable once construction finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    /// Net name → refdes → pins of that component on the net.
    pub nets: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Refdes → component record.
    pub components: BTreeMap<String, Component>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `refdes`/`pin` is attached to `net`, updating both views.
    ///
    /// Refdes and pin are canonicalized to upper case; an empty net name is
    /// normalized to [`NC_NET`]. The component and pin entries are created
    /// on demand; an existing pin entry keeps its logical name.
    pub fn link(&mut self, net: &str, refdes: &str, pin: &str) {
        let net = normalize_net(net);
        let refdes = refdes.to_uppercase();
        let pin = pin.to_uppercase();

        let pins = self
            .nets
            .entry(net.to_string())
            .or_default()
            .entry(refdes.clone())
            .or_default();
        if !pins.contains(&pin) {
            pins.push(pin.clone());
        }

        let component = self.components.entry(refdes).or_default();
        match component.pins.get_mut(&pin) {
            Some(entry) => entry.set_net(net),
            None => {
                component.pins.insert(pin, PinEntry::Net(net.to_string()));
            }
        }
    }

    /// Look up a component by refdes, case-insensitively.
    pub fn component(&self, refdes: &str) -> Option<&Component> {
        self.components.get(&refdes.to_uppercase())
    }

    /// Check the model-symmetry invariant: every `(net, refdes, pin)` triple
    /// in the net index has a matching component pin entry embedding the same
    /// net, and vice versa.
    pub fn check_symmetry(&self) -> Result<(), String> {
        for (net, members) in &self.nets {
            for (refdes, pins) in members {
                let component = self
                    .components
                    .get(refdes)
                    .ok_or_else(|| format!("net {net}: component {refdes} missing"))?;
                for pin in pins {
                    let entry = component.pins.get(pin).ok_or_else(|| {
                        format!("net {net}: pin {refdes}.{pin} missing from component")
                    })?;
                    if entry.net() != net {
                        return Err(format!(
                            "pin {refdes}.{pin} embeds net {} but appears in net {net}",
                            entry.net()
                        ));
                    }
                }
            }
        }
        for (refdes, component) in &self.components {
            for (pin, entry) in &component.pins {
                let present = self
                    .nets
                    .get(entry.net())
                    .and_then(|members| members.get(refdes))
                    .is_some_and(|pins| pins.contains(pin));
                if !present {
                    return Err(format!(
                        "pin {refdes}.{pin} embeds net {} but is absent from the net index",
                        entry.net()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Empty net names mean "unconnected"; everything else passes through.
fn normalize_net(net: &str) -> &str {
    if net.trim().is_empty() {
        NC_NET
    } else {
        net
    }
}

/// Trim an MPN-like string, treating whitespace-only values as absent.
pub fn normalize_mpn(mpn: Option<String>) -> Option<String> {
    mpn.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
